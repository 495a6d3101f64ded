use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the recon home and its default `settings.json`.
///
/// # Arguments
/// - `recon_home` - The directory that will be the recon home, e.g. `$HOME/payroll-recon`
/// - `mapping` - An optional mapping document. It is validated and copied into the recon home as
///   `mapeamento_dp.json`, the last place a mapping is looked for.
///
/// # Errors
/// - Returns an error if any file operations fail or if the mapping document is invalid.
pub async fn init(recon_home: &Path, mapping: Option<&Path>) -> Result<Out<()>> {
    let config = Config::create(recon_home, mapping)
        .await
        .context("Unable to create the recon home and settings")?;
    Ok(format!(
        "Successfully created the recon home at {}",
        config.root().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAPPING_JSON;
    use crate::test::SAMPLE_MAPPING;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("mapping.json");
        std::fs::write(&source, SAMPLE_MAPPING).unwrap();
        let home = dir.path().join("home");

        let out = init(&home, Some(&source)).await.unwrap();

        assert!(out.message().contains("Successfully created"));
        assert!(home.join("settings.json").is_file());
        assert!(home.join(MAPPING_JSON).is_file());
    }

    #[tokio::test]
    async fn test_init_twice_keeps_settings() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        init(&home, None).await.unwrap();
        let settings = home.join("settings.json");
        let edited = std::fs::read_to_string(&settings)
            .unwrap()
            .replace("\"by_kind\"", "\"as_is\"");
        std::fs::write(&settings, &edited).unwrap();

        init(&home, None).await.unwrap();
        assert_eq!(std::fs::read_to_string(&settings).unwrap(), edited);
    }
}
