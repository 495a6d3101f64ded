use std::path::PathBuf;
use thiserror::Error as ThisError;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Problems with the mapping document or the settings file. These are fatal for any run that
/// compares PDF data against the ledger, but extraction-only commands never produce them.
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("The mapping document is malformed: {0}")]
    Malformed(String),

    #[error("Invalid mapping entry #{index} in category '{category}': {reason}")]
    InvalidEntry {
        category: String,
        index: usize,
        reason: String,
    },

    #[error(
        "Unable to find '{file_name}'. Pass --mapping, or place it in one of: {}",
        searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    )]
    MappingNotFound {
        file_name: String,
        searched: Vec<PathBuf>,
    },

    #[error("Unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings file {}: {reason}", path.display())]
    Settings { path: PathBuf, reason: String },
}
