//! Configuration handling for payroll-recon.
//!
//! The recon home (`$RECON_HOME`, by default `~/payroll-recon`) can hold a `settings.json` with
//! the tunable parts of a run and a `mapeamento_dp.json` mapping document. Both are optional: with
//! no settings file the defaults apply, and the mapping is only required by commands that
//! compare.

use crate::error::ConfigError;
use crate::extract::layout::DEFAULT_Y_TOLERANCE;
use crate::extract::{PdfEventExtractor, DEFAULT_FOOTER_TERMS};
use crate::model::{LedgerCode, MappingTable};
use crate::recon::{default_composition_exclusions, LedgerSign, RunOptions, TaxCodes, Tolerance};
use crate::{utils, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "payroll-recon";
const CONFIG_VERSION: u8 = 1;
const SETTINGS_JSON: &str = "settings.json";

/// The file name the mapping document is looked up by.
pub const MAPPING_JSON: &str = "mapeamento_dp.json";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to the recon home and from there it loads `settings.json`, if present.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    settings_path: PathBuf,
    settings: Settings,
}

impl Config {
    /// Creates the recon home with a default `settings.json`. When `mapping` is given, it is
    /// validated and copied into the home as `mapeamento_dp.json`.
    ///
    /// # Errors
    /// - Returns an error if any file operation fails or if `mapping` is not a valid mapping.
    pub async fn create(dir: impl Into<PathBuf>, mapping: Option<&Path>) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the recon home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let settings_path = root.join(SETTINGS_JSON);
        let settings = if settings_path.is_file() {
            debug!("Keeping existing settings at {}", settings_path.display());
            Settings::load(&settings_path).await?
        } else {
            let settings = Settings::default();
            settings.save(&settings_path).await?;
            settings
        };

        if let Some(source) = mapping {
            let json = utils::read(source).await?;
            let table = MappingTable::load(&json)
                .with_context(|| format!("Refusing to install {}", source.display()))?;
            utils::copy(source, root.join(MAPPING_JSON)).await?;
            debug!("Installed mapping with {} entries", table.len());
        }

        Ok(Self {
            root,
            settings_path,
            settings,
        })
    }

    /// Loads the settings of the recon home, falling back to defaults when there is no settings
    /// file. The home directory itself does not need to exist.
    pub async fn load(recon_home: impl Into<PathBuf>) -> Result<Self> {
        let root = recon_home.into();
        let settings_path = root.join(SETTINGS_JSON);
        let settings = if settings_path.is_file() {
            Settings::load(&settings_path).await?
        } else {
            debug!(
                "No settings file at {}, using defaults",
                settings_path.display()
            );
            Settings::default()
        };
        Ok(Self {
            root,
            settings_path,
            settings,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The PDF extractor configured by the settings.
    pub fn extractor(&self) -> PdfEventExtractor {
        PdfEventExtractor::new(
            self.settings.y_tolerance,
            self.settings.footer_terms.clone(),
        )
    }

    /// Run options from the settings, with the tolerance optionally overridden.
    pub fn run_options(&self, tolerance: Option<Tolerance>) -> RunOptions {
        RunOptions {
            tolerance: tolerance.unwrap_or(self.settings.tolerance),
            ledger_sign: self.settings.ledger_sign,
            tax_codes: self.settings.taxes.clone(),
            extractor: self.extractor(),
            composition_excluded: self.settings.composition_excluded.clone(),
        }
    }

    /// Locates the mapping document, see `find_mapping_path`.
    pub fn find_mapping(
        &self,
        explicit: Option<&Path>,
    ) -> std::result::Result<PathBuf, ConfigError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        find_mapping_path(explicit, &cwd, &self.root)
    }
}

/// Finds the mapping document. An explicit path (from `--mapping` or `RECON_MAPPING`) must exist;
/// otherwise `mapeamento_dp.json` is looked for in the working directory, its parent and the recon
/// home, in that order.
pub fn find_mapping_path(
    explicit: Option<&Path>,
    cwd: &Path,
    home: &Path,
) -> std::result::Result<PathBuf, ConfigError> {
    let candidates: Vec<PathBuf> = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => {
            let mut list = vec![cwd.join(MAPPING_JSON)];
            if let Some(parent) = cwd.parent() {
                list.push(parent.join(MAPPING_JSON));
            }
            list.push(home.join(MAPPING_JSON));
            list
        }
    };
    match candidates.iter().find(|p| p.is_file()) {
        Some(found) => {
            debug!("Using mapping at {}", found.display());
            Ok(found.clone())
        }
        None => Err(ConfigError::MappingNotFound {
            file_name: explicit
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| MAPPING_JSON.to_string()),
            searched: candidates,
        }),
    }
}

/// Represents the serialization and deserialization format of the settings file.
///
/// Example settings:
/// ```json
/// {
///   "app_name": "payroll-recon",
///   "config_version": 1,
///   "tolerance": "0.01",
///   "y_tolerance": 3.0,
///   "footer_terms": ["totais", "base inss", "base irrf", "base fgts", "liquidos", "liquido"],
///   "ledger_sign": "by_kind",
///   "taxes": { "inss": ["30055"], "irrf": ["30058"], "fgts": ["30051"] }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Application name, should always be "payroll-recon"
    app_name: String,

    /// Settings file version
    config_version: u8,

    /// Largest difference that still counts as a match
    #[serde(default)]
    tolerance: Tolerance,

    /// Vertical distance within which PDF tokens share a row
    #[serde(default = "default_y_tolerance")]
    y_tolerance: f64,

    /// Row texts that close a payroll table
    #[serde(default = "default_footer_terms")]
    footer_terms: Vec<String>,

    /// How ledger amounts are signed
    #[serde(default)]
    ledger_sign: LedgerSign,

    /// Ledger codes of the tax report
    #[serde(default)]
    taxes: TaxCodes,

    /// Ledger codes left out of the composition view
    #[serde(default = "default_composition_exclusions")]
    composition_excluded: Vec<LedgerCode>,
}

fn default_y_tolerance() -> f64 {
    DEFAULT_Y_TOLERANCE
}

fn default_footer_terms() -> Vec<String> {
    DEFAULT_FOOTER_TERMS.iter().map(|s| s.to_string()).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            tolerance: Tolerance::default(),
            y_tolerance: DEFAULT_Y_TOLERANCE,
            footer_terms: default_footer_terms(),
            ledger_sign: LedgerSign::default(),
            taxes: TaxCodes::default(),
            composition_excluded: default_composition_exclusions(),
        }
    }
}

impl Settings {
    /// Loads and validates a settings file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or names another app or version.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings: Settings = utils::deserialize(path).await?;
        settings.validate(path)?;
        Ok(settings)
    }

    fn validate(&self, path: &Path) -> std::result::Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Settings {
            path: path.to_path_buf(),
            reason,
        };
        if self.app_name != APP_NAME {
            return Err(invalid(format!(
                "expected app_name '{APP_NAME}', got '{}'",
                self.app_name
            )));
        }
        if self.config_version != CONFIG_VERSION {
            return Err(invalid(format!(
                "unsupported config_version {}",
                self.config_version
            )));
        }
        if !self.y_tolerance.is_finite() || self.y_tolerance <= 0.0 {
            return Err(invalid(format!(
                "y_tolerance must be a positive number, got {}",
                self.y_tolerance
            )));
        }
        Ok(())
    }

    /// Saves the settings to the specified path.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize settings")?;
        utils::write(p, data)
            .await
            .context("Unable to write settings file")
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    pub fn y_tolerance(&self) -> f64 {
        self.y_tolerance
    }

    pub fn ledger_sign(&self) -> LedgerSign {
        self.ledger_sign
    }
}
