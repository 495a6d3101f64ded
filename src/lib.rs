pub mod args;
pub mod commands;
mod config;
mod error;
pub mod extract;
pub mod model;
pub mod recon;
pub mod text;
mod utils;

#[cfg(test)]
mod test;

pub use config::{find_mapping_path, Config, Settings, MAPPING_JSON};
pub use error::{ConfigError, Error, Result};
