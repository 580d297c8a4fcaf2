mod io;
mod types;

pub use io::{load_config, parse_config, DEFAULT_CONFIG_FILE};
pub use types::{
    ExcludedAttribute, ExportConfig, ExportFormat, ProviderConfig,
    DEFAULT_MAX_CONCURRENT_OPERATIONS,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read export config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse export config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid export config: {0}")]
    Invalid(String),
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
