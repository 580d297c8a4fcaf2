use super::types::ExportConfig;
use super::ConfigError;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "tf-exporter.toml";

/// Parse and validate a TOML export configuration.
pub fn parse_config(content: &str) -> Result<ExportConfig, ConfigError> {
    let config: ExportConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load the export configuration.
///
/// Returns `ExportConfig::default()` if the file does not exist.
pub async fn load_config(path: &Path) -> Result<ExportConfig, ConfigError> {
    if !path.exists() {
        debug!("Export config not found at {}; using defaults", path.display());
        return Ok(ExportConfig::default());
    }

    let content = fs::read_to_string(path).await?;
    let config = parse_config(&content)?;
    debug!("Loaded export config from {}", path.display());
    Ok(config)
}
