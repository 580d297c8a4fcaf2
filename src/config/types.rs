use super::ConfigError;
use crate::attribute::AttrPath;
use crate::catalog::ResourceType;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default number of enumerator calls in flight.
pub const DEFAULT_MAX_CONCURRENT_OPERATIONS: usize = 10;

/// Which documents an export run renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Structured JSON only.
    #[default]
    Json,
    /// Structured JSON plus the HCL rendering.
    JsonHcl,
}

impl ExportFormat {
    #[must_use]
    pub fn includes_hcl(self) -> bool {
        matches!(self, Self::JsonHcl)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::JsonHcl => f.write_str("json_hcl"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "json_hcl" | "json-hcl" => Ok(Self::JsonHcl),
            other => Err(ConfigError::Invalid(format!(
                "unknown export format '{other}' (expected json or json_hcl)"
            ))),
        }
    }
}

/// Provider block written under `terraform.required_providers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,
    #[serde(default = "default_provider_source")]
    pub source: String,
    #[serde(default = "default_provider_version")]
    pub version: String,
}

fn default_provider_name() -> String {
    "genesyscloud".to_string()
}

fn default_provider_source() -> String {
    "mypurecloud/genesyscloud".to_string()
}

fn default_provider_version() -> String {
    "1.0.0".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            source: default_provider_source(),
            version: default_provider_version(),
        }
    }
}

/// Settings of one export run, read from TOML and overridden by CLI flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Output directory.
    pub directory: PathBuf,
    /// Base name of the single-file outputs (`<stem>.tf.json`, `<stem>.tf`).
    pub file_stem: String,
    /// Requested types; empty means every registered type. Entries may be
    /// `type::label_regex`.
    pub resource_types: Vec<String>,
    /// `type` drops the whole type, `type::label_regex` drops matching instances.
    pub exclude_filter_resources: Vec<String>,
    /// `type_regex.attr.path` entries.
    pub excluded_attributes: Vec<String>,
    pub export_format: ExportFormat,
    pub include_state_file: bool,
    pub split_files_by_resource: bool,
    /// Log and skip types whose enumeration was denied instead of failing.
    pub log_permission_errors: bool,
    pub include_dependencies: bool,
    pub ignore_cyclic_dependencies: bool,
    pub preserve_unresolved_references: bool,
    pub max_concurrent_operations: usize,
    pub provider: ProviderConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./export"),
            file_stem: "export".to_string(),
            resource_types: Vec::new(),
            exclude_filter_resources: Vec::new(),
            excluded_attributes: Vec::new(),
            export_format: ExportFormat::default(),
            include_state_file: false,
            split_files_by_resource: false,
            log_permission_errors: false,
            include_dependencies: false,
            ignore_cyclic_dependencies: false,
            preserve_unresolved_references: false,
            max_concurrent_operations: DEFAULT_MAX_CONCURRENT_OPERATIONS,
            provider: ProviderConfig::default(),
        }
    }
}

impl ExportConfig {
    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_operations == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_operations must be at least 1".to_string(),
            ));
        }
        if self.file_stem.trim().is_empty() || self.file_stem.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "file_stem '{}' must be a plain file name",
                self.file_stem
            )));
        }
        if semver::Version::parse(&self.provider.version).is_err()
            && semver::VersionReq::parse(&self.provider.version).is_err()
        {
            return Err(ConfigError::Invalid(format!(
                "provider version '{}' is not a semantic version",
                self.provider.version
            )));
        }
        for raw in &self.excluded_attributes {
            ExcludedAttribute::parse(raw)?;
        }
        for raw in self.resource_types.iter().chain(&self.exclude_filter_resources) {
            if let Some((_, pattern)) = raw.split_once("::") {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::Invalid(format!("invalid label filter '{raw}': {e}"))
                })?;
            }
        }
        Ok(())
    }

    pub fn excluded_attributes(&self) -> Result<Vec<ExcludedAttribute>, ConfigError> {
        self.excluded_attributes
            .iter()
            .map(|raw| ExcludedAttribute::parse(raw.as_str()))
            .collect()
    }
}

/// `type_regex.attr.path`: drop `attr.path` from every matching type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedAttribute {
    pub type_pattern: String,
    pub path: AttrPath,
}

impl ExcludedAttribute {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let (type_pattern, attribute) = raw
            .split_once('.')
            .ok_or_else(|| ConfigError::Invalid(format!("invalid excluded attribute '{raw}'")))?;
        if attribute.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "excluded attribute '{raw}' does not name an attribute"
            )));
        }
        let path = AttrPath::parse(attribute)
            .map_err(|e| ConfigError::Invalid(format!("excluded attribute '{raw}': {e}")))?;
        Ok(Self {
            type_pattern: type_pattern.to_string(),
            path,
        })
    }

    /// Types this entry applies to. An exact name wins, otherwise the
    /// pattern is matched as an unanchored regex.
    pub fn matching_types<'a>(
        &self,
        types: &'a [ResourceType],
    ) -> Result<Vec<&'a ResourceType>, ConfigError> {
        if let Some(exact) = types.iter().find(|t| t.as_str() == self.type_pattern) {
            return Ok(vec![exact]);
        }
        let pattern = Regex::new(&self.type_pattern).map_err(|e| {
            ConfigError::Invalid(format!(
                "invalid resource pattern '{}': {e}",
                self.type_pattern
            ))
        })?;
        Ok(types.iter().filter(|t| pattern.is_match(t.as_str())).collect())
    }
}
