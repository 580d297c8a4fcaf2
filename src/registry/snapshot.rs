//! Registry backed by captured enumerator output on disk.
//!
//! ```text
//! snapshot/
//!   catalog.toml
//!   instances/
//!     routing_queue.json
//!     auth_division.yaml
//! ```
//!
//! Every instance file holds `{resource_type, instances: [...], error?}`.
//! Several files may contribute to the same type.

use super::{DiscoveredInstance, EnumerateError, InMemoryRegistry, Registry};
use crate::catalog::{load_catalog, CatalogError, ResourceSpec, ResourceType};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use walkdir::WalkDir;

pub const CATALOG_FILE: &str = "catalog.toml";
pub const INSTANCES_DIR: &str = "instances";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot directory not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read snapshot catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Failed to walk snapshot directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotFile {
    resource_type: ResourceType,
    #[serde(default)]
    instances: Vec<DiscoveredInstance>,
    #[serde(default)]
    error: Option<CapturedFailure>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CapturedFailure {
    status: u16,
    message: String,
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Json,
    Yaml,
}

fn snapshot_format(path: &Path) -> Option<Format> {
    match path.extension()?.to_str()? {
        "json" => Some(Format::Json),
        "yaml" | "yml" => Some(Format::Yaml),
        _ => None,
    }
}

fn parse_file(path: &Path, format: Format, content: &str) -> Result<SnapshotFile, SnapshotError> {
    match format {
        Format::Json => serde_json::from_str(content).map_err(|source| SnapshotError::Json {
            path: path.to_path_buf(),
            source,
        }),
        Format::Yaml => serde_yaml::from_str(content).map_err(|source| SnapshotError::Yaml {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[derive(Debug)]
pub struct SnapshotRegistry {
    root: PathBuf,
    inner: InMemoryRegistry,
}

impl SnapshotRegistry {
    /// Load a snapshot directory. A missing `catalog.toml` means no reference
    /// rules; a missing `instances/` directory means no instances.
    pub async fn open(root: &Path) -> Result<Self, SnapshotError> {
        if !root.is_dir() {
            return Err(SnapshotError::NotFound(root.to_path_buf()));
        }

        let catalog_path = root.join(CATALOG_FILE);
        let mut inner = if catalog_path.exists() {
            InMemoryRegistry::from_catalog(&load_catalog(&catalog_path).await?)
        } else {
            debug!("No {} in {}; using an empty catalog", CATALOG_FILE, root.display());
            InMemoryRegistry::new()
        };

        let instances_dir = root.join(INSTANCES_DIR);
        let mut files = 0usize;
        if instances_dir.is_dir() {
            let walker = WalkDir::new(&instances_dir)
                .min_depth(1)
                .sort_by_file_name();
            for entry in walker {
                let entry = entry?;
                let path = entry.path();
                let Some(format) = snapshot_format(path) else {
                    continue;
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let content = fs::read_to_string(path).await?;
                let file = parse_file(path, format, &content)?;
                debug!(
                    "Loaded {} {} instance(s) from {}",
                    file.instances.len(),
                    file.resource_type,
                    path.display()
                );
                for instance in file.instances {
                    inner.push_instance(file.resource_type.clone(), instance);
                }
                if let Some(failure) = file.error {
                    inner.set_failure(
                        file.resource_type,
                        EnumerateError::from_status(failure.status, failure.message),
                    );
                }
                files += 1;
            }
        }

        info!(
            "Opened snapshot {} ({} type(s), {} file(s))",
            root.display(),
            inner.resource_types().len(),
            files
        );
        Ok(Self {
            root: root.to_path_buf(),
            inner,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Registry for SnapshotRegistry {
    fn resource_types(&self) -> Vec<ResourceType> {
        self.inner.resource_types()
    }

    async fn enumerate(
        &self,
        resource_type: &ResourceType,
    ) -> Result<Vec<DiscoveredInstance>, EnumerateError> {
        self.inner.enumerate(resource_type).await
    }

    fn reference_catalog(&self, resource_type: &ResourceType) -> Option<ResourceSpec> {
        self.inner.reference_catalog(resource_type)
    }

    fn allowed_cycles(&self) -> Vec<Vec<ResourceType>> {
        self.inner.allowed_cycles()
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
