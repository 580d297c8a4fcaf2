//! Renders resolved instances into the output documents and writes them.
//!
//! Every document is rendered in memory first. Files are then written with
//! write-then-rename, so a failed run never leaves half-written output.

pub mod hcl;
pub mod json;
mod state;

pub use state::{provider_address, render_state, STATE_VERSION};

use crate::catalog::ResourceType;
use crate::config::{ExportConfig, ExportFormat, ProviderConfig};
use crate::graph::format_cycle;
use crate::resolver::ResolvedInstance;
use crate::utils::{atomic_write_all, now_iso};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const STATE_FILE: &str = "terraform.tfstate";
pub const ERRORS_FILE: &str = "export_errors.json";
pub const CYCLES_FILE: &str = "cyclic_dependencies.txt";
/// Stem of the provider file in split output.
pub const PROVIDER_STEM: &str = "provider";

#[derive(Error, Debug)]
pub enum SerializeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Attribute '{name}' of {resource_type}.{label} is not a valid identifier")]
    InvalidAttributeName {
        resource_type: ResourceType,
        label: String,
        name: String,
    },
}

/// Instances grouped by type, types in order, instances in input order.
pub(crate) fn by_type(instances: &[ResolvedInstance]) -> Vec<(&ResourceType, Vec<&ResolvedInstance>)> {
    let mut grouped: BTreeMap<&ResourceType, Vec<&ResolvedInstance>> = BTreeMap::new();
    for instance in instances {
        grouped.entry(&instance.resource_type).or_default().push(instance);
    }
    grouped.into_iter().collect()
}

/// Where and how to write.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    pub directory: PathBuf,
    pub file_stem: String,
    pub format: ExportFormat,
    pub include_state_file: bool,
    pub split_files_by_resource: bool,
    pub provider: ProviderConfig,
}

impl SerializeOptions {
    #[must_use]
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            file_stem: config.file_stem.clone(),
            format: config.export_format,
            include_state_file: config.include_state_file,
            split_files_by_resource: config.split_files_by_resource,
            provider: config.provider.clone(),
        }
    }
}

/// Per-run facts written next to the documents.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    /// Types skipped because enumeration was denied.
    pub permission_failures: BTreeMap<ResourceType, String>,
    /// Fatal cycles let through by configuration.
    pub ignored_cycles: Vec<Vec<ResourceType>>,
    pub lineage: String,
    pub generated_at: String,
}

impl Default for RunMetadata {
    fn default() -> Self {
        Self {
            permission_failures: BTreeMap::new(),
            ignored_cycles: Vec::new(),
            lineage: uuid::Uuid::new_v4().to_string(),
            generated_at: now_iso(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PermissionErrorEntry<'a> {
    resource_type: &'a ResourceType,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct ErrorReport<'a> {
    generated_at: &'a str,
    permission_errors: Vec<PermissionErrorEntry<'a>>,
}

fn render_errors(metadata: &RunMetadata) -> Result<String, SerializeError> {
    let report = ErrorReport {
        generated_at: &metadata.generated_at,
        permission_errors: metadata
            .permission_failures
            .iter()
            .map(|(resource_type, message)| PermissionErrorEntry {
                resource_type,
                message,
            })
            .collect(),
    };
    let mut rendered = serde_json::to_string_pretty(&report)?;
    rendered.push('\n');
    Ok(rendered)
}

fn render_cycles(cycles: &[Vec<ResourceType>]) -> String {
    cycles
        .iter()
        .map(|cycle| format_cycle(cycle) + "\n")
        .collect()
}

/// A document ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub content: String,
}

impl RenderedFile {
    fn new(directory: &Path, name: impl AsRef<Path>, content: String) -> Self {
        Self {
            path: directory.join(name),
            content,
        }
    }
}

/// Render every output document of a run, in memory.
pub fn render(
    instances: &[ResolvedInstance],
    metadata: &RunMetadata,
    options: &SerializeOptions,
) -> Result<Vec<RenderedFile>, SerializeError> {
    let dir = options.directory.as_path();
    let mut files = Vec::new();

    if options.split_files_by_resource {
        for (resource_type, members) in by_type(instances) {
            let members: Vec<ResolvedInstance> = members.into_iter().cloned().collect();
            files.push(RenderedFile::new(
                dir,
                format!("{resource_type}.tf.json"),
                json::render_resources(&members)?,
            ));
            if options.format.includes_hcl() {
                files.push(RenderedFile::new(
                    dir,
                    format!("{resource_type}.tf"),
                    hcl::render_resources(&members)?,
                ));
            }
        }
        files.push(RenderedFile::new(
            dir,
            format!("{PROVIDER_STEM}.tf.json"),
            json::render_provider(&options.provider)?,
        ));
        if options.format.includes_hcl() {
            files.push(RenderedFile::new(
                dir,
                format!("{PROVIDER_STEM}.tf"),
                hcl::render_provider(&options.provider),
            ));
        }
    } else {
        files.push(RenderedFile::new(
            dir,
            format!("{}.tf.json", options.file_stem),
            json::render_document(instances, &options.provider)?,
        ));
        if options.format.includes_hcl() {
            files.push(RenderedFile::new(
                dir,
                format!("{}.tf", options.file_stem),
                hcl::render_document(instances, &options.provider)?,
            ));
        }
    }

    if options.include_state_file {
        files.push(RenderedFile::new(
            dir,
            STATE_FILE,
            render_state(
                instances,
                &options.provider,
                &metadata.lineage,
                &metadata.generated_at,
            )?,
        ));
    }
    if !metadata.permission_failures.is_empty() {
        files.push(RenderedFile::new(dir, ERRORS_FILE, render_errors(metadata)?));
    }
    if !metadata.ignored_cycles.is_empty() {
        files.push(RenderedFile::new(
            dir,
            CYCLES_FILE,
            render_cycles(&metadata.ignored_cycles),
        ));
    }

    debug!("Rendered {} file(s)", files.len());
    Ok(files)
}

/// Write rendered documents, creating the output directory when needed.
pub async fn write(files: Vec<RenderedFile>, directory: &Path) -> Result<Vec<PathBuf>, SerializeError> {
    tokio::fs::create_dir_all(directory).await?;
    let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
    atomic_write_all(files.into_iter().map(|f| (f.path, f.content)).collect()).await?;
    info!("Wrote {} file(s) to {}", paths.len(), directory.display());
    Ok(paths)
}

/// Render then write.
pub async fn serialize(
    instances: &[ResolvedInstance],
    metadata: &RunMetadata,
    options: &SerializeOptions,
) -> Result<Vec<PathBuf>, SerializeError> {
    let files = render(instances, metadata, options)?;
    write(files, &options.directory).await
}

#[cfg(test)]
#[path = "serializer_tests.rs"]
mod tests;
