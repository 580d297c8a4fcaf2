//! One export run: collect, validate, resolve, serialize.

mod report;

pub use report::ExportReport;

use crate::catalog::{ReferenceCatalog, ResourceType};
use crate::collector::{CollectError, CollectOptions, Collector, Corpus};
use crate::config::{ConfigError, ExportConfig};
use crate::graph::{self, CycleError, CycleValidator, Granularity, Graph, TypeGraph};
use crate::registry::Registry;
use crate::resolver::{resolve_all, ResolveError, ResolveOptions};
use crate::serializer::{self, RunMetadata, SerializeError, SerializeOptions};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Pipeline stage a run failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStage {
    Configuration,
    Collection,
    Validation,
    Resolution,
    Serialization,
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configuration => "configuration",
            Self::Collection => "collection",
            Self::Validation => "validation",
            Self::Resolution => "resolution",
            Self::Serialization => "serialization",
        })
    }
}

#[derive(Error, Debug)]
pub enum ExportErrorKind {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error("Excluded attribute '{0}' matches no resource type of this run")]
    UnmatchedExclusion(String),

    #[error("Export cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
#[error("Export failed during {stage}: {kind}")]
pub struct ExportError {
    pub stage: ExportStage,
    pub kind: ExportErrorKind,
}

impl ExportError {
    fn new(stage: ExportStage, kind: impl Into<ExportErrorKind>) -> Self {
        Self {
            stage,
            kind: kind.into(),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.kind,
            ExportErrorKind::Cancelled | ExportErrorKind::Collect(CollectError::Cancelled)
        )
    }
}

impl From<CollectError> for ExportError {
    fn from(e: CollectError) -> Self {
        let stage = match e {
            CollectError::LabelCollision { .. } => ExportStage::Serialization,
            CollectError::UnknownResourceType(_) | CollectError::InvalidFilter { .. } => {
                ExportStage::Configuration
            }
            _ => ExportStage::Collection,
        };
        Self::new(stage, e)
    }
}

/// Apply the configured attribute exclusions to the specs of `types`.
///
/// An entry that matches nothing is an error, unless dependencies may still
/// bring matching types into the run.
fn apply_exclusions(
    catalog: &mut ReferenceCatalog,
    config: &ExportConfig,
    types: &[ResourceType],
) -> Result<(), ExportError> {
    let exclusions = config
        .excluded_attributes()
        .map_err(|e| ExportError::new(ExportStage::Configuration, e))?;
    for (raw, exclusion) in config.excluded_attributes.iter().zip(exclusions) {
        let matched: Vec<ResourceType> = exclusion
            .matching_types(types)
            .map_err(|e| ExportError::new(ExportStage::Configuration, e))?
            .into_iter()
            .cloned()
            .collect();
        if matched.is_empty() {
            if config.include_dependencies {
                warn!("Excluded attribute '{}' matches no requested resource type", raw);
                continue;
            }
            return Err(ExportError::new(
                ExportStage::Configuration,
                ExportErrorKind::UnmatchedExclusion(raw.clone()),
            ));
        }
        for resource_type in &matched {
            if let Some(spec) = catalog.spec_mut(resource_type) {
                debug!("Excluding {} from {}", exclusion.path, resource_type);
                spec.exclude(exclusion.path.clone());
            }
        }
    }
    Ok(())
}

fn check_cancelled(cancel: &watch::Receiver<bool>, stage: ExportStage) -> Result<(), ExportError> {
    if *cancel.borrow() {
        warn!("Export cancelled before {}", stage);
        return Err(ExportError::new(stage, ExportErrorKind::Cancelled));
    }
    Ok(())
}

/// Types the cycle search covers: everything that made it into the corpus.
fn corpus_types(corpus: &Corpus) -> Vec<ResourceType> {
    corpus
        .collected_types
        .iter()
        .chain(&corpus.dependency_types)
        .cloned()
        .collect()
}

/// Run one export against `registry`.
///
/// Nothing is written unless every stage succeeds. Flipping `cancel` to
/// `true` aborts the run before the next stage; a run aborted during
/// collection discards the partial corpus.
pub async fn run_export(
    registry: &dyn Registry,
    config: &ExportConfig,
    cancel: watch::Receiver<bool>,
) -> Result<ExportReport, ExportError> {
    config
        .validate()
        .map_err(|e| ExportError::new(ExportStage::Configuration, e))?;

    let registered = registry.resource_types();
    let options = CollectOptions::from_config(config, &registered)?;
    let scope = if config.include_dependencies {
        registered
    } else {
        options.selection.requested_types()
    };
    let mut catalog = registry.catalog();
    apply_exclusions(&mut catalog, config, &scope)?;

    info!("Export stage: {}", ExportStage::Collection);
    let corpus = Collector::new(registry, options)
        .with_catalog(catalog.clone())
        .collect(cancel.clone())
        .await?;

    info!("Export stage: {}", ExportStage::Validation);
    let run_catalog = catalog.restricted_to(&corpus_types(&corpus));
    let cycles = CycleValidator::from_catalog(&run_catalog).classify(&TypeGraph::from_catalog(&run_catalog));
    let mut metadata = RunMetadata {
        permission_failures: corpus.permission_failures.clone(),
        ..RunMetadata::default()
    };
    if !cycles.is_clean() {
        if !config.ignore_cyclic_dependencies {
            return Err(ExportError::new(
                ExportStage::Validation,
                CycleError::Fatal(cycles.fatal),
            ));
        }
        warn!(
            "Ignoring {} cycle(s) not on the allow-list as configured",
            cycles.fatal.len()
        );
        metadata.ignored_cycles.clone_from(&cycles.fatal);
    }
    let dangling = match graph::build(&corpus.instances, &catalog, Granularity::Instance) {
        Graph::Instances(fine) => fine.dangling.len(),
        Graph::Types(_) => 0,
    };
    if dangling > 0 {
        info!("{} reference(s) point outside the export", dangling);
    }
    check_cancelled(&cancel, ExportStage::Resolution)?;

    info!("Export stage: {}", ExportStage::Resolution);
    let resolved = resolve_all(
        &corpus.instances,
        &catalog,
        ResolveOptions {
            preserve_unresolved_references: config.preserve_unresolved_references,
        },
    )
    .map_err(|e| ExportError::new(ExportStage::Resolution, e))?;
    check_cancelled(&cancel, ExportStage::Serialization)?;

    info!("Export stage: {}", ExportStage::Serialization);
    let files = serializer::serialize(&resolved, &metadata, &SerializeOptions::from_config(config))
        .await
        .map_err(|e| ExportError::new(ExportStage::Serialization, e))?;

    let report = ExportReport {
        files,
        instance_count: resolved.len(),
        exported_types: resolved.iter().map(|r| r.resource_type.clone()).collect(),
        dependency_types: corpus.dependency_types,
        warnings: resolved.into_iter().flat_map(|r| r.warnings).collect(),
        permission_failures: corpus.permission_failures,
        tolerated_cycles: cycles.tolerated,
        ignored_cycles: metadata.ignored_cycles,
        dangling_references: dangling,
    };
    info!(
        "Export finished: {} instance(s), {} warning(s)",
        report.instance_count,
        report.warnings.len()
    );
    Ok(report)
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
