//! Instance collection: fans enumerator calls out across types, applies the
//! permission-error policy and filters, and assigns labels.

mod dependencies;
mod filter;
mod labels;

pub use filter::{ResourceFilter, TypeSelection, FILTER_SEPARATOR};
pub use labels::{assign_labels, sanitize_label};

use crate::attribute::AttrMap;
use crate::catalog::{InstanceId, ReferenceCatalog, ResourceType};
use crate::config::ExportConfig;
use crate::graph::InstanceKey;
use crate::registry::{DiscoveredInstance, EnumerateError, Registry};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Hint attached to fatal permission failures.
pub const PERMISSION_HINT: &str =
    "set log_permission_errors = true to skip resource types that cannot be read";

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Failed to enumerate {resource_type}: {source}")]
    Enumerate {
        resource_type: ResourceType,
        source: EnumerateError,
    },

    #[error("Permission denied while enumerating {}; {}", type_list(.failures), PERMISSION_HINT)]
    PermissionDenied {
        failures: BTreeMap<ResourceType, String>,
    },

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(ResourceType),

    #[error("Invalid resource filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("No unique label could be derived for {resource_type} '{label}'")]
    LabelCollision {
        resource_type: ResourceType,
        label: String,
    },

    #[error("Collection cancelled")]
    Cancelled,
}

fn type_list(failures: &BTreeMap<ResourceType, String>) -> String {
    failures
        .keys()
        .map(ResourceType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A collected instance with its final label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceInstance {
    pub resource_type: ResourceType,
    pub id: InstanceId,
    /// Sanitized, unique within the type.
    pub label: String,
    pub raw_label: String,
    pub attributes: AttrMap,
}

impl ResourceInstance {
    #[must_use]
    pub fn key(&self) -> InstanceKey {
        InstanceKey::new(self.resource_type.clone(), self.id.clone())
    }
}

/// Immutable result of a collection run.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// Sorted by `(type, id)`.
    pub instances: Vec<ResourceInstance>,
    /// Types that were enumerated successfully.
    pub collected_types: BTreeSet<ResourceType>,
    /// Types skipped because enumeration was denied, with the reason.
    pub permission_failures: BTreeMap<ResourceType, String>,
    /// Types pulled in only to satisfy references.
    pub dependency_types: BTreeSet<ResourceType>,
}

impl Corpus {
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    #[must_use]
    pub fn get(&self, resource_type: &ResourceType, id: &str) -> Option<&ResourceInstance> {
        self.instances
            .binary_search_by(|i| {
                (&i.resource_type, i.id.as_str()).cmp(&(resource_type, id))
            })
            .ok()
            .and_then(|pos| self.instances.get(pos))
    }

    pub fn of_type<'a>(
        &'a self,
        resource_type: &'a ResourceType,
    ) -> impl Iterator<Item = &'a ResourceInstance> + 'a {
        self.instances
            .iter()
            .filter(move |i| &i.resource_type == resource_type)
    }
}

/// Settings of one collection run.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub selection: TypeSelection,
    pub log_permission_errors: bool,
    pub include_dependencies: bool,
    pub max_concurrent_operations: usize,
}

impl CollectOptions {
    /// Options for a run over `registered` types as configured.
    pub fn from_config(config: &ExportConfig, registered: &[ResourceType]) -> Result<Self, CollectError> {
        Ok(Self {
            selection: TypeSelection::new(
                registered,
                &config.resource_types,
                &config.exclude_filter_resources,
            )?,
            log_permission_errors: config.log_permission_errors,
            include_dependencies: config.include_dependencies,
            max_concurrent_operations: config.max_concurrent_operations,
        })
    }
}

/// Instances enumerated so far, before labelling, keyed by type.
type Enumerated = BTreeMap<ResourceType, Vec<DiscoveredInstance>>;

pub struct Collector<'r> {
    registry: &'r dyn Registry,
    /// Consulted by dependency resolution.
    catalog: ReferenceCatalog,
    options: CollectOptions,
}

impl<'r> Collector<'r> {
    #[must_use]
    pub fn new(registry: &'r dyn Registry, options: CollectOptions) -> Self {
        Self {
            registry,
            catalog: registry.catalog(),
            options,
        }
    }

    /// Use `catalog` instead of the registry's, e.g. with run-time exclusions
    /// applied.
    #[must_use]
    pub fn with_catalog(mut self, catalog: ReferenceCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Collect the corpus, or stop with [`CollectError::Cancelled`] as soon as
    /// `cancel` turns true. Nothing of a cancelled run is kept.
    pub async fn collect(&self, cancel: watch::Receiver<bool>) -> Result<Corpus, CollectError> {
        tokio::select! {
            biased;
            () = cancelled(cancel) => {
                warn!("Collection cancelled; discarding partial results");
                Err(CollectError::Cancelled)
            }
            result = self.run() => result,
        }
    }

    async fn run(&self) -> Result<Corpus, CollectError> {
        let requested = self.options.selection.requested_types();
        info!("Collecting {} resource type(s)", requested.len());

        let mut permission_failures = BTreeMap::new();
        let mut enumerated = self.enumerate_all(requested, &mut permission_failures).await?;

        let mut selected: Enumerated = enumerated
            .iter()
            .map(|(resource_type, instances)| {
                let kept = instances
                    .iter()
                    .filter(|i| self.options.selection.selects(resource_type, i))
                    .cloned()
                    .collect();
                (resource_type.clone(), kept)
            })
            .collect();
        let collected_types: BTreeSet<_> = selected.keys().cloned().collect();

        let mut dependency_types = BTreeSet::new();
        if self.options.include_dependencies {
            dependency_types = self
                .resolve_dependencies(&mut enumerated, &mut selected, &mut permission_failures)
                .await?;
        }

        if !permission_failures.is_empty() {
            let summary = permission_failures
                .iter()
                .map(|(t, message)| format!("{t}: {message}"))
                .collect::<Vec<_>>()
                .join("; ");
            warn!(
                "Skipped {} resource type(s) due to permission errors: {}",
                permission_failures.len(),
                summary
            );
        }

        let mut instances = Vec::new();
        for (resource_type, discovered) in selected {
            instances.extend(assign_labels(&resource_type, discovered)?);
        }
        instances.sort_by(|a, b| (&a.resource_type, &a.id).cmp(&(&b.resource_type, &b.id)));

        info!(
            "Collected {} instance(s) across {} type(s)",
            instances.len(),
            collected_types.len() + dependency_types.len()
        );
        Ok(Corpus {
            instances,
            collected_types,
            permission_failures,
            dependency_types,
        })
    }

    /// Call each enumerator once with at most `max_concurrent_operations`
    /// calls in flight. Permission failures are recorded or fatal per
    /// configuration; any other failure is fatal.
    async fn enumerate_all(
        &self,
        types: Vec<ResourceType>,
        permission_failures: &mut BTreeMap<ResourceType, String>,
    ) -> Result<Enumerated, CollectError> {
        let registry = self.registry;
        let mut results: Vec<_> = stream::iter(types)
            .map(|resource_type| async move {
                debug!("Enumerating {}", resource_type);
                let result = registry.enumerate(&resource_type).await;
                (resource_type, result)
            })
            .buffer_unordered(self.options.max_concurrent_operations.max(1))
            .collect()
            .await;
        results.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut enumerated = Enumerated::new();
        let mut denied = BTreeMap::new();
        for (resource_type, result) in results {
            match result {
                Ok(discovered) => {
                    enumerated.insert(resource_type, dedup(discovered));
                }
                Err(EnumerateError::PermissionDenied { status, message }) => {
                    denied.insert(resource_type, format!("HTTP {status}: {message}"));
                }
                Err(source) => {
                    return Err(CollectError::Enumerate {
                        resource_type,
                        source,
                    });
                }
            }
        }

        if !denied.is_empty() && !self.options.log_permission_errors {
            return Err(CollectError::PermissionDenied { failures: denied });
        }
        permission_failures.extend(denied);
        Ok(enumerated)
    }
}

/// Keep the first occurrence of every id.
fn dedup(discovered: Vec<DiscoveredInstance>) -> Vec<DiscoveredInstance> {
    let mut seen = BTreeSet::new();
    discovered
        .into_iter()
        .filter(|instance| {
            let first = seen.insert(instance.id.clone());
            if !first {
                debug!("Dropping duplicate instance {}", instance.id);
            }
            first
        })
        .collect()
}

async fn cancelled(mut cancel: watch::Receiver<bool>) {
    if cancel.wait_for(|&cancelled| cancelled).await.is_err() {
        // Sender gone without cancelling: the run can no longer be cancelled.
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;
