//! The registry is the boundary to whatever knows how to list live
//! instances. The export engine only ever talks to this trait.

mod memory;
mod snapshot;

pub use memory::InMemoryRegistry;
pub use snapshot::{SnapshotError, SnapshotRegistry, CATALOG_FILE, INSTANCES_DIR};

use crate::attribute::{AttrMap, AttrValue};
use crate::catalog::{InstanceId, ReferenceCatalog, ResourceSpec, ResourceType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTP statuses the upstream SDK uses for access-control failures.
pub const PERMISSION_STATUSES: [u16; 2] = [403, 501];

#[must_use]
pub fn is_permission_status(status: u16) -> bool {
    PERMISSION_STATUSES.contains(&status)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnumerateError {
    #[error("permission denied (HTTP {status}): {message}")]
    PermissionDenied { status: u16, message: String },

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl EnumerateError {
    /// Classify a failed upstream call by its HTTP status.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if is_permission_status(status) {
            Self::PermissionDenied { status, message }
        } else {
            Self::Upstream(format!("HTTP {status}: {message}"))
        }
    }

    #[must_use]
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// One live instance as returned by an enumerator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredInstance {
    pub id: InstanceId,
    /// Raw, unsanitized name.
    pub label: String,
    #[serde(default)]
    pub attributes: AttrMap,
}

impl DiscoveredInstance {
    #[must_use]
    pub fn new(id: impl Into<InstanceId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            attributes: AttrMap::new(),
        }
    }

    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }
}

/// Source of live instances and of the reference catalog describing them.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Every registered type, sorted.
    fn resource_types(&self) -> Vec<ResourceType>;

    /// List all live instances of one type. Pagination happens behind this
    /// call and stays sequential.
    async fn enumerate(
        &self,
        resource_type: &ResourceType,
    ) -> Result<Vec<DiscoveredInstance>, EnumerateError>;

    fn reference_catalog(&self, resource_type: &ResourceType) -> Option<ResourceSpec>;

    fn allowed_cycles(&self) -> Vec<Vec<ResourceType>>;

    /// Catalog over every registered type.
    fn catalog(&self) -> ReferenceCatalog {
        let mut catalog = ReferenceCatalog::new();
        for resource_type in self.resource_types() {
            let spec = self.reference_catalog(&resource_type).unwrap_or_default();
            catalog.insert(resource_type, spec);
        }
        for cycle in self.allowed_cycles() {
            catalog.allow_cycle(cycle);
        }
        catalog
    }

    fn is_registered(&self, resource_type: &ResourceType) -> bool {
        self.resource_types().contains(resource_type)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
