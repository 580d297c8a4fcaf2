use super::{DiscoveredInstance, EnumerateError, Registry};
use crate::catalog::{ReferenceCatalog, ResourceSpec, ResourceType};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

#[derive(Debug)]
enum Enumeration {
    Instances(Vec<DiscoveredInstance>),
    Failure(EnumerateError),
    /// Never completes; used to exercise cancellation.
    Stalled,
}

#[derive(Debug)]
struct TypeEntry {
    spec: ResourceSpec,
    enumeration: Enumeration,
    calls: AtomicUsize,
}

impl TypeEntry {
    fn new(spec: ResourceSpec) -> Self {
        Self {
            spec,
            enumeration: Enumeration::Instances(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

/// Registry held entirely in memory, assembled with a builder.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    entries: BTreeMap<ResourceType, TypeEntry>,
    allowed_cycles: Vec<Vec<ResourceType>>,
}

impl InMemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every type of `catalog` together with its allow-list.
    #[must_use]
    pub fn from_catalog(catalog: &ReferenceCatalog) -> Self {
        let mut registry = Self::new();
        for (resource_type, spec) in catalog.iter() {
            registry
                .entries
                .insert(resource_type.clone(), TypeEntry::new(spec.clone()));
        }
        registry.allowed_cycles = catalog.allowed_cycles().to_vec();
        registry
    }

    fn entry(&mut self, resource_type: ResourceType) -> &mut TypeEntry {
        self.entries
            .entry(resource_type)
            .or_insert_with(|| TypeEntry::new(ResourceSpec::default()))
    }

    #[must_use]
    pub fn with_type(mut self, resource_type: impl Into<ResourceType>, spec: ResourceSpec) -> Self {
        self.entry(resource_type.into()).spec = spec;
        self
    }

    /// Add an instance, registering the type with an empty spec if needed.
    #[must_use]
    pub fn with_instance(
        mut self,
        resource_type: impl Into<ResourceType>,
        instance: DiscoveredInstance,
    ) -> Self {
        self.push_instance(resource_type.into(), instance);
        self
    }

    pub fn push_instance(&mut self, resource_type: ResourceType, instance: DiscoveredInstance) {
        let entry = self.entry(resource_type);
        match &mut entry.enumeration {
            Enumeration::Instances(instances) => instances.push(instance),
            other => *other = Enumeration::Instances(vec![instance]),
        }
    }

    /// Make enumeration of the type fail.
    #[must_use]
    pub fn with_failure(mut self, resource_type: impl Into<ResourceType>, error: EnumerateError) -> Self {
        self.set_failure(resource_type.into(), error);
        self
    }

    pub fn set_failure(&mut self, resource_type: ResourceType, error: EnumerateError) {
        self.entry(resource_type).enumeration = Enumeration::Failure(error);
    }

    /// Make enumeration of the type hang until the caller gives up.
    #[must_use]
    pub fn with_stalled(mut self, resource_type: impl Into<ResourceType>) -> Self {
        self.entry(resource_type.into()).enumeration = Enumeration::Stalled;
        self
    }

    #[must_use]
    pub fn allow_cycle<I, T>(mut self, cycle: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ResourceType>,
    {
        self.allowed_cycles
            .push(cycle.into_iter().map(Into::into).collect());
        self
    }

    /// How many times `enumerate` was called for the type.
    #[must_use]
    pub fn enumeration_count(&self, resource_type: &ResourceType) -> usize {
        self.entries
            .get(resource_type)
            .map_or(0, |entry| entry.calls.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl Registry for InMemoryRegistry {
    fn resource_types(&self) -> Vec<ResourceType> {
        self.entries.keys().cloned().collect()
    }

    async fn enumerate(
        &self,
        resource_type: &ResourceType,
    ) -> Result<Vec<DiscoveredInstance>, EnumerateError> {
        let entry = self.entries.get(resource_type).ok_or_else(|| {
            EnumerateError::Upstream(format!("resource type {resource_type} is not registered"))
        })?;
        entry.calls.fetch_add(1, Ordering::SeqCst);
        match &entry.enumeration {
            Enumeration::Instances(instances) => {
                debug!("Enumerated {} {} instance(s)", instances.len(), resource_type);
                Ok(instances.clone())
            }
            Enumeration::Failure(error) => Err(error.clone()),
            Enumeration::Stalled => std::future::pending().await,
        }
    }

    fn reference_catalog(&self, resource_type: &ResourceType) -> Option<ResourceSpec> {
        self.entries.get(resource_type).map(|entry| entry.spec.clone())
    }

    fn allowed_cycles(&self) -> Vec<Vec<ResourceType>> {
        self.allowed_cycles.clone()
    }
}
