use super::labels::sanitize_label;
use super::CollectError;
use crate::catalog::ResourceType;
use crate::registry::DiscoveredInstance;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Separator between a type name and a label regex in filter entries.
pub const FILTER_SEPARATOR: &str = "::";

/// A `type` or `type::label_regex` filter entry.
#[derive(Debug, Clone)]
pub struct ResourceFilter {
    pub resource_type: ResourceType,
    pub label_pattern: Option<Regex>,
}

impl ResourceFilter {
    pub fn parse(raw: &str) -> Result<Self, CollectError> {
        let (name, pattern) = match raw.split_once(FILTER_SEPARATOR) {
            Some((name, pattern)) => (name, Some(pattern)),
            None => (raw, None),
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(CollectError::InvalidFilter {
                filter: raw.to_string(),
                reason: "missing resource type".to_string(),
            });
        }
        let label_pattern = pattern
            .map(Regex::new)
            .transpose()
            .map_err(|e| CollectError::InvalidFilter {
                filter: raw.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            resource_type: ResourceType::new(name),
            label_pattern,
        })
    }
}

fn label_matches(patterns: &[Regex], instance: &DiscoveredInstance) -> bool {
    let sanitized = sanitize_label(&instance.label, &instance.id);
    patterns
        .iter()
        .any(|p| p.is_match(&instance.label) || p.is_match(&sanitized))
}

/// Which types get enumerated and which of their instances are kept.
#[derive(Debug, Clone, Default)]
pub struct TypeSelection {
    /// Requested types; a `None` pattern list selects every instance.
    include: BTreeMap<ResourceType, Option<Vec<Regex>>>,
    exclude_types: BTreeSet<ResourceType>,
    exclude_labels: BTreeMap<ResourceType, Vec<Regex>>,
}

impl TypeSelection {
    /// Resolve filter entries against the registered types. An empty
    /// include list selects every registered type.
    pub fn new(
        registered: &[ResourceType],
        include: &[String],
        exclude: &[String],
    ) -> Result<Self, CollectError> {
        let mut selection = Self::default();

        if include.is_empty() {
            for resource_type in registered {
                selection.include.insert(resource_type.clone(), None);
            }
        }
        for raw in include {
            let filter = ResourceFilter::parse(raw)?;
            if !registered.contains(&filter.resource_type) {
                return Err(CollectError::UnknownResourceType(filter.resource_type));
            }
            let entry = selection
                .include
                .entry(filter.resource_type)
                .or_insert_with(|| Some(Vec::new()));
            match (entry, filter.label_pattern) {
                (Some(patterns), Some(pattern)) => patterns.push(pattern),
                // A bare type name selects every instance.
                (entry, None) => *entry = None,
                (None, Some(_)) => {}
            }
        }

        for raw in exclude {
            let filter = ResourceFilter::parse(raw)?;
            if !registered.contains(&filter.resource_type) {
                warn!(
                    "Exclude filter '{}' names an unregistered resource type",
                    raw
                );
            }
            match filter.label_pattern {
                Some(pattern) => selection
                    .exclude_labels
                    .entry(filter.resource_type)
                    .or_default()
                    .push(pattern),
                None => {
                    selection.exclude_types.insert(filter.resource_type);
                }
            }
        }
        Ok(selection)
    }

    /// Types to enumerate in the first pass, sorted.
    #[must_use]
    pub fn requested_types(&self) -> Vec<ResourceType> {
        self.include
            .keys()
            .filter(|t| !self.exclude_types.contains(*t))
            .cloned()
            .collect()
    }

    /// Whether the type may appear in the output at all.
    #[must_use]
    pub fn allows_type(&self, resource_type: &ResourceType) -> bool {
        !self.exclude_types.contains(resource_type)
    }

    /// Whether an instance passes the exclude filters.
    #[must_use]
    pub fn allows_instance(&self, resource_type: &ResourceType, instance: &DiscoveredInstance) -> bool {
        self.allows_type(resource_type)
            && !self
                .exclude_labels
                .get(resource_type)
                .is_some_and(|patterns| label_matches(patterns, instance))
    }

    /// Whether an instance was requested in the first pass.
    #[must_use]
    pub fn selects(&self, resource_type: &ResourceType, instance: &DiscoveredInstance) -> bool {
        let included = match self.include.get(resource_type) {
            Some(None) => true,
            Some(Some(patterns)) => label_matches(patterns, instance),
            None => false,
        };
        included && self.allows_instance(resource_type, instance)
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
