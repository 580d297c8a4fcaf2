//! Reference resolution: rewrites raw ids into symbolic references to other
//! exported instances and applies the per-type attribute policies.
//!
//! Order of work on every instance:
//! excluded attributes and the root `id` are dropped, references are
//! resolved (or dropped, or kept literal with a warning), remaining strings
//! are escaped, zero-valued attributes are suppressed unless allow-listed,
//! and finally block elements missing all of their required attributes are
//! removed. Strings declared as JSON documents are decoded, and the
//! references declared inside them are resolved the same way.

mod value;

pub use value::{escape_template, ResolvedValue, SymbolicRef};

use crate::attribute::{AttrMap, AttrPath, AttrValue};
use crate::catalog::{InstanceId, RefDescriptor, ReferenceCatalog, ResourceSpec, ResourceType};
use crate::collector::ResourceInstance;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No reference catalog entry for resource type {0}")]
    MissingSpec(ResourceType),
}

/// `(type, id) → label` of every instance in the current export.
///
/// Labels come from the collector, which already made them unique per type.
#[derive(Debug, Clone, Default)]
pub struct ExportIndex {
    labels: BTreeMap<ResourceType, BTreeMap<InstanceId, String>>,
}

impl ExportIndex {
    #[must_use]
    pub fn from_instances(instances: &[ResourceInstance]) -> Self {
        let mut labels: BTreeMap<ResourceType, BTreeMap<InstanceId, String>> = BTreeMap::new();
        for instance in instances {
            labels
                .entry(instance.resource_type.clone())
                .or_default()
                .insert(instance.id.clone(), instance.label.clone());
        }
        Self { labels }
    }

    #[must_use]
    pub fn label_of(&self, resource_type: &ResourceType, id: &str) -> Option<&str> {
        self.labels
            .get(resource_type)
            .and_then(|ids| ids.get(id))
            .map(String::as_str)
    }

    /// Whether some exported instance of `resource_type` carries `label`.
    #[must_use]
    pub fn has_label(&self, resource_type: &ResourceType, label: &str) -> bool {
        self.labels
            .get(resource_type)
            .is_some_and(|ids| ids.values().any(|l| l == label))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Keep every unresolved reference as its literal id.
    pub preserve_unresolved_references: bool,
}

/// A reference kept as a literal because its target is not exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    pub resource_type: ResourceType,
    pub label: String,
    pub attribute: AttrPath,
    pub target_type: ResourceType,
    pub target_id: InstanceId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInstance {
    pub resource_type: ResourceType,
    pub id: InstanceId,
    pub label: String,
    pub attributes: BTreeMap<String, ResolvedValue>,
    pub warnings: Vec<UnresolvedReference>,
}

impl ResolvedInstance {
    #[must_use]
    pub fn symbolic_ref(&self) -> SymbolicRef {
        SymbolicRef::new(self.resource_type.clone(), self.label.clone())
    }
}

enum Lookup {
    /// Not declared as a reference, an allowed literal, or rejected by a
    /// custom resolver.
    Plain,
    Resolved(SymbolicRef),
    Drop,
    KeepLiteral,
}

struct Resolution<'a> {
    instance: &'a ResourceInstance,
    spec: &'a ResourceSpec,
    index: &'a ExportIndex,
    options: ResolveOptions,
    warnings: Vec<UnresolvedReference>,
}

impl Resolution<'_> {
    fn resolve_map(&mut self, map: &AttrMap, location: &AttrPath) -> BTreeMap<String, ResolvedValue> {
        let mut resolved = BTreeMap::new();
        for (key, value) in map {
            if location.is_root() && key == "id" {
                continue;
            }
            let child = location.child_key(key);
            if self.spec.is_excluded(&child) {
                continue;
            }
            let Some(value) = self.resolve_value(value, &child, map) else {
                continue;
            };
            if value.is_zero() && !self.spec.allows_zero(&child) {
                continue;
            }
            resolved.insert(key.clone(), value);
        }
        resolved
    }

    fn resolve_value(
        &mut self,
        value: &AttrValue,
        location: &AttrPath,
        siblings: &AttrMap,
    ) -> Option<ResolvedValue> {
        let resolved = match value {
            AttrValue::Null => return None,
            AttrValue::Bool(b) => ResolvedValue::Bool(*b),
            AttrValue::Float(f) => ResolvedValue::Float(*f),
            AttrValue::String(raw) if self.spec.is_json_document(location) => {
                self.resolve_document(raw, location)
            }
            AttrValue::Int(_) | AttrValue::String(_) => match self.lookup(value, location, siblings) {
                Lookup::Resolved(reference) => ResolvedValue::Reference(reference),
                Lookup::Drop => return None,
                Lookup::Plain | Lookup::KeepLiteral => scalar(value)?,
            },
            AttrValue::List(items) => {
                let mut kept = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let child = location.child_index(i);
                    if self.spec.is_excluded(&child) {
                        continue;
                    }
                    let Some(item) = self.resolve_value(item, &child, siblings) else {
                        continue;
                    };
                    // A block element emptied by resolution goes, scalars stay.
                    if !matches!(&item, ResolvedValue::Map(inner) if inner.is_empty()) {
                        kept.push(item);
                    }
                }
                ResolvedValue::List(kept)
            }
            AttrValue::Map(map) => {
                let inner = self.resolve_map(map, location);
                if let Some(required) = self.spec.required_in_block(location) {
                    if !required.iter().any(|name| inner.contains_key(name)) {
                        debug!(
                            "Dropping {} block at {}: none of {:?} remain",
                            self.instance.label, location, required
                        );
                        return None;
                    }
                }
                ResolvedValue::Map(inner)
            }
        };
        Some(resolved)
    }

    /// Decode the JSON string at `location` and resolve the references
    /// declared inside it. A string that does not parse stays a literal.
    fn resolve_document(&mut self, raw: &str, location: &AttrPath) -> ResolvedValue {
        let document = match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(document) => AttrValue::from(document),
            Err(e) => {
                warn!(
                    "Keeping {}.{} {} as plain text, it is not valid JSON: {}",
                    self.instance.resource_type, self.instance.label, location, e
                );
                return ResolvedValue::literal(raw);
            }
        };
        let resolved = self
            .resolve_encoded(&document, location, &AttrPath::root(), &AttrMap::new())
            .unwrap_or(ResolvedValue::Null);
        ResolvedValue::JsonEncoded(Box::new(resolved))
    }

    /// Walk a decoded document. Nothing is suppressed here except references
    /// the catalog asks to drop, so the document keeps its shape.
    fn resolve_encoded(
        &mut self,
        value: &AttrValue,
        attribute: &AttrPath,
        nested: &AttrPath,
        siblings: &AttrMap,
    ) -> Option<ResolvedValue> {
        let resolved = match value {
            AttrValue::Null => ResolvedValue::Null,
            AttrValue::Bool(b) => ResolvedValue::Bool(*b),
            AttrValue::Float(f) => ResolvedValue::Float(*f),
            AttrValue::Int(_) | AttrValue::String(_) => {
                let spec = self.spec;
                let lookup = match spec.encoded_descriptor_for(attribute, nested) {
                    Some((_, descriptor)) => {
                        self.lookup_with(descriptor, value, &attribute.join(nested), siblings)
                    }
                    None => Lookup::Plain,
                };
                match lookup {
                    Lookup::Resolved(reference) => ResolvedValue::Reference(reference),
                    Lookup::Drop => return None,
                    Lookup::Plain | Lookup::KeepLiteral => scalar(value)?,
                }
            }
            AttrValue::List(items) => {
                let mut kept = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    if let Some(item) = self.resolve_encoded(item, attribute, &nested.child_index(i), siblings) {
                        kept.push(item);
                    }
                }
                ResolvedValue::List(kept)
            }
            AttrValue::Map(map) => {
                let mut entries = BTreeMap::new();
                for (key, item) in map {
                    if let Some(item) = self.resolve_encoded(item, attribute, &nested.child_key(key), map) {
                        entries.insert(key.clone(), item);
                    }
                }
                ResolvedValue::Map(entries)
            }
        };
        Some(resolved)
    }

    fn lookup(&mut self, value: &AttrValue, location: &AttrPath, siblings: &AttrMap) -> Lookup {
        let spec = self.spec;
        match spec.descriptor_for(location) {
            Some((_, descriptor)) => self.lookup_with(descriptor, value, location, siblings),
            None => Lookup::Plain,
        }
    }

    fn lookup_with(
        &mut self,
        descriptor: &RefDescriptor,
        value: &AttrValue,
        location: &AttrPath,
        siblings: &AttrMap,
    ) -> Lookup {
        let Some(raw) = value.as_identifier() else {
            return Lookup::Plain;
        };
        let Some((target_type, target_id)) = descriptor.target_of(&raw, siblings) else {
            return Lookup::Plain;
        };

        if let Some(label) = self.index.label_of(&target_type, &target_id) {
            return Lookup::Resolved(SymbolicRef::new(target_type, label));
        }

        if descriptor.remove_if_unresolved && !self.options.preserve_unresolved_references {
            debug!(
                "Removing unresolved reference {}.{} {} -> {} {}",
                self.instance.resource_type, self.instance.label, location, target_type, target_id
            );
            return Lookup::Drop;
        }

        warn!(
            "Keeping literal {} at {}.{} {}: {} is not part of the export",
            target_id, self.instance.resource_type, self.instance.label, location, target_type
        );
        self.warnings.push(UnresolvedReference {
            resource_type: self.instance.resource_type.clone(),
            label: self.instance.label.clone(),
            attribute: location.clone(),
            target_type,
            target_id,
        });
        Lookup::KeepLiteral
    }
}

fn scalar(value: &AttrValue) -> Option<ResolvedValue> {
    match value {
        AttrValue::Int(i) => Some(ResolvedValue::Int(*i)),
        AttrValue::String(s) => Some(ResolvedValue::literal(s)),
        _ => None,
    }
}

/// Resolve one instance against the export index.
#[must_use]
pub fn resolve(
    instance: &ResourceInstance,
    spec: &ResourceSpec,
    index: &ExportIndex,
    options: ResolveOptions,
) -> ResolvedInstance {
    let mut resolution = Resolution {
        instance,
        spec,
        index,
        options,
        warnings: Vec::new(),
    };
    let attributes = resolution.resolve_map(&instance.attributes, &AttrPath::root());
    ResolvedInstance {
        resource_type: instance.resource_type.clone(),
        id: instance.id.clone(),
        label: instance.label.clone(),
        attributes,
        warnings: resolution.warnings,
    }
}

/// Resolve a whole corpus. The export index is built from `instances`, so
/// every emitted reference points at one of them.
pub fn resolve_all(
    instances: &[ResourceInstance],
    catalog: &ReferenceCatalog,
    options: ResolveOptions,
) -> Result<Vec<ResolvedInstance>, ResolveError> {
    let index = ExportIndex::from_instances(instances);
    let resolved = instances
        .iter()
        .map(|instance| {
            let spec = catalog
                .spec(&instance.resource_type)
                .ok_or_else(|| ResolveError::MissingSpec(instance.resource_type.clone()))?;
            Ok(resolve(instance, spec, &index, options))
        })
        .collect::<Result<Vec<_>, ResolveError>>()?;

    let warnings: usize = resolved.iter().map(|r| r.warnings.len()).sum();
    info!(
        "Resolved {} instance(s), {} unresolved reference(s) kept literal",
        resolved.len(),
        warnings
    );
    Ok(resolved)
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
