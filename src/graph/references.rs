//! Finds reference sites in an attribute tree.
//!
//! Both the graph builder and dependency resolution see references through
//! this walker, so they agree on which values are ids of other instances.
//! Strings declared as JSON documents are decoded and walked as well.

use crate::attribute::{AttrMap, AttrPath, AttrValue};
use crate::catalog::{InstanceId, RefDescriptor, ResourceSpec, ResourceType};

/// A value at a concrete location that a descriptor declares as a reference.
#[derive(Debug, Clone)]
pub struct ReferenceSite<'a> {
    /// Concrete location, e.g. `members.2.user_id`.
    pub location: AttrPath,
    /// Declared path of the matching descriptor, e.g. `members.user_id`.
    pub declared: &'a AttrPath,
    pub descriptor: &'a RefDescriptor,
    pub value: String,
    /// `None` for allowed literals and values a custom resolver rejects.
    pub target: Option<(ResourceType, InstanceId)>,
}

/// Every reference site of one instance, in attribute order. Excluded
/// attributes are skipped.
#[must_use]
pub fn reference_sites<'a>(attributes: &AttrMap, spec: &'a ResourceSpec) -> Vec<ReferenceSite<'a>> {
    let mut sites = Vec::new();
    if !spec.references.is_empty() || !spec.encoded_references.is_empty() {
        walk_map(attributes, &AttrPath::root(), spec, &mut sites);
    }
    sites
}

fn walk_map<'a>(
    map: &AttrMap,
    location: &AttrPath,
    spec: &'a ResourceSpec,
    sites: &mut Vec<ReferenceSite<'a>>,
) {
    for (key, value) in map {
        let child = location.child_key(key);
        if !spec.is_excluded(&child) {
            visit(value, child, map, spec, sites);
        }
    }
}

fn visit<'a>(
    value: &AttrValue,
    location: AttrPath,
    siblings: &AttrMap,
    spec: &'a ResourceSpec,
    sites: &mut Vec<ReferenceSite<'a>>,
) {
    match value {
        AttrValue::Map(map) => walk_map(map, &location, spec, sites),
        AttrValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                let child = location.child_index(i);
                if !spec.is_excluded(&child) {
                    visit(item, child, siblings, spec, sites);
                }
            }
        }
        AttrValue::String(raw) if spec.is_json_document(&location) => {
            if let Ok(document) = serde_json::from_str::<serde_json::Value>(raw) {
                let document = AttrValue::from(document);
                visit_document(&document, &location, &AttrPath::root(), &AttrMap::new(), spec, sites);
            }
        }
        AttrValue::String(_) | AttrValue::Int(_) => {
            let Some((declared, descriptor)) = spec.descriptor_for(&location) else {
                return;
            };
            let Some(raw) = value.as_identifier() else {
                return;
            };
            let target = descriptor.target_of(&raw, siblings);
            sites.push(ReferenceSite {
                location,
                declared,
                descriptor,
                value: raw,
                target,
            });
        }
        AttrValue::Null | AttrValue::Bool(_) | AttrValue::Float(_) => {}
    }
}

/// Reference sites inside a JSON document held by a string attribute.
fn visit_document<'a>(
    value: &AttrValue,
    attribute: &AttrPath,
    nested: &AttrPath,
    siblings: &AttrMap,
    spec: &'a ResourceSpec,
    sites: &mut Vec<ReferenceSite<'a>>,
) {
    match value {
        AttrValue::Map(map) => {
            for (key, item) in map {
                visit_document(item, attribute, &nested.child_key(key), map, spec, sites);
            }
        }
        AttrValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                visit_document(item, attribute, &nested.child_index(i), siblings, spec, sites);
            }
        }
        AttrValue::String(_) | AttrValue::Int(_) => {
            let Some((declared, descriptor)) = spec.encoded_descriptor_for(attribute, nested) else {
                return;
            };
            let Some(raw) = value.as_identifier() else {
                return;
            };
            let target = descriptor.target_of(&raw, siblings);
            sites.push(ReferenceSite {
                location: attribute.join(nested),
                declared,
                descriptor,
                value: raw,
                target,
            });
        }
        AttrValue::Null | AttrValue::Bool(_) | AttrValue::Float(_) => {}
    }
}

/// Targets referenced by an instance, deduplicated and sorted.
#[must_use]
pub fn referenced_targets(attributes: &AttrMap, spec: &ResourceSpec) -> Vec<(ResourceType, InstanceId)> {
    let mut targets: Vec<_> = reference_sites(attributes, spec)
        .into_iter()
        .filter_map(|site| site.target)
        .collect();
    targets.sort();
    targets.dedup();
    targets
}

#[cfg(test)]
#[path = "references_tests.rs"]
mod tests;
