use super::{CollectError, ResourceInstance};
use crate::catalog::ResourceType;
use crate::registry::DiscoveredInstance;
use crate::utils::short_hash;
use std::collections::BTreeSet;
use tracing::debug;

/// Counter suffixes tried before giving up on a colliding label.
const MAX_COUNTER_SUFFIX: usize = 1000;

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Turn a raw instance name into a local name safe for the emitted
/// configuration.
///
/// Replaced characters get the raw label's short hash appended so that
/// `"a b"` and `"a/b"` stay distinct. Blank labels fall back to the id.
#[must_use]
pub fn sanitize_label(raw: &str, id: &str) -> String {
    if raw.trim().is_empty() {
        return format!("unnamed_{}", short_hash(id));
    }
    let replaced: String = raw
        .chars()
        .map(|c| if is_label_char(c) { c } else { '_' })
        .collect();
    let mut label = if replaced == raw {
        replaced
    } else {
        format!("{replaced}_{}", short_hash(raw))
    };
    if label.starts_with(|c: char| c.is_ascii_digit()) {
        label.insert(0, '_');
    }
    label
}

/// Assign unique labels to one type's instances.
///
/// Instances are visited in id order; the first holder of a label keeps it,
/// later ones get their id hash and then a counter appended.
pub fn assign_labels(
    resource_type: &ResourceType,
    mut discovered: Vec<DiscoveredInstance>,
) -> Result<Vec<ResourceInstance>, CollectError> {
    discovered.sort_by(|a, b| a.id.cmp(&b.id));
    let mut used = BTreeSet::new();
    let mut instances = Vec::with_capacity(discovered.len());

    for instance in discovered {
        let base = sanitize_label(&instance.label, &instance.id);
        let label = if used.contains(&base) {
            let hashed = format!("{base}_{}", short_hash(&instance.id));
            let unique = std::iter::once(hashed.clone())
                .chain((2..=MAX_COUNTER_SUFFIX).map(|n| format!("{hashed}_{n}")))
                .find(|candidate| !used.contains(candidate))
                .ok_or_else(|| CollectError::LabelCollision {
                    resource_type: resource_type.clone(),
                    label: base.clone(),
                })?;
            debug!(
                "Label '{}' already used by another {}; using '{}' for {}",
                base, resource_type, unique, instance.id
            );
            unique
        } else {
            base
        };
        used.insert(label.clone());
        instances.push(ResourceInstance {
            resource_type: resource_type.clone(),
            id: instance.id,
            label,
            raw_label: instance.label,
            attributes: instance.attributes,
        });
    }
    Ok(instances)
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod tests;
