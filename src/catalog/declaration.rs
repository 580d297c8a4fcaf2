//! TOML declaration of a reference catalog.
//!
//! ```toml
//! allowed_cycles = [["routing_queue", "routing_email_route", "routing_queue"]]
//!
//! [resolvers.member_group]
//! skill_group = "routing_skill_group"
//!
//! [types.routing_queue]
//! allow_zero_values = ["bullseye_rings.expansion_timeout_seconds"]
//! remove_if_missing = { members = ["user_id"] }
//!
//! [types.routing_queue.references]
//! division_id = { target = "auth_division" }
//! whisper_prompt_id = { target = "architect_user_prompt", remove_if_unresolved = false }
//! "members.user_id" = { target = "user" }
//! member_group_id = { resolver = "member_group" }
//!
//! [types.flow_milestone]
//! json_encode_attributes = ["settings"]
//!
//! [types.flow_milestone.encoded_references.settings]
//! "queues.id" = { target = "routing_queue" }
//! ```

use super::resolvers::MemberGroupResolver;
use super::types::{RefDescriptor, ReferenceCatalog, ResourceSpec, ResourceType};
use super::CatalogError;
use crate::attribute::AttrPath;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Resolver name accepted in `resolver = "..."`.
pub const MEMBER_GROUP_RESOLVER: &str = "member_group";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogDecl {
    #[serde(default)]
    allowed_cycles: Vec<Vec<String>>,
    #[serde(default)]
    resolvers: ResolversDecl,
    #[serde(default)]
    types: BTreeMap<String, TypeDecl>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResolversDecl {
    #[serde(default)]
    member_group: Option<MemberGroupDecl>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MemberGroupDecl {
    group: Option<String>,
    team: Option<String>,
    skill_group: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeDecl {
    #[serde(default)]
    references: BTreeMap<String, ReferenceDecl>,
    #[serde(default)]
    allow_zero_values: Vec<String>,
    #[serde(default)]
    remove_if_missing: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    json_encode_attributes: Vec<String>,
    #[serde(default)]
    encoded_references: BTreeMap<String, BTreeMap<String, ReferenceDecl>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReferenceDecl {
    target: Option<String>,
    resolver: Option<String>,
    #[serde(default)]
    allowed_literal_values: Vec<String>,
    #[serde(default = "default_remove_if_unresolved")]
    remove_if_unresolved: bool,
}

fn default_remove_if_unresolved() -> bool {
    true
}

fn member_group_resolver(decl: Option<MemberGroupDecl>) -> MemberGroupResolver {
    let mut resolver = MemberGroupResolver::default();
    if let Some(decl) = decl {
        if let Some(group) = decl.group {
            resolver.group = ResourceType::new(group);
        }
        if let Some(team) = decl.team {
            resolver.team = ResourceType::new(team);
        }
        if let Some(skill_group) = decl.skill_group {
            resolver.skill_group = ResourceType::new(skill_group);
        }
    }
    resolver
}

fn build_descriptor(
    resource_type: &str,
    path: &str,
    decl: ReferenceDecl,
    member_group: &Arc<MemberGroupResolver>,
) -> Result<RefDescriptor, CatalogError> {
    let invalid = |reason: &str| CatalogError::InvalidReference {
        resource_type: resource_type.to_string(),
        path: path.to_string(),
        reason: reason.to_string(),
    };
    let mut descriptor = match (decl.target, decl.resolver) {
        (Some(target), None) => RefDescriptor::to(target),
        (None, Some(name)) if name == MEMBER_GROUP_RESOLVER => {
            RefDescriptor::custom(member_group.clone())
        }
        (None, Some(name)) => return Err(CatalogError::UnknownResolver(name)),
        (Some(_), Some(_)) => return Err(invalid("both 'target' and 'resolver' are set")),
        (None, None) => return Err(invalid("one of 'target' or 'resolver' is required")),
    };
    descriptor.allowed_literal_values = decl.allowed_literal_values;
    descriptor.remove_if_unresolved = decl.remove_if_unresolved;
    Ok(descriptor)
}

/// Parse a catalog declaration.
pub fn parse_catalog(content: &str) -> Result<ReferenceCatalog, CatalogError> {
    let decl: CatalogDecl = toml::from_str(content)?;
    let member_group = Arc::new(member_group_resolver(decl.resolvers.member_group));

    let mut catalog = ReferenceCatalog::new();
    for (name, type_decl) in decl.types {
        let mut spec = ResourceSpec::default();
        for (path, reference) in type_decl.references {
            let descriptor = build_descriptor(&name, &path, reference, &member_group)?;
            spec.references.insert(AttrPath::parse(&path)?, descriptor);
        }
        for path in &type_decl.allow_zero_values {
            spec.allow_zero_values.push(AttrPath::parse(path)?);
        }
        for (block, required) in type_decl.remove_if_missing {
            spec.remove_if_missing.insert(AttrPath::parse(&block)?, required);
        }
        for path in &type_decl.json_encode_attributes {
            spec.json_encode_attributes.push(AttrPath::parse(path)?);
        }
        for (attribute, nested) in type_decl.encoded_references {
            let mut descriptors = BTreeMap::new();
            for (path, reference) in nested {
                let full = format!("{attribute}.{path}");
                let descriptor = build_descriptor(&name, &full, reference, &member_group)?;
                descriptors.insert(AttrPath::parse(&path)?, descriptor);
            }
            spec.encoded_references.insert(AttrPath::parse(&attribute)?, descriptors);
        }
        debug!(
            "Declared {} reference(s) for {}",
            spec.references.len(),
            name
        );
        catalog.insert(ResourceType::new(name), spec);
    }
    for cycle in decl.allowed_cycles {
        catalog.allow_cycle(cycle);
    }
    Ok(catalog)
}

/// Read and parse a catalog declaration file.
pub async fn load_catalog(path: &Path) -> Result<ReferenceCatalog, CatalogError> {
    let content = fs::read_to_string(path).await?;
    parse_catalog(&content)
}

#[cfg(test)]
#[path = "declaration_tests.rs"]
mod tests;
