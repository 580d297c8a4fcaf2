//! Version-4 state snapshot mapping `type.label` to remote ids, so a later
//! apply adopts existing objects instead of recreating them.

use super::{by_type, SerializeError};
use crate::config::ProviderConfig;
use crate::resolver::ResolvedInstance;
use serde::Serialize;
use std::collections::BTreeMap;

pub const STATE_VERSION: u32 = 4;

#[derive(Debug, Serialize)]
struct State<'a> {
    version: u32,
    serial: u64,
    lineage: &'a str,
    generated_at: &'a str,
    outputs: BTreeMap<String, String>,
    resources: Vec<StateResource<'a>>,
}

#[derive(Debug, Serialize)]
struct StateResource<'a> {
    mode: &'static str,
    #[serde(rename = "type")]
    resource_type: &'a str,
    name: &'a str,
    provider: String,
    instances: Vec<StateInstance<'a>>,
}

#[derive(Debug, Serialize)]
struct StateInstance<'a> {
    schema_version: u32,
    attributes: StateAttributes<'a>,
}

#[derive(Debug, Serialize)]
struct StateAttributes<'a> {
    id: &'a str,
}

/// Address of the provider as state files record it.
#[must_use]
pub fn provider_address(provider: &ProviderConfig) -> String {
    format!("provider[\"registry.terraform.io/{}\"]", provider.source)
}

pub fn render_state(
    instances: &[ResolvedInstance],
    provider: &ProviderConfig,
    lineage: &str,
    generated_at: &str,
) -> Result<String, SerializeError> {
    let address = provider_address(provider);
    let resources = by_type(instances)
        .into_iter()
        .flat_map(|(_, members)| members)
        .map(|instance| StateResource {
            mode: "managed",
            resource_type: instance.resource_type.as_str(),
            name: &instance.label,
            provider: address.clone(),
            instances: vec![StateInstance {
                schema_version: 0,
                attributes: StateAttributes { id: &instance.id },
            }],
        })
        .collect();

    let state = State {
        version: STATE_VERSION,
        serial: 1,
        lineage,
        generated_at,
        outputs: BTreeMap::new(),
        resources,
    };
    let mut rendered = serde_json::to_string_pretty(&state)?;
    rendered.push('\n');
    Ok(rendered)
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
