//! Structured JSON output.

use super::{by_type, SerializeError};
use crate::config::ProviderConfig;
use crate::resolver::{ResolvedInstance, ResolvedValue};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// JSON form of a resolved value. References become interpolations and
/// decoded documents are encoded back into a single string.
#[must_use]
pub fn to_json(value: &ResolvedValue) -> Value {
    match value {
        ResolvedValue::Null => Value::Null,
        ResolvedValue::Bool(b) => Value::Bool(*b),
        ResolvedValue::Int(i) => Value::from(*i),
        ResolvedValue::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        ResolvedValue::String(s) => Value::String(s.clone()),
        ResolvedValue::Reference(reference) => Value::String(reference.interpolation()),
        ResolvedValue::List(items) => Value::Array(items.iter().map(to_json).collect()),
        ResolvedValue::Map(map) => attributes_json(map),
        ResolvedValue::JsonEncoded(document) => Value::String(to_json(document).to_string()),
    }
}

fn attributes_json(attributes: &BTreeMap<String, ResolvedValue>) -> Value {
    Value::Object(
        attributes
            .iter()
            .map(|(key, value)| (key.clone(), to_json(value)))
            .collect(),
    )
}

/// `{type: {label: attributes}}`
fn resources_json(instances: &[ResolvedInstance]) -> Value {
    let mut resources = Map::new();
    for (resource_type, members) in by_type(instances) {
        let labels: Map<String, Value> = members
            .iter()
            .map(|instance| (instance.label.clone(), attributes_json(&instance.attributes)))
            .collect();
        resources.insert(resource_type.to_string(), Value::Object(labels));
    }
    Value::Object(resources)
}

fn terraform_json(provider: &ProviderConfig) -> Value {
    let mut providers = Map::new();
    providers.insert(
        provider.name.clone(),
        json!({ "source": provider.source, "version": provider.version }),
    );
    json!({ "required_providers": providers })
}

fn pretty(value: &Value) -> Result<String, SerializeError> {
    let mut rendered = serde_json::to_string_pretty(value)?;
    rendered.push('\n');
    Ok(rendered)
}

/// Resources and provider metadata in one document.
pub fn render_document(
    instances: &[ResolvedInstance],
    provider: &ProviderConfig,
) -> Result<String, SerializeError> {
    pretty(&json!({
        "resource": resources_json(instances),
        "terraform": terraform_json(provider),
    }))
}

/// Resources only, for split output.
pub fn render_resources(instances: &[ResolvedInstance]) -> Result<String, SerializeError> {
    pretty(&json!({ "resource": resources_json(instances) }))
}

pub fn render_provider(provider: &ProviderConfig) -> Result<String, SerializeError> {
    pretty(&json!({ "terraform": terraform_json(provider) }))
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
