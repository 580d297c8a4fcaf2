//! HCL rendering of the resolved data.
//!
//! Maps become nested blocks and lists of maps become repeated blocks, as
//! long as every key is a valid identifier. Anything else is an attribute,
//! aligned on `=` within a block. JSON documents go through `jsonencode`.

use super::{by_type, SerializeError};
use crate::catalog::ResourceType;
use crate::config::ProviderConfig;
use crate::resolver::{ResolvedInstance, ResolvedValue};
use std::collections::BTreeMap;

const INDENT: &str = "  ";

/// Whether `name` can appear unquoted as an attribute or block name.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn quote(raw: &str) -> String {
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('"');
    for c in raw.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn inline(value: &ResolvedValue) -> String {
    match value {
        ResolvedValue::Bool(b) => b.to_string(),
        ResolvedValue::Int(i) => i.to_string(),
        ResolvedValue::Float(f) if f.is_finite() => f.to_string(),
        ResolvedValue::Null | ResolvedValue::Float(_) => "null".to_string(),
        ResolvedValue::String(s) => quote(s),
        ResolvedValue::Reference(reference) => reference.traversal(),
        ResolvedValue::List(items) => {
            let items: Vec<String> = items.iter().map(inline).collect();
            format!("[{}]", items.join(", "))
        }
        ResolvedValue::Map(map) if map.is_empty() => "{}".to_string(),
        ResolvedValue::Map(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(key, value)| {
                    let key = if is_identifier(key) { key.clone() } else { quote(key) };
                    format!("{key} = {}", inline(value))
                })
                .collect();
            format!("{{ {} }}", entries.join(", "))
        }
        ResolvedValue::JsonEncoded(document) => format!("jsonencode({})", inline(document)),
    }
}

fn is_block_body(value: &ResolvedValue) -> bool {
    value
        .as_map()
        .is_some_and(|map| map.keys().all(|key| is_identifier(key)))
}

fn is_block(value: &ResolvedValue) -> bool {
    match value {
        ResolvedValue::Map(_) => is_block_body(value),
        ResolvedValue::List(items) => !items.is_empty() && items.iter().all(is_block_body),
        _ => false,
    }
}

struct Writer<'a> {
    resource_type: &'a ResourceType,
    label: &'a str,
    lines: Vec<String>,
}

impl Writer<'_> {
    fn line(&mut self, depth: usize, text: &str) {
        self.lines.push(format!("{}{text}", INDENT.repeat(depth)));
    }

    fn check_name(&self, name: &str) -> Result<(), SerializeError> {
        if is_identifier(name) {
            Ok(())
        } else {
            Err(SerializeError::InvalidAttributeName {
                resource_type: self.resource_type.clone(),
                label: self.label.to_string(),
                name: name.to_string(),
            })
        }
    }

    fn body(
        &mut self,
        attributes: &BTreeMap<String, ResolvedValue>,
        depth: usize,
    ) -> Result<(), SerializeError> {
        let (blocks, scalars): (Vec<_>, Vec<_>) =
            attributes.iter().partition(|(_, value)| is_block(value));

        let width = scalars.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        for (name, value) in scalars {
            self.check_name(name)?;
            self.line(depth, &format!("{name:<width$} = {}", inline(value)));
        }

        for (name, value) in blocks {
            self.check_name(name)?;
            match value {
                ResolvedValue::Map(inner) => self.block(name, inner, depth)?,
                ResolvedValue::List(items) => {
                    for inner in items.iter().filter_map(ResolvedValue::as_map) {
                        self.block(name, inner, depth)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn block(
        &mut self,
        header: &str,
        attributes: &BTreeMap<String, ResolvedValue>,
        depth: usize,
    ) -> Result<(), SerializeError> {
        self.line(depth, &format!("{header} {{"));
        self.body(attributes, depth + 1)?;
        self.line(depth, "}");
        Ok(())
    }
}

fn render_resource(instance: &ResolvedInstance) -> Result<String, SerializeError> {
    let mut writer = Writer {
        resource_type: &instance.resource_type,
        label: &instance.label,
        lines: Vec::new(),
    };
    let header = format!(
        "resource {} {}",
        quote(instance.resource_type.as_str()),
        quote(&instance.label)
    );
    writer.block(&header, &instance.attributes, 0)?;
    Ok(writer.lines.join("\n"))
}

/// `terraform { required_providers { ... } }`
#[must_use]
pub fn render_provider(provider: &ProviderConfig) -> String {
    [
        "terraform {".to_string(),
        format!("{INDENT}required_providers {{"),
        format!("{INDENT}{INDENT}{} = {{", provider.name),
        format!("{INDENT}{INDENT}{INDENT}source  = {}", quote(&provider.source)),
        format!("{INDENT}{INDENT}{INDENT}version = {}", quote(&provider.version)),
        format!("{INDENT}{INDENT}}}"),
        format!("{INDENT}}}"),
        "}".to_string(),
    ]
    .join("\n")
        + "\n"
}

/// Every resource block, types in order, blank line between blocks.
pub fn render_resources(instances: &[ResolvedInstance]) -> Result<String, SerializeError> {
    let mut blocks = Vec::new();
    for (_, members) in by_type(instances) {
        for instance in members {
            blocks.push(render_resource(instance)?);
        }
    }
    if blocks.is_empty() {
        return Ok(String::new());
    }
    Ok(blocks.join("\n\n") + "\n")
}

/// Provider block followed by every resource block.
pub fn render_document(
    instances: &[ResolvedInstance],
    provider: &ProviderConfig,
) -> Result<String, SerializeError> {
    let resources = render_resources(instances)?;
    if resources.is_empty() {
        return Ok(render_provider(provider));
    }
    Ok(format!("{}\n{resources}", render_provider(provider)))
}

#[cfg(test)]
#[path = "hcl_tests.rs"]
mod tests;
