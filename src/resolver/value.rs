use crate::catalog::ResourceType;
use std::collections::BTreeMap;
use std::fmt;

/// Symbolic reference to another exported instance, by type and label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolicRef {
    pub resource_type: ResourceType,
    pub label: String,
}

impl SymbolicRef {
    #[must_use]
    pub fn new(resource_type: ResourceType, label: impl Into<String>) -> Self {
        Self {
            resource_type,
            label: label.into(),
        }
    }

    /// Bare traversal, `routing_queue.support.id`.
    #[must_use]
    pub fn traversal(&self) -> String {
        format!("{}.{}.id", self.resource_type, self.label)
    }

    /// Interpolated form used inside JSON strings, `${routing_queue.support.id}`.
    #[must_use]
    pub fn interpolation(&self) -> String {
        format!("${{{}}}", self.traversal())
    }
}

impl fmt::Display for SymbolicRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.label)
    }
}

/// Attribute value after reference resolution.
///
/// References are their own variant so no renderer can mistake one for a
/// string that merely looks like an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    /// Only found inside a decoded JSON document.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Literal text, template sequences already escaped.
    String(String),
    Reference(SymbolicRef),
    List(Vec<ResolvedValue>),
    Map(BTreeMap<String, ResolvedValue>),
    /// String attribute decoded as a JSON document. Rendered back to a
    /// string in JSON output and as `jsonencode(...)` in HCL.
    JsonEncoded(Box<ResolvedValue>),
}

impl ResolvedValue {
    /// Literal string with `${` and `%{` escaped.
    #[must_use]
    pub fn literal(raw: &str) -> Self {
        Self::String(escape_template(raw))
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(_) | Self::Reference(_) | Self::JsonEncoded(_) => false,
            Self::Int(i) => *i == 0,
            Self::Float(f) => *f == 0.0,
            Self::String(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Map(map) => map.is_empty(),
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, ResolvedValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Every symbolic reference in this value, depth first.
    #[must_use]
    pub fn references(&self) -> Vec<&SymbolicRef> {
        let mut found = Vec::new();
        self.collect_references(&mut found);
        found
    }

    fn collect_references<'a>(&'a self, found: &mut Vec<&'a SymbolicRef>) {
        match self {
            Self::Reference(reference) => found.push(reference),
            Self::List(items) => {
                for item in items {
                    item.collect_references(found);
                }
            }
            Self::Map(map) => {
                for value in map.values() {
                    value.collect_references(found);
                }
            }
            Self::JsonEncoded(document) => document.collect_references(found),
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::String(_) => {}
        }
    }
}

/// Escape template sequences so a literal is never evaluated.
#[must_use]
pub fn escape_template(raw: &str) -> String {
    raw.replace("${", "$${").replace("%{", "%%{")
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
