use super::CatalogError;
use crate::attribute::{AttrMap, AttrPath};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Identifier of a class of remote object, e.g. `routing_queue`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceType(String);

impl ResourceType {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceType {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ResourceType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Remote identifier of an instance.
pub type InstanceId = String;

/// Resolution logic for attributes whose target type depends on the data.
pub trait CustomResolver: Send + Sync + fmt::Debug {
    /// Concrete target of `value`, or `None` when the value is not a reference.
    fn resolve(&self, value: &str, siblings: &AttrMap) -> Option<(ResourceType, InstanceId)>;

    /// Every type `resolve` may return. The type graph gets an edge to each.
    fn possible_targets(&self) -> Vec<ResourceType>;
}

#[derive(Debug, Clone)]
pub enum RefTarget {
    Fixed(ResourceType),
    Custom(Arc<dyn CustomResolver>),
}

impl RefTarget {
    #[must_use]
    pub fn possible_targets(&self) -> Vec<ResourceType> {
        match self {
            Self::Fixed(target) => vec![target.clone()],
            Self::Custom(resolver) => resolver.possible_targets(),
        }
    }
}

/// Declares that an attribute holds the id of another instance.
#[derive(Debug, Clone)]
pub struct RefDescriptor {
    pub target: RefTarget,
    /// Literals that are legitimate values rather than ids, e.g. `*`.
    pub allowed_literal_values: Vec<String>,
    /// Drop the attribute (or list element) when its target is not exported.
    pub remove_if_unresolved: bool,
}

impl RefDescriptor {
    #[must_use]
    pub fn to(target: impl Into<ResourceType>) -> Self {
        Self {
            target: RefTarget::Fixed(target.into()),
            allowed_literal_values: Vec::new(),
            remove_if_unresolved: true,
        }
    }

    #[must_use]
    pub fn custom(resolver: Arc<dyn CustomResolver>) -> Self {
        Self {
            target: RefTarget::Custom(resolver),
            allowed_literal_values: Vec::new(),
            remove_if_unresolved: true,
        }
    }

    #[must_use]
    pub fn allow_literals<I, S>(mut self, literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_literal_values
            .extend(literals.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn keep_unresolved(mut self) -> Self {
        self.remove_if_unresolved = false;
        self
    }

    #[must_use]
    pub fn is_allowed_literal(&self, value: &str) -> bool {
        self.allowed_literal_values.iter().any(|v| v == value)
    }

    /// Target instance named by `value`, or `None` for literals and values the
    /// custom resolver rejects.
    #[must_use]
    pub fn target_of(&self, value: &str, siblings: &AttrMap) -> Option<(ResourceType, InstanceId)> {
        if self.is_allowed_literal(value) {
            return None;
        }
        match &self.target {
            RefTarget::Fixed(target) => Some((target.clone(), value.to_string())),
            RefTarget::Custom(resolver) => resolver.resolve(value, siblings),
        }
    }
}

/// Export rules of a single resource type.
#[derive(Debug, Clone, Default)]
pub struct ResourceSpec {
    pub references: BTreeMap<AttrPath, RefDescriptor>,
    pub allow_zero_values: Vec<AttrPath>,
    /// Block path mapped to the inner attributes that must survive for a
    /// block element to be kept.
    pub remove_if_missing: BTreeMap<AttrPath, Vec<String>>,
    /// Set per run from configuration.
    pub excluded_attributes: Vec<AttrPath>,
    /// String attributes that hold a JSON document rather than plain text.
    pub json_encode_attributes: Vec<AttrPath>,
    /// References inside JSON documents, keyed by the attribute holding the
    /// document and then by the path within it.
    pub encoded_references: BTreeMap<AttrPath, BTreeMap<AttrPath, RefDescriptor>>,
}

impl ResourceSpec {
    #[must_use]
    pub fn builder() -> ResourceSpecBuilder {
        ResourceSpecBuilder::default()
    }

    /// Descriptor whose declared path addresses `location`.
    #[must_use]
    pub fn descriptor_for(&self, location: &AttrPath) -> Option<(&AttrPath, &RefDescriptor)> {
        self.references
            .iter()
            .find(|(declared, _)| declared.matches(location))
    }

    #[must_use]
    pub fn is_excluded(&self, location: &AttrPath) -> bool {
        self.excluded_attributes
            .iter()
            .any(|excluded| excluded.matches_prefix(location))
    }

    #[must_use]
    pub fn allows_zero(&self, location: &AttrPath) -> bool {
        self.allow_zero_values
            .iter()
            .any(|declared| declared.matches(location))
    }

    /// Inner attributes required for the block element at `location`.
    #[must_use]
    pub fn required_in_block(&self, location: &AttrPath) -> Option<&[String]> {
        self.remove_if_missing
            .iter()
            .find(|(declared, _)| declared.matches(location))
            .map(|(_, required)| required.as_slice())
    }

    pub fn exclude(&mut self, path: AttrPath) {
        if !self.excluded_attributes.contains(&path) {
            self.excluded_attributes.push(path);
        }
    }

    /// Whether the string at `location` is decoded as a JSON document.
    #[must_use]
    pub fn is_json_document(&self, location: &AttrPath) -> bool {
        self.json_encode_attributes
            .iter()
            .any(|declared| declared.matches(location))
            || self
                .encoded_references
                .keys()
                .any(|declared| declared.matches(location))
    }

    /// Descriptor for `nested` inside the document held at `attribute`.
    #[must_use]
    pub fn encoded_descriptor_for(
        &self,
        attribute: &AttrPath,
        nested: &AttrPath,
    ) -> Option<(&AttrPath, &RefDescriptor)> {
        self.encoded_references
            .iter()
            .filter(|(declared, _)| declared.matches(attribute))
            .find_map(|(_, inner)| inner.iter().find(|(declared, _)| declared.matches(nested)))
    }

    /// Every declared reference with its full path. Encoded references are
    /// listed as `attribute.nested`.
    #[must_use]
    pub fn declared_references(&self) -> Vec<(AttrPath, &RefDescriptor)> {
        let plain = self
            .references
            .iter()
            .map(|(declared, descriptor)| (declared.clone(), descriptor));
        let encoded = self.encoded_references.iter().flat_map(|(attribute, inner)| {
            inner
                .iter()
                .map(move |(nested, descriptor)| (attribute.join(nested), descriptor))
        });
        plain.chain(encoded).collect()
    }
}

/// Collects string paths and reports the first malformed one on `build`.
#[derive(Debug, Default)]
pub struct ResourceSpecBuilder {
    spec: ResourceSpec,
    error: Option<CatalogError>,
}

impl ResourceSpecBuilder {
    fn parse(&mut self, raw: &str) -> Option<AttrPath> {
        match AttrPath::parse(raw) {
            Ok(path) => Some(path),
            Err(e) => {
                self.error.get_or_insert(CatalogError::Path(e));
                None
            }
        }
    }

    #[must_use]
    pub fn reference(mut self, path: &str, descriptor: RefDescriptor) -> Self {
        if let Some(path) = self.parse(path) {
            self.spec.references.insert(path, descriptor);
        }
        self
    }

    #[must_use]
    pub fn allow_zero(mut self, path: &str) -> Self {
        if let Some(path) = self.parse(path) {
            self.spec.allow_zero_values.push(path);
        }
        self
    }

    #[must_use]
    pub fn remove_if_missing(mut self, block: &str, required: &[&str]) -> Self {
        if let Some(path) = self.parse(block) {
            self.spec
                .remove_if_missing
                .insert(path, required.iter().map(ToString::to_string).collect());
        }
        self
    }

    /// Decode the string attribute at `path` as a JSON document.
    #[must_use]
    pub fn json_encode(mut self, path: &str) -> Self {
        if let Some(path) = self.parse(path) {
            self.spec.json_encode_attributes.push(path);
        }
        self
    }

    /// Reference at `nested` inside the JSON document held at `attribute`.
    #[must_use]
    pub fn encoded_reference(mut self, attribute: &str, nested: &str, descriptor: RefDescriptor) -> Self {
        if let (Some(attribute), Some(nested)) = (self.parse(attribute), self.parse(nested)) {
            self.spec
                .encoded_references
                .entry(attribute)
                .or_default()
                .insert(nested, descriptor);
        }
        self
    }

    #[must_use]
    pub fn exclude(mut self, path: &str) -> Self {
        if let Some(path) = self.parse(path) {
            self.spec.exclude(path);
        }
        self
    }

    pub fn build(self) -> Result<ResourceSpec, CatalogError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.spec),
        }
    }
}

/// Export rules for every registered type plus the tolerated cycles.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    specs: BTreeMap<ResourceType, ResourceSpec>,
    allowed_cycles: Vec<Vec<ResourceType>>,
}

impl ReferenceCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource_type: ResourceType, spec: ResourceSpec) {
        self.specs.insert(resource_type, spec);
    }

    #[must_use]
    pub fn with(mut self, resource_type: impl Into<ResourceType>, spec: ResourceSpec) -> Self {
        self.insert(resource_type.into(), spec);
        self
    }

    /// Tolerate a cycle. It may be written from any starting point, with or
    /// without repeating the first type at the end.
    pub fn allow_cycle<I, T>(&mut self, cycle: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<ResourceType>,
    {
        self.allowed_cycles
            .push(cycle.into_iter().map(Into::into).collect());
    }

    #[must_use]
    pub fn spec(&self, resource_type: &ResourceType) -> Option<&ResourceSpec> {
        self.specs.get(resource_type)
    }

    pub fn spec_mut(&mut self, resource_type: &ResourceType) -> Option<&mut ResourceSpec> {
        self.specs.get_mut(resource_type)
    }

    pub fn types(&self) -> impl Iterator<Item = &ResourceType> {
        self.specs.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceType, &ResourceSpec)> {
        self.specs.iter()
    }

    #[must_use]
    pub fn allowed_cycles(&self) -> &[Vec<ResourceType>] {
        &self.allowed_cycles
    }

    /// Catalog restricted to `types`, keeping the allow-list.
    #[must_use]
    pub fn restricted_to(&self, types: &[ResourceType]) -> Self {
        Self {
            specs: self
                .specs
                .iter()
                .filter(|(t, _)| types.contains(t))
                .map(|(t, spec)| (t.clone(), spec.clone()))
                .collect(),
            allowed_cycles: self.allowed_cycles.clone(),
        }
    }
}
