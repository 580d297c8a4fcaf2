//! Dependency graphs over resource types (coarse) and instances (fine).
//!
//! Edges are always derived from the catalog and the corpus; building twice
//! from the same inputs yields the same graph.

mod cycles;
mod references;
mod validator;

pub use cycles::{elementary_cycles, normalize_cycle};
pub use references::{reference_sites, referenced_targets, ReferenceSite};
pub use validator::{format_cycle, CycleError, CycleReport, CycleValidator};

use crate::attribute::AttrPath;
use crate::catalog::{InstanceId, ReferenceCatalog, ResourceType};
use crate::collector::ResourceInstance;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Type,
    Instance,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeEdge {
    pub from: ResourceType,
    pub to: ResourceType,
    /// Declared attribute path that produced the edge.
    pub via: AttrPath,
}

/// Graph whose nodes are resource types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeGraph {
    pub nodes: BTreeSet<ResourceType>,
    pub edges: BTreeSet<TypeEdge>,
    /// `from == to` edges, kept out of the cycle search.
    pub self_edges: BTreeSet<TypeEdge>,
}

impl TypeGraph {
    /// Type graph of everything the catalog declares. Custom resolvers add an
    /// edge to each type they may return; excluded attributes add none.
    #[must_use]
    pub fn from_catalog(catalog: &ReferenceCatalog) -> Self {
        let mut graph = Self::default();
        for (resource_type, spec) in catalog.iter() {
            graph.nodes.insert(resource_type.clone());
            for (declared, descriptor) in spec.declared_references() {
                if spec.is_excluded(&declared) {
                    continue;
                }
                for target in descriptor.target.possible_targets() {
                    graph.add_edge(resource_type.clone(), target, declared.clone());
                }
            }
        }
        debug!(
            "Type graph: {} node(s), {} edge(s), {} self edge(s)",
            graph.nodes.len(),
            graph.edges.len(),
            graph.self_edges.len()
        );
        graph
    }

    fn add_edge(&mut self, from: ResourceType, to: ResourceType, via: AttrPath) {
        self.nodes.insert(from.clone());
        self.nodes.insert(to.clone());
        let edge = TypeEdge { from, to, via };
        if edge.from == edge.to {
            self.self_edges.insert(edge);
        } else {
            self.edges.insert(edge);
        }
    }

    /// Successor sets, without self edges.
    #[must_use]
    pub fn adjacency(&self) -> BTreeMap<ResourceType, BTreeSet<ResourceType>> {
        let mut adjacency: BTreeMap<ResourceType, BTreeSet<ResourceType>> = self
            .nodes
            .iter()
            .map(|n| (n.clone(), BTreeSet::new()))
            .collect();
        for edge in &self.edges {
            adjacency
                .entry(edge.from.clone())
                .or_default()
                .insert(edge.to.clone());
        }
        adjacency
    }
}

/// `(type, id)` node of the fine graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceKey {
    pub resource_type: ResourceType,
    pub id: InstanceId,
}

impl InstanceKey {
    #[must_use]
    pub fn new(resource_type: ResourceType, id: impl Into<InstanceId>) -> Self {
        Self {
            resource_type,
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceEdge {
    pub from: InstanceKey,
    pub to: InstanceKey,
    /// Concrete attribute location holding the reference.
    pub via: AttrPath,
}

/// Graph whose nodes are collected instances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceGraph {
    pub nodes: BTreeSet<InstanceKey>,
    pub edges: BTreeSet<InstanceEdge>,
    /// Edges between instances of the same type.
    pub self_edges: BTreeSet<InstanceEdge>,
    /// Edges whose target is not in the corpus.
    pub dangling: BTreeSet<InstanceEdge>,
}

impl InstanceGraph {
    /// Type-level projection of the instance edges that landed in the corpus.
    #[must_use]
    pub fn to_type_graph(&self, catalog: &ReferenceCatalog) -> TypeGraph {
        let mut graph = TypeGraph::default();
        for node in &self.nodes {
            graph.nodes.insert(node.resource_type.clone());
        }
        for edge in self.edges.iter().chain(&self.self_edges) {
            let via = catalog
                .spec(&edge.from.resource_type)
                .and_then(|spec| spec.descriptor_for(&edge.via))
                .map_or_else(|| edge.via.clone(), |(declared, _)| declared.clone());
            graph.add_edge(
                edge.from.resource_type.clone(),
                edge.to.resource_type.clone(),
                via,
            );
        }
        graph
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Graph {
    Types(TypeGraph),
    Instances(InstanceGraph),
}

fn build_instance_graph(instances: &[ResourceInstance], catalog: &ReferenceCatalog) -> InstanceGraph {
    let mut graph = InstanceGraph::default();
    for instance in instances {
        graph.nodes.insert(instance.key());
    }

    for instance in instances {
        let Some(spec) = catalog.spec(&instance.resource_type) else {
            continue;
        };
        for site in reference_sites(&instance.attributes, spec) {
            let Some((target_type, target_id)) = site.target else {
                continue;
            };
            let edge = InstanceEdge {
                from: instance.key(),
                to: InstanceKey::new(target_type, target_id),
                via: site.location,
            };
            if !graph.nodes.contains(&edge.to) {
                graph.dangling.insert(edge);
            } else if edge.from.resource_type == edge.to.resource_type {
                graph.self_edges.insert(edge);
            } else {
                graph.edges.insert(edge);
            }
        }
    }
    debug!(
        "Instance graph: {} node(s), {} edge(s), {} dangling",
        graph.nodes.len(),
        graph.edges.len(),
        graph.dangling.len()
    );
    graph
}

/// Build the dependency graph of a corpus.
///
/// `Granularity::Type` projects the observed references onto types; use
/// [`TypeGraph::from_catalog`] for the graph of everything declared.
#[must_use]
pub fn build(
    instances: &[ResourceInstance],
    catalog: &ReferenceCatalog,
    granularity: Granularity,
) -> Graph {
    let fine = build_instance_graph(instances, catalog);
    match granularity {
        Granularity::Instance => Graph::Instances(fine),
        Granularity::Type => Graph::Types(fine.to_type_graph(catalog)),
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
