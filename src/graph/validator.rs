use super::cycles::{elementary_cycles, normalize_cycle};
use super::TypeGraph;
use crate::catalog::{ReferenceCatalog, ResourceType};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, warn};

/// `a -> b -> a`
#[must_use]
pub fn format_cycle(cycle: &[ResourceType]) -> String {
    cycle
        .iter()
        .map(ResourceType::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn format_cycles(cycles: &[Vec<ResourceType>]) -> String {
    cycles
        .iter()
        .map(|c| format!("[{}]", format_cycle(c)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error("cyclic dependencies not on the allow-list: {}", format_cycles(.0))]
    Fatal(Vec<Vec<ResourceType>>),
}

/// Outcome of a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub tolerated: Vec<Vec<ResourceType>>,
    pub fatal: Vec<Vec<ResourceType>>,
}

impl CycleReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.fatal.is_empty()
    }

    pub fn into_result(self) -> Result<Self, CycleError> {
        if self.fatal.is_empty() {
            Ok(self)
        } else {
            Err(CycleError::Fatal(self.fatal))
        }
    }
}

/// Classifies type-graph cycles against an allow-list of known,
/// irreducible cycles.
#[derive(Debug, Clone, Default)]
pub struct CycleValidator {
    allowed: BTreeSet<Vec<ResourceType>>,
}

impl CycleValidator {
    /// Allow-list entries may start anywhere in the cycle and may omit the
    /// closing type.
    #[must_use]
    pub fn new(allowed: &[Vec<ResourceType>]) -> Self {
        Self {
            allowed: allowed
                .iter()
                .map(|cycle| normalize_cycle(cycle.as_slice()))
                .filter(|cycle| !cycle.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn from_catalog(catalog: &ReferenceCatalog) -> Self {
        Self::new(catalog.allowed_cycles())
    }

    #[must_use]
    pub fn is_allowed(&self, cycle: &[ResourceType]) -> bool {
        self.allowed.contains(&normalize_cycle(cycle))
    }

    /// Find every cycle of `graph` and sort it into tolerated and fatal.
    #[must_use]
    pub fn classify(&self, graph: &TypeGraph) -> CycleReport {
        let mut report = CycleReport::default();
        for cycle in elementary_cycles(&graph.adjacency()) {
            if self.is_allowed(&cycle) {
                debug!("Tolerated cycle: {}", format_cycle(&cycle));
                report.tolerated.push(cycle);
            } else {
                warn!("Cycle not on the allow-list: {}", format_cycle(&cycle));
                report.fatal.push(cycle);
            }
        }
        report
    }

    /// Like [`CycleValidator::classify`], failing on any fatal cycle.
    pub fn validate(&self, graph: &TypeGraph) -> Result<CycleReport, CycleError> {
        self.classify(graph).into_result()
    }

    /// Validate everything a catalog declares.
    pub fn validate_catalog(catalog: &ReferenceCatalog) -> Result<CycleReport, CycleError> {
        Self::from_catalog(catalog).validate(&TypeGraph::from_catalog(catalog))
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
