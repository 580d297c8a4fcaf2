use crate::catalog::ResourceType;
use crate::graph::format_cycle;
use crate::resolver::UnresolvedReference;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// What a successful export run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    /// Files written, in write order.
    pub files: Vec<PathBuf>,
    pub instance_count: usize,
    pub exported_types: BTreeSet<ResourceType>,
    /// Types present only because something referenced them.
    pub dependency_types: BTreeSet<ResourceType>,
    /// References kept as literal ids.
    pub warnings: Vec<UnresolvedReference>,
    pub permission_failures: BTreeMap<ResourceType, String>,
    /// Allow-listed cycles among the exported types.
    pub tolerated_cycles: Vec<Vec<ResourceType>>,
    /// Unlisted cycles let through by `ignore_cyclic_dependencies`.
    pub ignored_cycles: Vec<Vec<ResourceType>>,
    /// References to instances outside the corpus.
    pub dangling_references: usize,
}

impl ExportReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.permission_failures.is_empty() && self.ignored_cycles.is_empty()
    }
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Exported {} instance(s) of {} type(s) into {} file(s)",
            self.instance_count,
            self.exported_types.len(),
            self.files.len()
        )?;
        if !self.dependency_types.is_empty() {
            let names: Vec<_> = self.dependency_types.iter().map(ResourceType::as_str).collect();
            writeln!(f, "  pulled in as dependencies: {}", names.join(", "))?;
        }
        for (resource_type, message) in &self.permission_failures {
            writeln!(f, "  skipped {resource_type}: {message}")?;
        }
        for warning in &self.warnings {
            writeln!(
                f,
                "  kept literal {} at {}.{} {} ({} not exported)",
                warning.target_id,
                warning.resource_type,
                warning.label,
                warning.attribute,
                warning.target_type
            )?;
        }
        for cycle in &self.ignored_cycles {
            writeln!(f, "  ignored cycle: {}", format_cycle(cycle))?;
        }
        Ok(())
    }
}
