//! Dependency Graph - module → imported modules
//!
//! Extracted on demand from a loader snapshot for tooling and visualization.
//! Edge lists keep declaration order and may contain duplicates when several
//! local imports resolve to the same module.

pub mod extract;
pub mod snapshot;

pub use extract::{ExtractOptions, extract};
pub use snapshot::{
    DependencySlot, LegacyLoad, LegacySnapshot, LoaderSnapshot, ModernSnapshot, ModuleRecord,
};

use crate::identifier::ModuleId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Read-only mapping from module identifier to its ordered dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    edges: BTreeMap<ModuleId, Vec<ModuleId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the graph from a snapshot using the default identifier conventions
    pub fn from_snapshot(snapshot: &LoaderSnapshot) -> Self {
        extract(snapshot, &ExtractOptions::default())
    }

    pub(crate) fn insert(&mut self, module: ModuleId, deps: Vec<ModuleId>) {
        self.edges.insert(module, deps);
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Check if the module is a key of the graph (not just an edge target)
    pub fn contains(&self, module: &ModuleId) -> bool {
        self.edges.contains_key(module)
    }

    /// All modules that are keys of the graph, in identifier order
    pub fn modules(&self) -> impl Iterator<Item = &ModuleId> {
        self.edges.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &[ModuleId])> {
        self.edges.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Direct dependencies in declaration order
    pub fn dependencies_of(&self, module: &ModuleId) -> &[ModuleId] {
        self.edges.get(module).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Modules that directly import `module`
    pub fn dependents_of(&self, module: &ModuleId) -> Vec<&ModuleId> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.contains(module))
            .map(|(id, _)| id)
            .collect()
    }

    /// Everything `module` transitively imports, excluding itself unless it sits on a cycle
    pub fn requirements_of(&self, module: &ModuleId) -> BTreeSet<&ModuleId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&ModuleId> = self.dependencies_of(module).iter().collect();

        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            stack.extend(self.dependencies_of(current));
        }
        seen
    }

    /// Perform impact analysis - modules that need reevaluation when `module` changes
    ///
    /// Uses BFS over the reverse edges up to `depth` levels. Returns each affected
    /// module together with its distance.
    pub fn impact_of(&self, module: &ModuleId, depth: usize) -> Vec<(&ModuleId, usize)> {
        let inverted = self.reverse_index();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([(module, 0usize)]);
        let mut affected = Vec::new();
        visited.insert(module);

        while let Some((current, current_depth)) = queue.pop_front() {
            if current_depth >= depth {
                continue;
            }
            for dependent in inverted.get(current).into_iter().flatten() {
                if visited.insert(*dependent) {
                    affected.push((*dependent, current_depth + 1));
                    queue.push_back((*dependent, current_depth + 1));
                }
            }
        }

        affected
    }

    /// Graph with every edge reversed: module → modules importing it
    pub fn invert(&self) -> DependencyGraph {
        let mut inverted = DependencyGraph::new();
        for (module, deps) in &self.edges {
            inverted.edges.entry(module.clone()).or_default();
            for dep in deps {
                inverted.edges.entry(dep.clone()).or_default().push(module.clone());
            }
        }
        inverted
    }

    fn reverse_index(&self) -> BTreeMap<&ModuleId, Vec<&ModuleId>> {
        let mut index: BTreeMap<&ModuleId, Vec<&ModuleId>> = BTreeMap::new();
        for (module, deps) in &self.edges {
            for dep in deps {
                let importers = index.entry(dep).or_default();
                if !importers.contains(&module) {
                    importers.push(module);
                }
            }
        }
        index
    }

    /// Get statistics about the graph
    pub fn stats(&self, empty_sentinel: &str) -> GraphStats {
        let total_edges = self.edges.values().map(Vec::len).sum();
        let pseudo_edges = self
            .edges
            .values()
            .flatten()
            .filter(|dep| dep.is_pseudo(empty_sentinel))
            .count();
        let targets: BTreeSet<&ModuleId> = self.edges.values().flatten().collect();
        let external_targets = targets.iter().filter(|t| !self.contains(t)).count();

        GraphStats {
            modules: self.edges.len(),
            total_edges,
            pseudo_edges,
            external_targets,
        }
    }

    /// Render the graph in Graphviz DOT format
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph dependencies {\n");
        for (module, deps) in &self.edges {
            out.push_str(&format!("  {:?};\n", module.as_str()));
            for dep in deps {
                out.push_str(&format!("  {:?} -> {:?};\n", module.as_str(), dep.as_str()));
            }
        }
        out.push_str("}\n");
        out
    }
}

impl FromIterator<(ModuleId, Vec<ModuleId>)> for DependencyGraph {
    fn from_iter<T: IntoIterator<Item = (ModuleId, Vec<ModuleId>)>>(iter: T) -> Self {
        Self {
            edges: iter.into_iter().collect(),
        }
    }
}

/// Statistics about a dependency graph
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub modules: usize,
    pub total_edges: usize,
    /// Edges pointing at pseudo-identifiers for unresolved imports
    pub pseudo_edges: usize,
    /// Edge targets that are not keys of the graph
    pub external_targets: usize,
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Dependency Graph Statistics:")?;
        writeln!(f, "  Modules: {}", self.modules)?;
        writeln!(f, "  Edges: {} (unresolved: {})", self.total_edges, self.pseudo_edges)?;
        writeln!(f, "  External targets: {}", self.external_targets)
    }
}
