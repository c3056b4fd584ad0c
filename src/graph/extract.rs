//! Dependency extraction - one strategy per snapshot shape
//!
//! Pure and stateless: the snapshot is only read, the same snapshot always
//! yields the same graph.

use super::DependencyGraph;
use super::snapshot::{LegacySnapshot, LoaderSnapshot, ModernSnapshot};
use crate::identifier::{EMPTY_SENTINEL, ModuleId, PLUGIN_SEPARATOR};
use std::collections::BTreeSet;

/// Identifier conventions of the host loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Resolved name the loader uses for intentionally unresolved imports
    pub empty_sentinel: String,
    /// Marks loader-plugin resources, which are left out of the graph
    pub plugin_separator: char,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            empty_sentinel: EMPTY_SENTINEL.to_string(),
            plugin_separator: PLUGIN_SEPARATOR,
        }
    }
}

/// Turn a loader snapshot into a module → dependencies graph
pub fn extract(snapshot: &LoaderSnapshot, options: &ExtractOptions) -> DependencyGraph {
    match snapshot {
        LoaderSnapshot::Legacy(legacy) => extract_legacy(legacy, options),
        LoaderSnapshot::Modern(modern) => extract_modern(modern),
    }
}

fn extract_legacy(snapshot: &LegacySnapshot, options: &ExtractOptions) -> DependencyGraph {
    let candidates: BTreeSet<&ModuleId> = snapshot
        .loaded
        .iter()
        .chain(snapshot.loads.keys())
        .filter(|id| !id.is_plugin_resource(options.plugin_separator))
        .collect();

    let mut graph = DependencyGraph::new();
    for id in candidates {
        let deps = snapshot
            .loads
            .get(id)
            .map(|load| {
                load.dep_map
                    .iter()
                    .map(|(local_name, resolved)| {
                        if resolved.as_str() == options.empty_sentinel {
                            ModuleId::pseudo(&options.empty_sentinel, local_name)
                        } else {
                            resolved.clone()
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        graph.insert(id.clone(), deps);
    }
    graph
}

fn extract_modern(snapshot: &ModernSnapshot) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for (id, record) in &snapshot.records {
        let deps = record
            .dependencies
            .iter()
            .filter_map(|slot| slot.module().cloned())
            .collect();
        graph.insert(id.clone(), deps);
    }
    graph
}
