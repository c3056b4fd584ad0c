use crate::graph::{DependencyGraph, GraphStats};
use tabled::{Table, Tabled, settings::Style};

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: usize,
}

#[derive(Tabled)]
struct ModuleRow {
    #[tabled(rename = "Module")]
    module: String,
    #[tabled(rename = "Imports")]
    imports: usize,
    #[tabled(rename = "Unresolved")]
    unresolved: usize,
    #[tabled(rename = "Imported by")]
    imported_by: usize,
}

pub fn stats_table(stats: &GraphStats) -> String {
    let rows = [
        StatRow { metric: "Modules", value: stats.modules },
        StatRow { metric: "Edges", value: stats.total_edges },
        StatRow { metric: "Unresolved imports", value: stats.pseudo_edges },
        StatRow { metric: "External targets", value: stats.external_targets },
    ];
    Table::new(rows).with(Style::rounded()).to_string()
}

/// One row per graph key. Empty string for an empty graph.
pub fn modules_table(graph: &DependencyGraph, empty_sentinel: &str) -> String {
    if graph.is_empty() {
        return String::new();
    }
    let rows: Vec<ModuleRow> = graph
        .iter()
        .map(|(id, deps)| ModuleRow {
            module: id.to_string(),
            imports: deps.len(),
            unresolved: deps.iter().filter(|d| d.is_pseudo(empty_sentinel)).count(),
            imported_by: graph.dependents_of(id).len(),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}
