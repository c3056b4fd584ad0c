//! Livemod CLI - inspect module dependency graphs captured from a running loader

use clap::{Parser, Subcommand};
use livemod::ModuleId;
use livemod::config::{self, LivemodConfig};
use livemod::graph::{DependencyGraph, ExtractOptions, LoaderSnapshot, extract};
use livemod::ui::{self, EdgeKind, Icons};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "livemod")]
#[command(version)]
#[command(about = "Live module registry - dependency graphs from loader snapshots")]
#[command(long_about = r#"
Livemod reads a snapshot of a module loader's bookkeeping (legacy `loads`
tables or modern `moduleRecords`) and turns it into a dependency graph.

Example usage:
  livemod graph --snapshot loader.json
  livemod graph --snapshot loader.json --format dot | dot -Tsvg > deps.svg
  livemod dependents --snapshot loader.json --module http://host/src/file2.js
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the dependency graph of a snapshot
    Graph {
        /// Loader snapshot (JSON)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Output format (text, table, json, dot)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Find modules that (transitively) import a module
    Dependents {
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Module identifier
        #[arg(short, long)]
        module: String,

        /// Maximum depth for transitive dependents
        #[arg(long, default_value = "1")]
        depth: usize,
    },

    /// List everything a module transitively imports
    Requirements {
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Module identifier
        #[arg(short, long)]
        module: String,
    },

    /// Show statistics about a snapshot's graph
    Stats {
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },

    /// Write a default livemod.toml
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = config::load_config(Some(&config_path))?.unwrap_or_default();
    let options = config.extract_options();

    match cli.command {
        Commands::Graph { snapshot, format } => {
            let (graph, _) = load_graph(snapshot.as_deref(), &config, &options)?;
            let format = format
                .or_else(|| config.format.clone())
                .unwrap_or_else(|| "text".to_string());

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&graph)?),
                "dot" => print!("{}", graph.to_dot()),
                "text" => print_graph(&graph, &options),
                "table" => println!("{}", ui::modules_table(&graph, &options.empty_sentinel)),
                other => {
                    anyhow::bail!("Unknown format: {} (expected text, table, json or dot)", other)
                }
            }
        }

        Commands::Dependents { snapshot, module, depth } => {
            let (graph, _) = load_graph(snapshot.as_deref(), &config, &options)?;
            let target: ModuleId = module.parse()?;

            ui::header(&format!("Dependents of {} (depth: {})", target, depth));
            let impact = graph.impact_of(&target, depth);
            if impact.is_empty() {
                println!("∅ No dependents found.");
            }
            for (id, distance) in impact {
                ui::dependent(id, distance);
            }
        }

        Commands::Requirements { snapshot, module } => {
            let (graph, _) = load_graph(snapshot.as_deref(), &config, &options)?;
            let target: ModuleId = module.parse()?;
            if !graph.contains(&target) {
                ui::warn(&format!("{} is not a module of this snapshot", target));
            }

            ui::header(&format!("Requirements of {}", target));
            for id in graph.requirements_of(&target) {
                ui::dependency(id, edge_kind(id, &options));
            }
        }

        Commands::Stats { snapshot } => {
            let (graph, shape) = load_graph(snapshot.as_deref(), &config, &options)?;
            let stats = graph.stats(&options.empty_sentinel);

            println!("{} Livemod Statistics ({} snapshot)", Icons::STATS, shape);
            println!("{}", ui::stats_table(&stats));
        }

        Commands::Init { force } => {
            config::write_config(&config_path, &LivemodConfig::with_defaults(), force)?;
            ui::success(&format!("Wrote {}", config_path.display()));
        }
    }

    Ok(())
}

fn load_graph(
    snapshot: Option<&Path>,
    config: &LivemodConfig,
    options: &ExtractOptions,
) -> anyhow::Result<(DependencyGraph, &'static str)> {
    let path = snapshot
        .map(Path::to_path_buf)
        .or_else(|| config.snapshot.as_ref().map(PathBuf::from));
    let Some(path) = path else {
        anyhow::bail!("no snapshot given (use --snapshot or set `snapshot` in livemod.toml)");
    };

    tracing::debug!("Reading snapshot {}", path.display());
    let contents = std::fs::read_to_string(&path)?;
    let snapshot = LoaderSnapshot::from_json_str(&contents)?;
    Ok((extract(&snapshot, options), snapshot.shape()))
}

fn print_graph(graph: &DependencyGraph, options: &ExtractOptions) {
    if graph.is_empty() {
        println!("∅ No modules in snapshot.");
        return;
    }
    for (id, deps) in graph.iter() {
        ui::module_line(id, deps.len());
        for dep in deps {
            ui::dependency(dep, edge_kind(dep, options));
        }
    }
}

fn edge_kind(target: &ModuleId, options: &ExtractOptions) -> EdgeKind {
    EdgeKind::of(target, &options.empty_sentinel, options.plugin_separator)
}
