//! # Livemod - Live module bindings and dependency graphs
//!
//! Keeps module state alive and patchable while a program runs.
//!
//! Livemod provides:
//! - Dependency graph extraction from legacy and modern loader snapshots
//! - Per-module binding recorders that can be redefined without reloading
//! - A module registry with one module per loader instance and identifier
//! - Class metadata (superclass, package origin) that survives import cycles
//! - A loader driving evaluation of structured module sources

pub mod identifier;
pub mod value;
pub mod graph;
pub mod module;
pub mod loader;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use identifier::{LoaderId, ModuleId};
pub use value::{ClassValue, Value};
pub use graph::{DependencyGraph, ExtractOptions, LoaderSnapshot};
pub use module::{ClassMetadata, Module, ModuleRegistry, Package, PackageMetadata, Recorder};
pub use loader::{Loader, MemorySourceProvider, ModuleSource, SourceProvider};

/// Result type alias for Livemod operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Livemod operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid binding name: {0:?}")]
    InvalidBindingName(String),

    #[error("Invalid module identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(ModuleId),

    #[error("Unbound name {name} in {module}")]
    Unbound { module: ModuleId, name: String },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
