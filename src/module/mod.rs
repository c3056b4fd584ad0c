//! Live modules - registry, recorders and class metadata
//!
//! The registry hands out one [`Module`] per (loader instance, identifier).
//! Each module owns a [`Recorder`] holding its live bindings. Classes produced
//! while evaluating a module are described in the registry's
//! [`ClassMetadataTable`].

pub mod classes;
pub mod live_module;
pub mod package;
pub mod recorder;
pub mod registry;

pub use classes::{ClassMetadata, ClassMetadataTable, Superclass, SuperclassRef};
pub use live_module::{Module, ModuleState};
pub use package::{Package, PackageMetadata};
pub use recorder::Recorder;
pub use registry::ModuleRegistry;
