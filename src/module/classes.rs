//! Class metadata - superclass and package origin of class values
//!
//! Metadata lives in a side table keyed by class identity; class values are
//! never modified. Superclasses are stored as deferred lookups and resolved on
//! every read, so a class declared while its superclass's module is still
//! initializing (import cycle) resolves once that module has finished.

use super::live_module::Module;
use super::package::PackageMetadata;
use super::recorder::Recorder;
use crate::identifier::{LoaderId, ModuleId};
use crate::value::{ClassId, ClassValue, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Declared superclass of a class, as captured at annotation time
#[derive(Debug, Clone)]
pub enum SuperclassRef {
    /// No `extends` clause: the implicit root class
    Base,
    /// `extends <name>`, looked up in the recorder that owns `name` at read time
    Binding {
        recorder: Weak<Recorder>,
        module: ModuleId,
        name: String,
    },
    /// Superclass value known up front
    Value(Value),
}

impl SuperclassRef {
    pub fn binding(module: &Module, name: impl Into<String>) -> Self {
        SuperclassRef::Binding {
            recorder: Arc::downgrade(module.recorder()),
            module: module.id().clone(),
            name: name.into(),
        }
    }

    fn resolve(&self) -> Superclass {
        match self {
            SuperclassRef::Base => Superclass::Base,
            SuperclassRef::Value(value) => Superclass::Resolved(value.clone()),
            SuperclassRef::Binding { recorder, module, name } => {
                match recorder.upgrade().and_then(|r| r.get(name)) {
                    Some(value) => Superclass::Resolved(value),
                    None => Superclass::Pending {
                        module: module.clone(),
                        name: name.clone(),
                    },
                }
            }
        }
    }
}

/// Superclass as seen by a reader
#[derive(Debug, Clone, PartialEq)]
pub enum Superclass {
    Base,
    Resolved(Value),
    /// The binding does not exist yet; query again once initialization settles
    Pending { module: ModuleId, name: String },
}

impl Superclass {
    pub fn as_class(&self) -> Option<&ClassValue> {
        match self {
            Superclass::Resolved(value) => value.as_class(),
            _ => None,
        }
    }
}

/// Metadata of one class value
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetadata {
    pub superclass: Superclass,
    /// Module whose evaluation produced the class
    pub module: ModuleId,
    /// `None` while the owning module's package is not known yet
    pub package: Option<PackageMetadata>,
}

#[derive(Debug)]
struct ClassEntry {
    superclass: SuperclassRef,
    owner: Weak<Module>,
    module: ModuleId,
    loader: LoaderId,
}

/// Identity-keyed side table of class metadata
#[derive(Debug, Default)]
pub struct ClassMetadataTable {
    entries: RwLock<HashMap<ClassId, ClassEntry>>,
}

impl ClassMetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach metadata to a class. Re-annotating the same class overwrites it.
    pub fn annotate(&self, class: &ClassValue, owner: &Arc<Module>, superclass: SuperclassRef) {
        let entry = ClassEntry {
            superclass,
            owner: Arc::downgrade(owner),
            module: owner.id().clone(),
            loader: owner.loader().clone(),
        };
        self.entries.write().insert(class.id(), entry);
    }

    /// Read the metadata, resolving the superclass and package at call time
    pub fn lookup_metadata(&self, class: &ClassValue) -> Option<ClassMetadata> {
        let entries = self.entries.read();
        let entry = entries.get(&class.id())?;
        Some(ClassMetadata {
            superclass: entry.superclass.resolve(),
            module: entry.module.clone(),
            package: entry.owner.upgrade().and_then(|m| m.package()),
        })
    }

    /// Drop the metadata of every class produced under `loader`
    pub fn forget_loader(&self, loader: &LoaderId) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| &entry.loader != loader);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
