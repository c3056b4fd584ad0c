//! Module Registry - exactly one Module per (loader instance, identifier)
//!
//! The registry is the only owner of modules. They are released solely by
//! [`ModuleRegistry::remove`], never reclaimed automatically, because other
//! modules keep long-lived references into their recorders.

use super::classes::ClassMetadataTable;
use super::live_module::Module;
use super::package::{Package, owning_package};
use crate::identifier::{LoaderId, ModuleId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct LoaderModules {
    modules: HashMap<ModuleId, Arc<Module>>,
    packages: Vec<Package>,
}

#[derive(Debug, Default)]
pub struct ModuleRegistry {
    loaders: Mutex<HashMap<LoaderId, LoaderModules>>,
    classes: ClassMetadataTable,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the module for `id`, creating it on first lookup.
    ///
    /// Idempotent: every call for the same key returns the same instance, also
    /// while that module is still initializing.
    pub fn lookup_or_create(&self, loader: &LoaderId, id: &ModuleId) -> Arc<Module> {
        let mut loaders = self.loaders.lock();
        let entry = loaders.entry(loader.clone()).or_default();

        if let Some(module) = entry.modules.get(id) {
            return Arc::clone(module);
        }

        let package = owning_package(&entry.packages, id).and_then(|p| p.metadata_for(id));
        let module = Arc::new(Module::new(loader.clone(), id.clone(), package));
        entry.modules.insert(id.clone(), Arc::clone(&module));
        tracing::debug!("Created module {} in loader {}", id, loader);
        module
    }

    /// Get an already registered module
    pub fn get(&self, loader: &LoaderId, id: &ModuleId) -> Option<Arc<Module>> {
        self.loaders
            .lock()
            .get(loader)
            .and_then(|entry| entry.modules.get(id))
            .cloned()
    }

    /// All modules of a loader instance, in identifier order
    pub fn modules(&self, loader: &LoaderId) -> Vec<Arc<Module>> {
        let loaders = self.loaders.lock();
        let mut modules: Vec<Arc<Module>> = loaders
            .get(loader)
            .map(|entry| entry.modules.values().cloned().collect())
            .unwrap_or_default();
        modules.sort_by(|a, b| a.id().cmp(b.id()));
        modules
    }

    /// Loader instances that currently have an entry
    pub fn loaders(&self) -> Vec<LoaderId> {
        let mut loaders: Vec<LoaderId> = self.loaders.lock().keys().cloned().collect();
        loaders.sort();
        loaders
    }

    /// Register a package for a loader instance.
    ///
    /// Modules already registered under the package address get their metadata
    /// patched (innermost package wins); modules created later receive it at
    /// creation. Returns the number of patched modules.
    pub fn register_package(&self, loader: &LoaderId, package: Package) -> usize {
        let mut loaders = self.loaders.lock();
        let entry = loaders.entry(loader.clone()).or_default();
        entry.packages.retain(|p| p.address != package.address);
        entry.packages.push(package);

        let mut patched = 0;
        for module in entry.modules.values() {
            let owner = owning_package(&entry.packages, module.id());
            let metadata = owner.and_then(|p| p.metadata_for(module.id()));
            if metadata.is_some() && metadata != module.package() {
                module.set_package(metadata);
                patched += 1;
            }
        }
        tracing::debug!("Registered package in loader {}, patched {} modules", loader, patched);
        patched
    }

    /// Detach and release every module of a loader instance, including the
    /// metadata of classes they produced. No-op for unknown loaders.
    ///
    /// Must not run while a module of this loader is initializing; see
    /// [`Loader::teardown`](crate::loader::Loader::teardown).
    pub fn remove(&self, loader: &LoaderId) -> usize {
        let removed = self.loaders.lock().remove(loader);
        let Some(entry) = removed else {
            return 0;
        };
        let classes = self.classes.forget_loader(loader);
        tracing::debug!(
            "Removed loader {}: {} modules, {} classes",
            loader,
            entry.modules.len(),
            classes
        );
        entry.modules.len()
    }

    /// Class metadata shared by all loader instances of this registry
    pub fn classes(&self) -> &ClassMetadataTable {
        &self.classes
    }
}
