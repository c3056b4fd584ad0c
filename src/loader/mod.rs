//! Loader - drives module evaluation into recorders
//!
//! Evaluation order per module:
//! 1. Lookup-or-create the module in the registry
//! 2. Claim it for initialization (already ready or initializing = use as is)
//! 3. Fetch its source (the only suspension point)
//! 4. Evaluate declarations in order, loading dependencies on imports
//!
//! Imported bindings are copied into the importer's recorder. When the exporter
//! is still initializing (import cycle) the import stays linked and reads fall
//! through to the exporter's live binding until the top-level import settles.
//!
//! Global-format modules write to the loader's global namespace; their export
//! is read from there.

pub mod source;

pub use source::{
    DEFAULT_EXPORT, Declaration, Expr, ImportName, MemorySourceProvider, ModuleFormat, ModuleSource,
    SourceProvider,
};

use crate::graph::{DependencySlot, LoaderSnapshot, ModernSnapshot, ModuleRecord};
use crate::identifier::{EMPTY_SENTINEL, LoaderId, ModuleId};
use crate::module::{Module, ModuleRegistry, ModuleState, Recorder, SuperclassRef};
use crate::value::{ClassValue, Value};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where an imported local name comes from
#[derive(Debug, Clone)]
struct ImportLink {
    module: ModuleId,
    name: String,
    /// The value was copied into the importer once; never copied again
    settled: bool,
}

/// Loader-side bookkeeping of one evaluated module
#[derive(Debug, Default)]
struct LoadRecord {
    dependencies: Vec<DependencySlot>,
    /// Exported name and the local binding behind it
    exports: Vec<(String, String)>,
    /// Global binding exported by a global-format module
    global_export: Option<String>,
    imports: HashMap<String, ImportLink>,
}

/// Where an exported name is read from
enum ExportBinding {
    Local(String),
    Global(String),
}

/// One loader instance evaluating modules into a shared registry
pub struct Loader {
    id: LoaderId,
    registry: Arc<ModuleRegistry>,
    provider: Arc<dyn SourceProvider>,
    records: Mutex<BTreeMap<ModuleId, LoadRecord>>,
    global: Arc<Recorder>,
    empty_sentinel: String,
}

impl Loader {
    pub fn new(
        id: impl Into<LoaderId>,
        registry: Arc<ModuleRegistry>,
        provider: Arc<dyn SourceProvider>,
    ) -> Self {
        Self {
            id: id.into(),
            registry,
            provider,
            records: Mutex::new(BTreeMap::new()),
            global: Arc::new(Recorder::new()),
            empty_sentinel: EMPTY_SENTINEL.to_string(),
        }
    }

    /// Use another reserved name for intentionally unresolved imports
    pub fn with_empty_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.empty_sentinel = sentinel.into();
        self
    }

    pub fn id(&self) -> &LoaderId {
        &self.id
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// The loader-global namespace shared by all modules of this loader
    pub fn global(&self) -> &Arc<Recorder> {
        &self.global
    }

    /// The registered module for `id`, created if needed (never evaluates it)
    pub fn module(&self, id: &ModuleId) -> Arc<Module> {
        self.registry.lookup_or_create(&self.id, id)
    }

    /// Load a module and everything it imports
    pub async fn import(&self, id: &ModuleId) -> Result<Arc<Module>> {
        let module = self.load(id).await?;
        self.settle_imports()?;
        tracing::info!("Imported {} in loader {}", id, self.id);
        Ok(module)
    }

    /// Evaluate a ready module again against its existing recorder.
    ///
    /// Declarations in the current source overwrite their bindings; bindings the
    /// source no longer declares stay until explicitly undefined.
    pub async fn reevaluate(&self, id: &ModuleId) -> Result<Arc<Module>> {
        let module = self.module(id);
        if !module.mark_stale() {
            tracing::debug!("{} is {}, not reevaluating", id, module.state().as_str());
        }
        self.import(id).await
    }

    /// Exported bindings of a module with their current values
    pub fn exports(&self, id: &ModuleId) -> Vec<(String, Value)> {
        let Some(module) = self.registry.get(&self.id, id) else {
            return Vec::new();
        };
        let records = self.records.lock();
        let Some(record) = records.get(id) else {
            return Vec::new();
        };

        if let Some(name) = &record.global_export {
            return self
                .global
                .get(name)
                .map(|value| {
                    vec![(DEFAULT_EXPORT.to_string(), value.clone()), (name.clone(), value)]
                })
                .unwrap_or_default();
        }
        record
            .exports
            .iter()
            .filter_map(|(exported, local)| {
                module.recorder().get(local).map(|v| (exported.clone(), v))
            })
            .collect()
    }

    /// This loader's bookkeeping in the modern snapshot shape
    pub fn snapshot(&self) -> LoaderSnapshot {
        let records = self
            .records
            .lock()
            .iter()
            .map(|(id, record)| {
                (
                    id.clone(),
                    ModuleRecord {
                        dependencies: record.dependencies.clone(),
                    },
                )
            })
            .collect();
        LoaderSnapshot::Modern(ModernSnapshot { records })
    }

    /// Wait for every in-flight initialization, then release all modules of
    /// this loader instance. Returns the number of released modules.
    pub async fn teardown(&self) -> usize {
        for module in self.registry.modules(&self.id) {
            module.quiesce().await;
        }
        self.records.lock().clear();
        self.registry.remove(&self.id)
    }

    fn load<'a>(&'a self, id: &'a ModuleId) -> BoxFuture<'a, Result<Arc<Module>>> {
        Box::pin(async move {
            if id.is_empty_module(&self.empty_sentinel) {
                return Err(Error::ModuleNotFound(id.clone()));
            }
            let module = self.module(id);
            let Some(init) = module.begin_initialization().await else {
                if module.state() == ModuleState::Initializing {
                    tracing::debug!("{} is still initializing, using partial module", id);
                }
                return Ok(module);
            };

            let source = self.provider.fetch(id).await?;
            self.evaluate(init.module(), &source).await?;
            init.finish();
            Ok(module)
        })
    }

    async fn evaluate(&self, module: &Arc<Module>, source: &ModuleSource) -> Result<()> {
        let id = module.id();
        let recorder = module.recorder();
        {
            let mut records = self.records.lock();
            let record = records.entry(id.clone()).or_default();
            record.dependencies.clear();
            record.exports.clear();
            record.imports.clear();
            record.global_export = source.format.global_export().map(str::to_string);
        }

        for declaration in &source.declarations {
            match declaration {
                Declaration::Import { specifier, names, type_only } => {
                    let target = if *type_only {
                        None
                    } else {
                        self.provider.resolve(specifier, id)
                    };
                    let target =
                        target.filter(|target| !target.is_empty_module(&self.empty_sentinel));
                    let Some(target) = target else {
                        tracing::debug!("Unresolved import {:?} in {}", specifier, id);
                        self.with_record(id, |r| r.dependencies.push(DependencySlot::Hole));
                        continue;
                    };

                    self.with_record(id, |r| {
                        r.dependencies.push(DependencySlot::resolved(target.clone()));
                        for n in names {
                            r.imports.insert(
                                n.local.clone(),
                                ImportLink {
                                    module: target.clone(),
                                    name: n.imported.clone(),
                                    settled: false,
                                },
                            );
                        }
                    });

                    let exporter = self.load(&target).await?;
                    for n in names {
                        if let Some(value) = self.export_value(&exporter, &n.imported) {
                            recorder.define(&n.local, value)?;
                            self.mark_settled(id, &n.local);
                        }
                    }
                }
                Declaration::Var { name, init, exported } => {
                    let value = self.eval_expr(module, init)?;
                    recorder.define(name, value)?;
                    if *exported {
                        self.with_record(id, |r| r.exports.push((name.clone(), name.clone())));
                    }
                }
                Declaration::Class { name, extends, exported } => {
                    let class = ClassValue::new(name.as_str());
                    recorder.define(name, class.clone().into())?;
                    let superclass = match extends {
                        Some(parent) => self.superclass_ref(module, parent),
                        None => SuperclassRef::Base,
                    };
                    self.registry.classes().annotate(&class, module, superclass);
                    if *exported {
                        self.with_record(id, |r| r.exports.push((name.clone(), name.clone())));
                    }
                }
                Declaration::Export { local, exported } => {
                    self.with_record(id, |r| r.exports.push((exported.clone(), local.clone())));
                }
                Declaration::Global { name, init } => {
                    let value = self.eval_expr(module, init)?;
                    self.global.define(name, value)?;
                }
            }
        }
        Ok(())
    }

    fn with_record(&self, id: &ModuleId, f: impl FnOnce(&mut LoadRecord)) {
        f(self.records.lock().entry(id.clone()).or_default());
    }

    fn mark_settled(&self, id: &ModuleId, local: &str) {
        self.with_record(id, |r| {
            if let Some(link) = r.imports.get_mut(local) {
                link.settled = true;
            }
        });
    }

    fn import_link(&self, id: &ModuleId, name: &str) -> Option<ImportLink> {
        self.records
            .lock()
            .get(id)
            .and_then(|r| r.imports.get(name))
            .cloned()
    }

    /// Resolve an exported name of `exporter` to the binding behind it. Names
    /// missing from the export table are looked up as recorder bindings.
    fn export_binding(&self, exporter: &ModuleId, exported: &str) -> ExportBinding {
        let records = self.records.lock();
        let Some(record) = records.get(exporter) else {
            return ExportBinding::Local(exported.to_string());
        };
        if let Some(global) = &record.global_export {
            if exported == global || exported == DEFAULT_EXPORT {
                return ExportBinding::Global(global.clone());
            }
        }
        let local = record
            .exports
            .iter()
            .find(|(name, _)| name == exported)
            .map(|(_, local)| local.as_str())
            .unwrap_or(exported);
        ExportBinding::Local(local.to_string())
    }

    fn export_value(&self, exporter: &Module, exported: &str) -> Option<Value> {
        match self.export_binding(exporter.id(), exported) {
            ExportBinding::Local(local) => exporter.recorder().get(&local),
            ExportBinding::Global(name) => self.global.get(&name),
        }
    }

    /// Read a binding, falling through to the exporter for imported names and
    /// then to the loader global
    fn read_binding(&self, module: &Module, name: &str) -> Result<Value> {
        if let Some(value) = module.recorder().get(name) {
            return Ok(value);
        }
        self.import_link(module.id(), name)
            .and_then(|link| {
                self.registry
                    .get(&self.id, &link.module)
                    .and_then(|exporter| self.export_value(&exporter, &link.name))
            })
            .or_else(|| self.global.get(name))
            .ok_or_else(|| Error::Unbound {
                module: module.id().clone(),
                name: name.to_string(),
            })
    }

    fn eval_expr(&self, module: &Module, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(lit) => Ok(Value::from(lit)),
            Expr::Ref(name) => self.read_binding(module, name),
            Expr::Add(lhs, rhs) => {
                let lhs = self.eval_expr(module, lhs)?;
                let rhs = self.eval_expr(module, rhs)?;
                match (&lhs, &rhs) {
                    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                    (Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{}{}", a, b))),
                    _ => Err(Error::TypeMismatch(format!(
                        "cannot add {} and {}",
                        lhs.kind(),
                        rhs.kind()
                    ))),
                }
            }
            Expr::Div(lhs, rhs) => {
                let lhs = self.eval_expr(module, lhs)?;
                let rhs = self.eval_expr(module, rhs)?;
                match (lhs.as_number(), rhs.as_number()) {
                    (Some(a), Some(b)) => Ok(Value::Number(a / b)),
                    _ => Err(Error::TypeMismatch(format!(
                        "cannot divide {} by {}",
                        lhs.kind(),
                        rhs.kind()
                    ))),
                }
            }
        }
    }

    /// Deferred superclass lookup against the recorder that owns `name`
    fn superclass_ref(&self, module: &Module, name: &str) -> SuperclassRef {
        let Some(link) = self.import_link(module.id(), name) else {
            return SuperclassRef::binding(module, name);
        };
        let Some(exporter) = self.registry.get(&self.id, &link.module) else {
            return SuperclassRef::binding(module, name);
        };
        match self.export_binding(&link.module, &link.name) {
            ExportBinding::Local(local) => SuperclassRef::binding(&exporter, local),
            ExportBinding::Global(global) => SuperclassRef::Binding {
                recorder: Arc::downgrade(&self.global),
                module: link.module,
                name: global,
            },
        }
    }

    /// Copy imported bindings that were missing while their exporter was still
    /// initializing. Each link is copied at most once, so live redefinitions and
    /// explicit undefines are never overwritten.
    fn settle_imports(&self) -> Result<()> {
        let links: Vec<(ModuleId, String, ImportLink)> = self
            .records
            .lock()
            .iter()
            .flat_map(|(id, record)| {
                record
                    .imports
                    .iter()
                    .filter(|(_, link)| !link.settled)
                    .map(move |(local, link)| (id.clone(), local.clone(), link.clone()))
            })
            .collect();

        for (id, local, link) in links {
            let (Some(importer), Some(exporter)) = (
                self.registry.get(&self.id, &id),
                self.registry.get(&self.id, &link.module),
            ) else {
                continue;
            };
            if let Some(value) = self.export_value(&exporter, &link.name) {
                if !importer.recorder().contains(&local) {
                    importer.recorder().define(&local, value)?;
                }
                self.mark_settled(&id, &local);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
