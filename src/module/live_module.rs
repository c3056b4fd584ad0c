//! Module - one registered module of a loader instance
//!
//! A module exclusively owns its recorder for its whole lifetime; reevaluation
//! reuses the same recorder. Initialization and live patches are serialized
//! through the module's initialization lock.

use super::package::PackageMetadata;
use super::recorder::Recorder;
use crate::Result;
use crate::identifier::{LoaderId, ModuleId};
use crate::value::Value;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Initialization progress of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Registered, not evaluated (or marked for reevaluation)
    Fresh,
    /// Evaluation in progress; the recorder may be partially populated
    Initializing,
    Ready,
}

impl ModuleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleState::Fresh => "fresh",
            ModuleState::Initializing => "initializing",
            ModuleState::Ready => "ready",
        }
    }
}

#[derive(Debug)]
pub struct Module {
    id: ModuleId,
    loader: LoaderId,
    recorder: Arc<Recorder>,
    package: RwLock<Option<PackageMetadata>>,
    state: Mutex<ModuleState>,
    init_lock: Arc<AsyncMutex<()>>,
}

impl Module {
    pub(crate) fn new(loader: LoaderId, id: ModuleId, package: Option<PackageMetadata>) -> Self {
        Self {
            id,
            loader,
            recorder: Arc::new(Recorder::new()),
            package: RwLock::new(package),
            state: Mutex::new(ModuleState::Fresh),
            init_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    pub fn loader(&self) -> &LoaderId {
        &self.loader
    }

    /// The module's live namespace
    pub fn recorder(&self) -> &Arc<Recorder> {
        &self.recorder
    }

    pub fn state(&self) -> ModuleState {
        *self.state.lock()
    }

    pub fn package(&self) -> Option<PackageMetadata> {
        self.package.read().clone()
    }

    /// Attach or patch the package metadata
    pub fn set_package(&self, package: Option<PackageMetadata>) {
        *self.package.write() = package;
    }

    /// Redefine a binding from outside the evaluation, waiting for any in-flight
    /// initialization of this module to finish first.
    pub async fn define(&self, name: &str, value: Value) -> Result<Option<Value>> {
        let _guard = self.init_lock.lock().await;
        self.recorder.define(name, value)
    }

    /// Remove a binding from outside the evaluation, serialized like [`Module::define`].
    pub async fn undefine(&self, name: &str) -> Result<Option<Value>> {
        let _guard = self.init_lock.lock().await;
        self.recorder.undefine(name)
    }

    /// Wait until no initialization of this module is in flight
    pub async fn quiesce(&self) {
        let _guard = self.init_lock.lock().await;
    }

    /// Claim the module for evaluation.
    ///
    /// Returns `None` when the module is already initialized or currently
    /// initializing; the caller then uses the module as it is. The state flips to
    /// `Initializing` before the lock is awaited, so a cyclic lookup made while
    /// waiting sees the module as in progress.
    pub(crate) async fn begin_initialization(self: &Arc<Self>) -> Option<Initialization> {
        {
            let mut state = self.state.lock();
            if *state != ModuleState::Fresh {
                return None;
            }
            *state = ModuleState::Initializing;
        }

        let lock = Arc::clone(&self.init_lock).lock_owned().await;
        Some(Initialization {
            module: Arc::clone(self),
            _lock: lock,
            finished: false,
        })
    }

    /// Mark a ready module for reevaluation. Its bindings are kept.
    pub(crate) fn mark_stale(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ModuleState::Ready {
            *state = ModuleState::Fresh;
            return true;
        }
        false
    }
}

/// Exclusive right to write a module's initial bindings.
///
/// Dropping it without [`Initialization::finish`] puts the module back to
/// `Fresh`; bindings written so far stay in the recorder.
pub(crate) struct Initialization {
    module: Arc<Module>,
    _lock: OwnedMutexGuard<()>,
    finished: bool,
}

impl Initialization {
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    pub fn finish(mut self) {
        self.finished = true;
        *self.module.state.lock() = ModuleState::Ready;
    }
}

impl Drop for Initialization {
    fn drop(&mut self) {
        if !self.finished {
            *self.module.state.lock() = ModuleState::Fresh;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn module(id: &str) -> Arc<Module> {
        Arc::new(Module::new(LoaderId::new("test"), ModuleId::new(id), None))
    }

    #[tokio::test]
    async fn test_initialization_claimed_once() {
        let m = module("a.js");
        let init = m.begin_initialization().await.unwrap();
        assert_eq!(m.state(), ModuleState::Initializing);
        assert!(m.begin_initialization().await.is_none());

        init.finish();
        assert_eq!(m.state(), ModuleState::Ready);
        assert!(m.begin_initialization().await.is_none());
    }

    #[tokio::test]
    async fn test_abandoned_initialization_keeps_partial_bindings() {
        let m = module("a.js");
        let init = m.begin_initialization().await.unwrap();
        init.module().recorder().define("partial", Value::Number(1.0)).unwrap();
        drop(init);

        assert_eq!(m.state(), ModuleState::Fresh);
        assert_eq!(m.recorder().get("partial"), Some(Value::Number(1.0)));
    }

    #[tokio::test]
    async fn test_patch_waits_for_initialization() {
        let m = module("a.js");
        let init = m.begin_initialization().await.unwrap();

        let patcher = {
            let m = Arc::clone(&m);
            tokio::spawn(async move { m.define("y", Value::Number(2.0)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        init.module().recorder().define("y", Value::Number(1.0)).unwrap();
        assert_eq!(m.recorder().get("y"), Some(Value::Number(1.0)));
        init.finish();

        let previous = patcher.await.unwrap().unwrap();
        assert_eq!(previous, Some(Value::Number(1.0)));
        assert_eq!(m.recorder().get("y"), Some(Value::Number(2.0)));
    }

    #[tokio::test]
    async fn test_mark_stale() {
        let m = module("a.js");
        assert!(!m.mark_stale());
        m.begin_initialization().await.unwrap().finish();
        assert!(m.mark_stale());
        assert_eq!(m.state(), ModuleState::Fresh);
    }
}
