//! Binding Recorder - the live namespace of one module
//!
//! Evaluated top-level declarations write into the recorder instead of a closed
//! scope, so bindings stay observable and redefinable after the module loaded.

use crate::value::Value;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Mutable name → value mapping shared by every holder of the module.
///
/// Reads and writes go through the same map: a `define` is visible to all
/// holders immediately. Reevaluating a module against the same recorder only
/// overwrites the names it declares; everything else stays until undefined.
#[derive(Debug, Default)]
pub struct Recorder {
    bindings: RwLock<HashMap<String, Value>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a binding, `None` if it is not defined
    pub fn get(&self, name: &str) -> Option<Value> {
        self.bindings.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.read().contains_key(name)
    }

    /// Insert or overwrite a binding. Returns the previous value.
    pub fn define(&self, name: &str, value: Value) -> Result<Option<Value>> {
        validate_name(name)?;
        Ok(self.bindings.write().insert(name.to_string(), value))
    }

    /// Remove a binding so that `get` reports it absent. No-op if it was never defined.
    pub fn undefine(&self, name: &str) -> Result<Option<Value>> {
        validate_name(name)?;
        Ok(self.bindings.write().remove(name))
    }

    /// Names of all bindings, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    /// Copy of the current bindings
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.bindings.read().clone()
    }
}

/// A binding name must be non-empty and free of whitespace and control characters.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidBindingName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_define_then_get() {
        let recorder = Recorder::new();
        assert_eq!(recorder.define("y", Value::Number(1.0)).unwrap(), None);
        assert_eq!(recorder.get("y"), Some(Value::Number(1.0)));

        let previous = recorder.define("y", Value::Number(2.0)).unwrap();
        assert_eq!(previous, Some(Value::Number(1.0)));
        assert_eq!(recorder.get("y"), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_undefine_is_not_undefined() {
        let recorder = Recorder::new();
        recorder.define("a", Value::Undefined).unwrap();
        assert_eq!(recorder.get("a"), Some(Value::Undefined));

        recorder.undefine("a").unwrap();
        assert_eq!(recorder.get("a"), None);
        assert!(!recorder.contains("a"));

        // Never defined
        assert_eq!(recorder.undefine("missing").unwrap(), None);
    }

    #[test]
    fn test_define_touches_only_named_binding() {
        let recorder = Recorder::new();
        recorder.define("x", Value::Number(3.0)).unwrap();
        recorder.define("y", Value::Number(1.0)).unwrap();
        recorder.undefine("y").unwrap();

        assert_eq!(recorder.get("x"), Some(Value::Number(3.0)));
        assert_eq!(recorder.names(), vec!["x".to_string()]);
    }

    #[test]
    fn test_shared_between_holders() {
        let recorder = Arc::new(Recorder::new());
        let other = Arc::clone(&recorder);
        recorder.define("newVar", Value::Number(3.0)).unwrap();
        assert_eq!(other.get("newVar"), Some(Value::Number(3.0)));
    }

    #[test]
    fn test_invalid_names_are_reported() {
        let recorder = Recorder::new();
        assert!(matches!(recorder.define("", Value::Null), Err(Error::InvalidBindingName(_))));
        assert!(recorder.define("a b", Value::Null).is_err());
        assert!(recorder.undefine("").is_err());
        assert!(recorder.is_empty());
    }
}
