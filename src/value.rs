//! Values - What a binding can hold
//!
//! Bindings hold one of six value kinds:
//! - `Undefined`: defined, but without a value (not the same as an absent binding)
//! - `Null`, `Bool`, `Number`, `Str`: plain data
//! - `Class`: a class produced by evaluating a class declaration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a class value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

impl ClassId {
    fn next() -> Self {
        Self(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct ClassDef {
    id: ClassId,
    name: String,
}

/// Handle to a class. Clones share identity; equality is identity, never structure.
///
/// Metadata about the class (superclass, owning module) is not stored here but in
/// the registry's [`ClassMetadataTable`](crate::module::ClassMetadataTable).
#[derive(Debug, Clone)]
pub struct ClassValue(Arc<ClassDef>);

impl ClassValue {
    /// Create a new class with a fresh identity
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::new(ClassDef {
            id: ClassId::next(),
            name: name.into(),
        }))
    }

    pub fn id(&self) -> ClassId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }
}

impl PartialEq for ClassValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ClassValue {}

impl std::hash::Hash for ClassValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

/// A value stored in a binding.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Arc<str>),
    Class(ClassValue),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    /// Name of the value's kind
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Class(_) => "class",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassValue> {
        match self {
            Value::Class(class) => Some(class),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<ClassValue> for Value {
    fn from(class: ClassValue) -> Self {
        Value::Class(class)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Class(class) => write!(f, "class {}", class.name()),
        }
    }
}

/// Plain-data literal as written in module declarations.
///
/// Classes cannot be literals; they only come into existence by evaluating a
/// class declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Self {
        match lit {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::Str(s) => Value::str(s),
        }
    }
}
