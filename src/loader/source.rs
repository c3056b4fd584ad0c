//! Module sources - declarations a loader evaluates, and where they come from
//!
//! Parsing source text is the host's job; the loader consumes an already
//! structured list of top-level declarations.

use crate::identifier::{ModuleId, resolve_specifier};
use crate::value::Literal;
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One imported name: `import { imported as local }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportName {
    pub imported: String,
    pub local: String,
}

impl ImportName {
    pub fn same(name: &str) -> Self {
        Self {
            imported: name.to_string(),
            local: name.to_string(),
        }
    }
}

/// Right-hand side of a variable declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expr {
    Literal(Literal),
    /// Read a top-level binding by name
    Ref(String),
    /// Numeric addition or string concatenation
    Add(Box<Expr>, Box<Expr>),
    /// Numeric division
    Div(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn number(n: f64) -> Self {
        Expr::Literal(Literal::Number(n))
    }

    pub fn string(s: &str) -> Self {
        Expr::Literal(Literal::Str(s.to_string()))
    }

    pub fn reference(name: &str) -> Self {
        Expr::Ref(name.to_string())
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Expr::Add(Box::new(lhs), Box::new(rhs))
    }

    pub fn div(lhs: Expr, rhs: Expr) -> Self {
        Expr::Div(Box::new(lhs), Box::new(rhs))
    }
}

/// A top-level declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Declaration {
    Import {
        specifier: String,
        #[serde(default)]
        names: Vec<ImportName>,
        /// Type-only imports never load a module
        #[serde(default)]
        type_only: bool,
    },
    Var {
        name: String,
        init: Expr,
        #[serde(default)]
        exported: bool,
    },
    Class {
        name: String,
        #[serde(default)]
        extends: Option<String>,
        #[serde(default)]
        exported: bool,
    },
    /// `export { local as exported }`; `export default` uses `exported: "default"`
    Export { local: String, exported: String },
    /// Assignment to the loader-global namespace (`System.global.name = init`)
    Global { name: String, init: Expr },
}

/// Name of the default export
pub const DEFAULT_EXPORT: &str = "default";

/// How a module publishes its exports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    #[default]
    Esm,
    /// Script writing to the loader global. `exports` names the global binding
    /// that becomes the module's export.
    Global {
        #[serde(default)]
        exports: Option<String>,
    },
}

impl ModuleFormat {
    /// Global binding a global-format module exports
    pub fn global_export(&self) -> Option<&str> {
        match self {
            ModuleFormat::Esm => None,
            ModuleFormat::Global { exports } => exports.as_deref(),
        }
    }
}

/// Declarations of one module, in source order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleSource {
    #[serde(default)]
    pub format: ModuleFormat,
    pub declarations: Vec<Declaration>,
}

impl ModuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Global-format script exporting the global binding `exports`
    pub fn global(exports: Option<&str>) -> Self {
        Self {
            format: ModuleFormat::Global {
                exports: exports.map(str::to_string),
            },
            declarations: Vec::new(),
        }
    }

    /// `import { a, b } from "specifier"`; no names = side-effect-only import
    pub fn import(mut self, specifier: &str, names: &[&str]) -> Self {
        self.declarations.push(Declaration::Import {
            specifier: specifier.to_string(),
            names: names.iter().map(|n| ImportName::same(n)).collect(),
            type_only: false,
        });
        self
    }

    /// `import local from "specifier"`
    pub fn import_default(mut self, specifier: &str, local: &str) -> Self {
        self.declarations.push(Declaration::Import {
            specifier: specifier.to_string(),
            names: vec![ImportName {
                imported: DEFAULT_EXPORT.to_string(),
                local: local.to_string(),
            }],
            type_only: false,
        });
        self
    }

    /// `import type { ... } from "specifier"`
    pub fn import_type(mut self, specifier: &str) -> Self {
        self.declarations.push(Declaration::Import {
            specifier: specifier.to_string(),
            names: Vec::new(),
            type_only: true,
        });
        self
    }

    pub fn var(self, name: &str, init: Expr) -> Self {
        self.push_var(name, init, false)
    }

    pub fn export_var(self, name: &str, init: Expr) -> Self {
        self.push_var(name, init, true)
    }

    pub fn class(self, name: &str, extends: Option<&str>) -> Self {
        self.push_class(name, extends, false)
    }

    pub fn export_class(self, name: &str, extends: Option<&str>) -> Self {
        self.push_class(name, extends, true)
    }

    /// `export default class name extends ...`
    pub fn export_default_class(self, name: &str, extends: Option<&str>) -> Self {
        self.push_class(name, extends, false).export_as(name, DEFAULT_EXPORT)
    }

    pub fn export_as(mut self, local: &str, exported: &str) -> Self {
        self.declarations.push(Declaration::Export {
            local: local.to_string(),
            exported: exported.to_string(),
        });
        self
    }

    /// `System.global.name = init`
    pub fn set_global(mut self, name: &str, init: Expr) -> Self {
        self.declarations.push(Declaration::Global {
            name: name.to_string(),
            init,
        });
        self
    }

    fn push_var(mut self, name: &str, init: Expr, exported: bool) -> Self {
        self.declarations.push(Declaration::Var {
            name: name.to_string(),
            init,
            exported,
        });
        self
    }

    fn push_class(mut self, name: &str, extends: Option<&str>, exported: bool) -> Self {
        self.declarations.push(Declaration::Class {
            name: name.to_string(),
            extends: extends.map(str::to_string),
            exported,
        });
        self
    }
}

/// Where a loader gets module sources from.
///
/// `fetch` is the only point where module evaluation suspends.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Resolve an import specifier; `None` leaves the import unresolved
    fn resolve(&self, specifier: &str, parent: &ModuleId) -> Option<ModuleId> {
        resolve_specifier(specifier, parent)
    }

    async fn fetch(&self, id: &ModuleId) -> Result<ModuleSource>;
}

/// In-memory sources, replaceable at any time for live reevaluation
#[derive(Debug, Default)]
pub struct MemorySourceProvider {
    sources: RwLock<HashMap<ModuleId, ModuleSource>>,
}

impl MemorySourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, id: &str, source: ModuleSource) -> Self {
        self.insert(ModuleId::new(id), source);
        self
    }

    /// Add or replace the source of a module
    pub fn insert(&self, id: ModuleId, source: ModuleSource) -> Option<ModuleSource> {
        self.sources.write().insert(id, source)
    }
}

#[async_trait]
impl SourceProvider for MemorySourceProvider {
    async fn fetch(&self, id: &ModuleId) -> Result<ModuleSource> {
        self.sources
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ModuleNotFound(id.clone()))
    }
}
