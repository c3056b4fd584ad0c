//! Identifiers - Module and loader identity
//!
//! Module identifiers are opaque, loader-resolved locators such as
//! `file:///project/src/file1.js`. Two synthetic forms exist:
//! - Pseudo-identifiers `<sentinel>/<localName>` stand in for imports the loader
//!   resolved to its reserved "empty" module (e.g. `@empty/fs`).
//! - Plugin resources carry the plugin separator (e.g. `styles.css!css`).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default sentinel the loader maps intentionally unresolved imports to.
pub const EMPTY_SENTINEL: &str = "@empty";

/// Default marker separating a resource from its loader plugin.
pub const PLUGIN_SEPARATOR: char = '!';

/// Unique identifier of a module within one loader instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    /// Create a new ModuleId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the pseudo-identifier for an import that resolved to `sentinel`.
    ///
    /// Only unique within the importing module: two modules with the same
    /// missing local name produce the same pseudo-identifier.
    pub fn pseudo(sentinel: &str, local_name: &str) -> Self {
        Self(format!("{}/{}", sentinel, local_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this identifier was synthesized for an unresolved import
    pub fn is_pseudo(&self, sentinel: &str) -> bool {
        self.0
            .strip_prefix(sentinel)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// The reserved empty module itself or a pseudo-identifier under it.
    /// Neither names a real module.
    pub fn is_empty_module(&self, sentinel: &str) -> bool {
        self.0 == sentinel || self.is_pseudo(sentinel)
    }

    /// Check if this identifier names a loader-plugin resource
    pub fn is_plugin_resource(&self, separator: char) -> bool {
        self.0.contains(separator)
    }

    /// Directory part of the identifier, including the trailing slash
    pub fn directory(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..=idx],
            None => "",
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModuleId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(Error::InvalidIdentifier(s.to_string()));
        }
        Ok(Self::new(s))
    }
}

impl From<&str> for ModuleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ModuleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Name of a loader instance. Every loader instance has its own module namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoaderId(String);

impl LoaderId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LoaderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Resolve an import specifier against the importing module.
///
/// - `./x` and `../x` are joined onto the parent's directory
/// - specifiers with a scheme (`://`) or a leading `/` are already absolute
/// - bare specifiers (`lodash`) need a package map and stay unresolved
pub fn resolve_specifier(specifier: &str, parent: &ModuleId) -> Option<ModuleId> {
    if specifier.contains("://") || specifier.starts_with('/') {
        return Some(ModuleId::new(specifier));
    }
    if !(specifier.starts_with("./") || specifier.starts_with("../")) {
        return None;
    }

    let base = parent.directory();
    let (prefix, path) = match base.find("://") {
        Some(idx) => base.split_at(idx + 3),
        None => ("", base),
    };

    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for part in specifier.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let leading = if path.starts_with('/') { "/" } else { "" };
    Some(ModuleId::new(format!("{}{}{}", prefix, leading, segments.join("/"))))
}
