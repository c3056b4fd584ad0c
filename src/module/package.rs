//! Package metadata - where a module sits inside a distributable package

use crate::identifier::ModuleId;
use serde::{Deserialize, Serialize};

/// Package origin of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    /// Unknown when the manifest carries no version
    pub version: Option<String>,
    /// Module path relative to the package root, e.g. `./file4.js`
    #[serde(rename = "pathInPackage")]
    pub path_in_package: String,
}

/// A registered package: everything under `address` belongs to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: Option<String>,
    /// Root locator of the package, e.g. `http://host/project/`
    pub address: String,
}

impl Package {
    pub fn new(
        name: impl Into<String>,
        version: Option<String>,
        address: impl Into<String>,
    ) -> Self {
        let mut address = address.into();
        if !address.ends_with('/') {
            address.push('/');
        }
        Self {
            name: name.into(),
            version,
            address,
        }
    }

    /// Check if the module lives under this package's address
    pub fn contains(&self, module: &ModuleId) -> bool {
        module.as_str().starts_with(&self.address)
    }

    /// Metadata for a module of this package, `None` if the module lives elsewhere
    pub fn metadata_for(&self, module: &ModuleId) -> Option<PackageMetadata> {
        let relative = module.as_str().strip_prefix(&self.address)?;
        Some(PackageMetadata {
            name: self.name.clone(),
            version: self.version.clone(),
            path_in_package: format!("./{}", relative),
        })
    }
}

/// Pick the innermost package containing `module`
pub fn owning_package<'a>(packages: &'a [Package], module: &ModuleId) -> Option<&'a Package> {
    packages
        .iter()
        .filter(|p| p.contains(module))
        .max_by_key(|p| p.address.len())
}
