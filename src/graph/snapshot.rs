//! Loader snapshots - the two bookkeeping shapes a host loader exposes
//!
//! - Legacy: `{ "loads": { id: { "depMap": { localName: resolvedId } } }, "loaded": [id] }`
//! - Modern: `{ "moduleRecords": { id: { "dependencies": [ { "name": id } | null | false ] } } }`
//!
//! Snapshots coming from a host are parsed leniently: a module whose bookkeeping
//! is malformed is kept with no dependencies instead of failing the whole snapshot.

use crate::identifier::ModuleId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::{BTreeMap, BTreeSet};

/// Legacy per-module bookkeeping: local import name → resolved identifier, in
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyLoad {
    #[serde(rename = "depMap", default)]
    pub dep_map: IndexMap<String, ModuleId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacySnapshot {
    #[serde(default)]
    pub loads: BTreeMap<ModuleId, LegacyLoad>,
    /// Identifiers the loader has finished loading
    #[serde(default)]
    pub loaded: BTreeSet<ModuleId>,
}

/// One entry of a modern dependency list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DependencySlot {
    Resolved { name: ModuleId },
    /// Import that did not resolve to a module (side-effect-only, type-only, ...)
    Hole,
}

impl DependencySlot {
    pub fn resolved(id: impl Into<ModuleId>) -> Self {
        DependencySlot::Resolved { name: id.into() }
    }

    pub fn module(&self) -> Option<&ModuleId> {
        match self {
            DependencySlot::Resolved { name } => Some(name),
            DependencySlot::Hole => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleRecord {
    pub dependencies: Vec<DependencySlot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModernSnapshot {
    #[serde(rename = "moduleRecords")]
    pub records: BTreeMap<ModuleId, ModuleRecord>,
}

/// Loader bookkeeping in one of the two supported shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LoaderSnapshot {
    Legacy(LegacySnapshot),
    Modern(ModernSnapshot),
}

impl Default for LoaderSnapshot {
    fn default() -> Self {
        LoaderSnapshot::Modern(ModernSnapshot::default())
    }
}

impl LoaderSnapshot {
    /// Detect the snapshot shape and parse it. Never fails: absent bookkeeping
    /// structures yield an empty snapshot.
    ///
    /// A `loads` table selects the legacy shape. Otherwise module records are read
    /// from `moduleRecords` or `_loader.moduleRecords`.
    pub fn from_json(json: &Json) -> Self {
        if let Some(loads) = json.get("loads").and_then(Json::as_object) {
            let loads = loads
                .iter()
                .map(|(id, load)| (ModuleId::new(id.as_str()), parse_legacy_load(id, load)))
                .collect();
            let loaded = json.get("loaded").map(parse_loaded).unwrap_or_default();
            return LoaderSnapshot::Legacy(LegacySnapshot { loads, loaded });
        }

        let records = json
            .get("moduleRecords")
            .or_else(|| json.get("_loader").and_then(|l| l.get("moduleRecords")))
            .and_then(Json::as_object);

        let records = records
            .map(|records| {
                records
                    .iter()
                    .map(|(id, record)| {
                        (ModuleId::new(id.as_str()), parse_module_record(id, record))
                    })
                    .collect()
            })
            .unwrap_or_default();

        LoaderSnapshot::Modern(ModernSnapshot { records })
    }

    /// Parse a snapshot from JSON text
    pub fn from_json_str(s: &str) -> crate::Result<Self> {
        let json: Json = serde_json::from_str(s)?;
        Ok(Self::from_json(&json))
    }

    pub fn shape(&self) -> &'static str {
        match self {
            LoaderSnapshot::Legacy(_) => "legacy",
            LoaderSnapshot::Modern(_) => "modern",
        }
    }
}

fn parse_legacy_load(id: &str, load: &Json) -> LegacyLoad {
    let Some(dep_map) = load.get("depMap") else {
        return LegacyLoad::default();
    };
    match serde_json::from_value::<IndexMap<String, ModuleId>>(dep_map.clone()) {
        Ok(dep_map) => LegacyLoad { dep_map },
        Err(e) => {
            tracing::warn!("Malformed depMap for {}: {}", id, e);
            LegacyLoad::default()
        }
    }
}

/// The loaded set is either a list of identifiers or an object keyed by them.
fn parse_loaded(loaded: &Json) -> BTreeSet<ModuleId> {
    match loaded {
        Json::Array(items) => items
            .iter()
            .filter_map(Json::as_str)
            .map(ModuleId::new)
            .collect(),
        Json::Object(map) => map.keys().map(|k| ModuleId::new(k.as_str())).collect(),
        _ => BTreeSet::new(),
    }
}

fn parse_module_record(id: &str, record: &Json) -> ModuleRecord {
    let Some(deps) = record.get("dependencies").and_then(Json::as_array) else {
        if record.get("dependencies").is_some() {
            tracing::warn!("Malformed dependency list for {}", id);
        }
        return ModuleRecord::default();
    };

    let dependencies = deps
        .iter()
        .map(|dep| match dep {
            Json::Object(_) => dep
                .get("name")
                .and_then(Json::as_str)
                .map(DependencySlot::resolved)
                .unwrap_or(DependencySlot::Hole),
            Json::String(name) => DependencySlot::resolved(name.as_str()),
            _ => DependencySlot::Hole,
        })
        .collect();

    ModuleRecord { dependencies }
}
