use crate::graph::ExtractOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LivemodConfig {
    /// Resolved name the host loader uses for intentionally unresolved imports
    pub empty_sentinel: Option<String>,
    /// Marker of loader-plugin resources
    pub plugin_separator: Option<char>,
    /// Default snapshot file for commands that read one
    pub snapshot: Option<String>,
    /// Default output format (text, json, dot)
    pub format: Option<String>,
}

impl LivemodConfig {
    pub fn extract_options(&self) -> ExtractOptions {
        let defaults = ExtractOptions::default();
        ExtractOptions {
            empty_sentinel: self.empty_sentinel.clone().unwrap_or(defaults.empty_sentinel),
            plugin_separator: self.plugin_separator.unwrap_or(defaults.plugin_separator),
        }
    }

    /// Config with every field spelled out, used by `livemod init`
    pub fn with_defaults() -> Self {
        let defaults = ExtractOptions::default();
        Self {
            empty_sentinel: Some(defaults.empty_sentinel),
            plugin_separator: Some(defaults.plugin_separator),
            snapshot: None,
            format: Some("text".to_string()),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("livemod.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<LivemodConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: LivemodConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &LivemodConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
