use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfig {
    /// Directory holding the persisted profile tables.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Platform the hook acts on. Events from other platforms are ignored.
    #[serde(default = "default_platform")]
    pub platform: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            platform: default_platform(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/plugin_data/profile")
}

fn default_platform() -> String {
    "aiocqhttp".to_string()
}

impl PluginConfig {
    pub fn user_info_path(&self) -> PathBuf {
        self.data_dir.join("user_info.json")
    }

    pub fn group_info_path(&self) -> PathBuf {
        self.data_dir.join("group_info.json")
    }

    pub fn ensure_data_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir).with_context(|| {
            format!("Failed to create data dir: {}", self.data_dir.display())
        })
    }
}

pub fn load(path: &str) -> Result<PluginConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {path}"))?;
    let config: PluginConfig =
        toml::from_str(&content).with_context(|| "Failed to parse config.toml")?;
    Ok(config)
}
