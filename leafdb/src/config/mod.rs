use crate::codec::Format;
use crate::error::Result;
use crate::logging::Logger;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Store settings, usually read from a YAML file:
///
/// ```yaml
/// root: ./data
/// format: yaml
/// log_level: info
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Data directory. Each collection is a subdirectory.
    pub root: PathBuf,
    /// Serializer for record files.
    pub format: Format,
    /// Most verbose level the store logs at.
    pub log_level: LevelFilter,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            root: PathBuf::from("."),
            format: Format::default(),
            log_level: LevelFilter::Trace,
        }
    }
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StoreConfig {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Load a config file. A relative `root` is resolved against the
    /// directory containing the file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        if config.root.is_relative() {
            if let Some(dir) = path.parent() {
                config.root = dir.join(&config.root);
            }
        }
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn logger(&self) -> Logger {
        Logger::new("leafdb", self.log_level)
    }
}
