//! Infrastructure implementation of the `ConfigStore` port.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::application::ports::ConfigStore;
use crate::domain::config::SkiffConfig;

/// Environment variable overriding the configuration file path.
pub const CONFIG_ENV: &str = "SKIFF_CONFIG";

/// Production implementation of `ConfigStore` that reads a YAML file on disk.
#[derive(Debug, Default)]
pub struct YamlConfigStore {
    path: Option<PathBuf>,
}

impl YamlConfigStore {
    /// Store reading `SKIFF_CONFIG`, or `~/.skiff/config.yaml`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store reading a fixed path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<SkiffConfig> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(SkiffConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".skiff").join("config.yaml"))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = YamlConfigStore::with_path(dir.path().join("config.yaml"));
        assert_eq!(store.load().expect("load"), SkiffConfig::default());
    }

    #[test]
    fn test_load_reads_defaults_section() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "defaults:\n  fold: true\n").expect("write");
        let config = YamlConfigStore::with_path(path).load().expect("load");
        assert!(config.defaults.fold);
        assert!(!config.defaults.skip_cleanup);
    }

    #[test]
    fn test_load_invalid_yaml_names_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "defaults: [").expect("write");
        let err = YamlConfigStore::with_path(path.clone()).load().expect_err("invalid");
        assert!(err.to_string().contains(&path.display().to_string()));
    }
}
