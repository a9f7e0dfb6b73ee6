//! App configuration (§6 "app config path", ambient stack).
//!
//! A small `serde`-derived struct with sane defaults, loaded from either
//! TOML or YAML depending on the config file's extension, since
//! `--config-path` may point at either.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use factorix_core::constants::ENV_FACTORIX_CONFIG;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub mods_directory: Option<PathBuf>,
  pub jobs: usize,
  pub backup_extension: Option<String>,
  pub log_level: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      mods_directory: None,
      jobs: factorix_core::constants::DEFAULT_JOBS,
      backup_extension: Some("bak".to_string()),
      log_level: "info".to_string(),
    }
  }
}

impl Config {
  /// Resolves the config path: an explicit `--config-path`, else
  /// `FACTORIX_CONFIG`, else the platform config directory's
  /// `factorix/config.yaml`.
  pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
      return path;
    }
    if let Ok(path) = std::env::var(ENV_FACTORIX_CONFIG) {
      return PathBuf::from(path);
    }
    dirs::config_dir()
      .unwrap_or_else(|| PathBuf::from("."))
      .join("factorix")
      .join("config.yaml")
  }

  /// Loads the config at `path`, falling back to defaults if it doesn't
  /// exist. A present-but-unreadable file is still an error.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    if !path.exists() {
      return Ok(Self::default());
    }
    let body = std::fs::read_to_string(path)?;
    let config = match path.extension().and_then(|e| e.to_str()) {
      Some("toml") => toml::from_str(&body)?,
      _ => serde_yaml::from_str(&body)?,
    };
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.yaml")).unwrap();
    assert_eq!(config.jobs, factorix_core::constants::DEFAULT_JOBS);
  }

  #[test]
  fn loads_yaml_overrides() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "jobs: 8\nbackup_extension: bak2\nlog_level: debug\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.jobs, 8);
    assert_eq!(config.backup_extension.as_deref(), Some("bak2"));
    assert_eq!(config.log_level, "debug");
  }
}
