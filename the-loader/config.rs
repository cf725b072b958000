use std::{
  io::ErrorKind,
  path::Path,
  time::Duration,
};

use anyhow::{
  Context,
  Result,
};
use serde::{
  Deserialize,
  Serialize,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
  pub history:  HistoryConfig,
  pub chunking: ChunkingConfig,
  pub debounce: DebounceConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct HistoryConfig {
  /// Number of undo snapshots kept.
  pub capacity: usize,
}

impl Default for HistoryConfig {
  fn default() -> Self {
    Self { capacity: 20 }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ChunkingConfig {
  /// Line count from which line-local operations yield between chunks.
  pub threshold:  usize,
  pub chunk_size: usize,
}

impl Default for ChunkingConfig {
  fn default() -> Self {
    Self {
      threshold:  3000,
      chunk_size: 600,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DebounceConfig {
  pub metrics_ms: u64,
  pub save_ms:    u64,
}

impl Default for DebounceConfig {
  fn default() -> Self {
    Self {
      metrics_ms: 150,
      save_ms:    400,
    }
  }
}

impl DebounceConfig {
  pub fn metrics_delay(&self) -> Duration {
    Duration::from_millis(self.metrics_ms)
  }

  pub fn save_delay(&self) -> Duration {
    Duration::from_millis(self.save_ms)
  }
}

impl Config {
  /// Parses a configuration document. Absent keys take their defaults.
  pub fn from_toml(source: &str) -> Result<Self> {
    toml::from_str(source).context("failed to parse configuration")
  }

  /// Loads `path`, treating a missing file as an empty one.
  pub fn load(path: &Path) -> Result<Self> {
    let value = read_toml(path)?.unwrap_or_else(empty_table);
    Self::from_value(value, path)
  }

  /// User configuration with the workspace configuration layered on top.
  pub fn load_layered(user: &Path, workspace: &Path) -> Result<Self> {
    let mut value = read_toml(user)?.unwrap_or_else(empty_table);
    if workspace != user
      && let Some(local) = read_toml(workspace)?
    {
      log::debug!("layering workspace config {}", workspace.display());
      value = crate::merge_toml_values(value, local, 2);
    }
    Self::from_value(value, user)
  }

  /// [`Self::load_layered`] on the files found by the loader.
  pub fn load_default() -> Result<Self> {
    Self::load_layered(&crate::config_file(), &crate::workspace_config_file())
  }

  fn from_value(value: toml::Value, path: &Path) -> Result<Self> {
    value
      .try_into()
      .with_context(|| format!("invalid configuration in {}", path.display()))
  }
}

fn empty_table() -> toml::Value {
  toml::Value::Table(toml::Table::new())
}

fn read_toml(path: &Path) -> Result<Option<toml::Value>> {
  let source = match std::fs::read_to_string(path) {
    Ok(source) => source,
    Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
    Err(err) => {
      return Err(err).with_context(|| format!("failed to read {}", path.display()));
    },
  };
  toml::from_str(&source)
    .map(Some)
    .with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn missing_keys_use_defaults() {
    let config = Config::from_toml("[chunking]\nchunk-size = 100").unwrap();
    assert_eq!(config.chunking.chunk_size, 100);
    assert_eq!(config.chunking.threshold, 3000);
    assert_eq!(config.history.capacity, 20);
    assert_eq!(config.debounce.save_delay(), Duration::from_millis(400));
    assert_eq!(Config::from_toml("").unwrap(), Config::default());
  }

  #[test]
  fn unknown_keys_are_rejected() {
    assert!(Config::from_toml("[history]\nsize = 3").is_err());
    assert!(Config::from_toml("[colors]").is_err());
  }

  #[test]
  fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("config.toml")).unwrap();
    assert_eq!(config, Config::default());
  }

  #[test]
  fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[history\ncapacity = ").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("config.toml"));
  }

  #[test]
  fn workspace_overrides_user() {
    let dir = tempfile::tempdir().unwrap();
    let user = dir.path().join("user.toml");
    let local = dir.path().join("local.toml");
    std::fs::write(&user, "[debounce]\nmetrics-ms = 50\nsave-ms = 900\n").unwrap();
    std::fs::write(&local, "[debounce]\nsave-ms = 10\n[history]\ncapacity = 5\n").unwrap();

    let config = Config::load_layered(&user, &local).unwrap();
    assert_eq!(config.debounce.metrics_ms, 50);
    assert_eq!(config.debounce.save_ms, 10);
    assert_eq!(config.history.capacity, 5);
  }
}
