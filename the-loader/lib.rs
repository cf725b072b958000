pub mod config;

use std::{
  borrow::Cow,
  path::{
    Path,
    PathBuf,
  },
  sync::OnceLock,
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};

const APP_DIR: &str = "the-transformer";

static CONFIG_FILE: OnceLock<PathBuf> = OnceLock::new();

static LOG_FILE: OnceLock<PathBuf> = OnceLock::new();

pub fn initialize_config_file(specified_file: Option<PathBuf>) {
  let config_file = specified_file.unwrap_or_else(default_config_file);
  ensure_parent_dir(&config_file);
  CONFIG_FILE.set(config_file).ok();
}

pub fn initialize_log_file(specified_file: Option<PathBuf>) {
  let log_file = specified_file.unwrap_or_else(default_log_file);
  ensure_parent_dir(&log_file);
  LOG_FILE.set(log_file).ok();
}

/// Replaces a leading `~` with the home directory, when there is one.
pub fn expand_tilde(path: &Path) -> Cow<'_, Path> {
  let Ok(rest) = path.strip_prefix("~") else {
    return Cow::Borrowed(path);
  };
  match etcetera::home_dir() {
    Ok(home) => Cow::Owned(home.join(rest)),
    Err(_) => Cow::Borrowed(path),
  }
}

fn current_dir() -> PathBuf {
  std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub fn config_dir() -> PathBuf {
  if let Ok(dir) = std::env::var("THE_TRANSFORMER_CONFIG_DIR") {
    return expand_tilde(Path::new(&dir)).into_owned();
  }
  match choose_base_strategy() {
    Ok(strategy) => strategy.config_dir().join(APP_DIR),
    Err(err) => {
      log::warn!("unable to find the config directory ({err}), using the working directory");
      current_dir().join(format!(".{APP_DIR}"))
    },
  }
}

pub fn cache_dir() -> PathBuf {
  if let Ok(dir) = std::env::var("THE_TRANSFORMER_CACHE_DIR") {
    return expand_tilde(Path::new(&dir)).into_owned();
  }
  match choose_base_strategy() {
    Ok(strategy) => strategy.cache_dir().join(APP_DIR),
    Err(err) => {
      log::warn!("unable to find the cache directory ({err}), using the working directory");
      current_dir().join(format!(".{APP_DIR}")).join("cache")
    },
  }
}

/// Directory holding the persisted buffer.
pub fn state_dir() -> PathBuf {
  cache_dir().join("state")
}

pub fn config_file() -> PathBuf {
  CONFIG_FILE
    .get_or_init(|| {
      let path = default_config_file();
      ensure_parent_dir(&path);
      path
    })
    .clone()
}

pub fn log_file() -> PathBuf {
  LOG_FILE
    .get_or_init(|| {
      let path = default_log_file();
      ensure_parent_dir(&path);
      path
    })
    .clone()
}

/// Project-local configuration, layered over the user's.
pub fn workspace_config_file() -> PathBuf {
  find_workspace().0.join(format!(".{APP_DIR}")).join("config.toml")
}

pub fn default_log_file() -> PathBuf {
  cache_dir().join(format!("{APP_DIR}.log"))
}

/// Merge two TOML documents, merging values from `right` onto `left`.
///
/// Tables present on both sides are merged key by key up to `merge_depth`
/// levels deep; below that, and for every other kind of value, `right`
/// replaces `left`.
pub fn merge_toml_values(left: toml::Value, right: toml::Value, merge_depth: usize) -> toml::Value {
  use toml::Value;

  match (left, right) {
    (Value::Table(mut left_map), Value::Table(right_map)) if merge_depth > 0 => {
      for (rname, rvalue) in right_map {
        let merged = match left_map.remove(&rname) {
          Some(lvalue) => merge_toml_values(lvalue, rvalue, merge_depth - 1),
          None => rvalue,
        };
        left_map.insert(rname, merged);
      }
      Value::Table(left_map)
    },
    (_, value) => value,
  }
}

/// Finds the current workspace folder.
///
/// Searches upward from the working directory for the first directory that
/// contains `.git`, `.svn`, `.jj` or `.the-transformer`. If none is found
/// returns (CWD, true), otherwise (workspace, false).
pub fn find_workspace() -> (PathBuf, bool) {
  match std::env::current_dir() {
    Ok(current_dir) => find_workspace_in(current_dir),
    Err(_) => (PathBuf::new(), true),
  }
}

pub fn find_workspace_in(dir: impl AsRef<Path>) -> (PathBuf, bool) {
  let dir = dir.as_ref();
  for ancestor in dir.ancestors() {
    if ancestor.join(".git").exists()
      || ancestor.join(".svn").exists()
      || ancestor.join(".jj").exists()
      || ancestor.join(format!(".{APP_DIR}")).exists()
    {
      return (ancestor.to_owned(), false);
    }
  }

  (dir.to_owned(), true)
}

fn default_config_file() -> PathBuf {
  config_dir().join("config.toml")
}

fn ensure_parent_dir(path: &Path) {
  if let Some(parent) = path.parent()
    && !parent.exists()
  {
    std::fs::create_dir_all(parent).ok();
  }
}

#[cfg(test)]
mod test {
  use toml::Value;

  use super::*;

  #[test]
  fn tables_merge_key_by_key() {
    let base: Value = toml::from_str(
      r#"
        [history]
        capacity = 20
        [debounce]
        metrics-ms = 150
        save-ms = 400
      "#,
    )
    .unwrap();
    let user: Value = toml::from_str(
      r#"
        [debounce]
        save-ms = 1000
      "#,
    )
    .unwrap();

    let merged = merge_toml_values(base, user, 3);
    assert_eq!(merged["history"]["capacity"].as_integer(), Some(20));
    assert_eq!(merged["debounce"]["metrics-ms"].as_integer(), Some(150));
    assert_eq!(merged["debounce"]["save-ms"].as_integer(), Some(1000));
  }

  #[test]
  fn depth_zero_replaces_tables() {
    let base: Value = toml::from_str("[history]\ncapacity = 20").unwrap();
    let user: Value = toml::from_str("[chunking]\nthreshold = 10").unwrap();
    let merged = merge_toml_values(base, user, 0);
    assert!(merged.get("history").is_none());
    assert_eq!(merged["chunking"]["threshold"].as_integer(), Some(10));
  }

  #[test]
  fn workspace_is_found_by_marker() {
    let root = tempfile::tempdir().unwrap();
    let nested = root.path().join("a").join("b");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::create_dir(root.path().join(".the-transformer")).unwrap();

    let (found, fallback) = find_workspace_in(&nested);
    assert_eq!(found, root.path());
    assert!(!fallback);
  }

  #[test]
  fn paths_without_tilde_are_borrowed() {
    let path = Path::new("/tmp/x");
    assert!(matches!(expand_tilde(path), Cow::Borrowed(_)));
  }
}
