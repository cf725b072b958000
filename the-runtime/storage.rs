//! File backed [`Storage`] for runtime hosts.

use std::{
  io::{
    ErrorKind,
    Write,
  },
  path::{
    Path,
    PathBuf,
  },
};

use the_lib::storage::{
  Result,
  Storage,
  StorageError,
};

/// Stores each key as one file in a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
  dir: PathBuf,
}

impl FileStorage {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn path_for(&self, key: &str) -> PathBuf {
    let name: String = key
      .chars()
      .map(|c| {
        if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
          c
        } else {
          '_'
        }
      })
      .collect();
    self.dir.join(name)
  }
}

impl Storage for FileStorage {
  fn load(&self, key: &str) -> Result<Option<String>> {
    let path = self.path_for(key);
    let bytes = match std::fs::read(&path) {
      Ok(bytes) => bytes,
      Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
      Err(err) => return Err(err.into()),
    };
    String::from_utf8(bytes)
      .map(Some)
      .map_err(|err| StorageError::Corrupt(format!("{}: {err}", path.display())))
  }

  /// Writes through a temporary file in the same directory, then renames it
  /// over the old value.
  fn save(&self, key: &str, value: &str) -> Result<()> {
    std::fs::create_dir_all(&self.dir)?;
    let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
    file.write_all(value.as_bytes())?;
    file.flush()?;
    file
      .persist(self.path_for(key))
      .map_err(|err| StorageError::Io(err.error))?;
    Ok(())
  }
}
