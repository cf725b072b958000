//! Best-effort persistence of the buffer.
//!
//! The engine only talks to the [`Storage`] port; hosts decide where the
//! bytes go (see `the-runtime` for the file backed one). Saving is write-only
//! and debounced, and no failure ever reaches the caller of an engine
//! operation.

use std::{
  collections::HashMap,
  sync::Arc,
  time::Duration,
};

use parking_lot::Mutex;
use thiserror::Error;

use crate::engine::Engine;

/// Key under which the last known buffer is stored.
pub const STORAGE_KEY: &str = "text-transformer-content";

/// Quiet period before the buffer is written out.
pub const SAVE_DELAY: Duration = Duration::from_millis(400);

#[derive(Debug, Error)]
pub enum StorageError {
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error("stored value is corrupted: {0}")]
  Corrupt(String),
  #[error("storage unavailable: {0}")]
  Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

pub trait Storage: Send + Sync {
  /// `Ok(None)` means nothing was stored under `key`.
  fn load(&self, key: &str) -> Result<Option<String>>;
  fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
  values: Mutex<HashMap<String, String>>,
}

impl Storage for MemoryStorage {
  fn load(&self, key: &str) -> Result<Option<String>> {
    Ok(self.values.lock().get(key).cloned())
  }

  fn save(&self, key: &str, value: &str) -> Result<()> {
    self.values.lock().insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// Writes the engine's text to a [`Storage`] after each burst of changes.
pub struct Persister {
  engine:  Engine,
  storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for Persister {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Persister").finish_non_exhaustive()
  }
}

impl Persister {
  pub fn spawn(engine: Engine, storage: Arc<dyn Storage>, delay: Duration) -> Self {
    let trigger = the_transformer_event::debounce(delay, {
      let engine = engine.downgrade();
      let storage = storage.clone();
      move || {
        if let Some(engine) = engine.upgrade() {
          save(&engine, storage.as_ref());
        }
      }
    });
    engine.subscribe(trigger);
    Self { engine, storage }
  }

  /// Saves right away, bypassing the debounce.
  pub fn flush(&self) {
    save(&self.engine, self.storage.as_ref());
  }
}

fn save(engine: &Engine, storage: &dyn Storage) {
  let text = engine.text();
  if let Err(err) = storage.save(STORAGE_KEY, &text) {
    log::debug!("ignoring failure to persist text: {err}");
  }
}
