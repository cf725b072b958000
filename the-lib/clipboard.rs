//! Clipboard abstraction for `the-lib`.
//!
//! The lib only defines the interface, error types and the copy policy.
//! Runtime hosts provide concrete implementations (see `the-runtime`).

use std::borrow::Cow;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error("clipboard provider command failed")]
  CommandFailed,
  #[error("failed to write to clipboard provider's stdin")]
  StdinWriteFailed,
  #[error("no clipboard provider available")]
  Unavailable,
  #[error("clipboard error: {0}")]
  Platform(String),
}

pub type Result<T> = std::result::Result<T, ClipboardError>;

pub trait ClipboardProvider: Send + Sync {
  fn name(&self) -> Cow<'_, str>;
  fn set_contents(&self, content: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct NoClipboard;

impl ClipboardProvider for NoClipboard {
  fn name(&self) -> Cow<'_, str> {
    "none".into()
  }

  fn set_contents(&self, _content: &str) -> Result<()> {
    Err(ClipboardError::Unavailable)
  }
}

/// Outcome of a copy request, reported back to the shell as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClipboardStatus {
  #[default]
  Idle,
  Copied,
  Failed,
}

/// Copies `text` with the first provider that accepts it.
///
/// Providers are tried in order, so everything after the first one acts as a
/// fallback. Empty text is never copied.
pub fn copy_text(text: &str, providers: &[&dyn ClipboardProvider]) -> ClipboardStatus {
  if text.is_empty() {
    return ClipboardStatus::Idle;
  }

  for provider in providers {
    match provider.set_contents(text) {
      Ok(()) => {
        log::debug!("copied {} bytes with {}", text.len(), provider.name());
        return ClipboardStatus::Copied;
      },
      Err(err) => log::debug!("clipboard provider {} failed: {err}", provider.name()),
    }
  }

  log::error!("could not copy to any clipboard provider");
  ClipboardStatus::Failed
}

#[cfg(test)]
mod test {
  use parking_lot::Mutex;

  use super::*;

  #[derive(Default)]
  struct Recording {
    contents: Mutex<Option<String>>,
  }

  impl ClipboardProvider for Recording {
    fn name(&self) -> Cow<'_, str> {
      "recording".into()
    }

    fn set_contents(&self, content: &str) -> Result<()> {
      *self.contents.lock() = Some(content.to_string());
      Ok(())
    }
  }

  struct Broken;

  impl ClipboardProvider for Broken {
    fn name(&self) -> Cow<'_, str> {
      "broken".into()
    }

    fn set_contents(&self, _content: &str) -> Result<()> {
      Err(ClipboardError::CommandFailed)
    }
  }

  #[test]
  fn primary_provider_wins() {
    let primary = Recording::default();
    let fallback = Recording::default();
    let status = copy_text("hello", &[&primary, &fallback]);
    assert_eq!(status, ClipboardStatus::Copied);
    assert_eq!(primary.contents.lock().as_deref(), Some("hello"));
    assert!(fallback.contents.lock().is_none());
  }

  #[test]
  fn falls_back_when_primary_fails() {
    let fallback = Recording::default();
    let status = copy_text("hello", &[&Broken, &fallback]);
    assert_eq!(status, ClipboardStatus::Copied);
    assert_eq!(fallback.contents.lock().as_deref(), Some("hello"));
  }

  #[test]
  fn fails_when_every_provider_fails() {
    assert_eq!(copy_text("x", &[&Broken, &NoClipboard]), ClipboardStatus::Failed);
    assert_eq!(copy_text("x", &[]), ClipboardStatus::Failed);
  }

  #[test]
  fn empty_text_is_not_copied() {
    let primary = Recording::default();
    assert_eq!(copy_text("", &[&primary]), ClipboardStatus::Idle);
    assert!(primary.contents.lock().is_none());
  }
}
