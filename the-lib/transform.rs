//! The contract between the engine and the functions it runs.
//!
//! A transformation receives the current buffer and either produces the new
//! text right away or hands back a future that resolves to it after an
//! arbitrary number of cooperative yields. The engine drives both through
//! [`TransformOutput::resolve`].

use std::{
  any::Any,
  fmt,
  panic::AssertUnwindSafe,
  sync::Arc,
};

use futures_util::{
  FutureExt,
  future::BoxFuture,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransformError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
  #[error("transform failed: {0}")]
  Failed(String),
  #[error("transform panicked: {0}")]
  Panicked(String),
}

impl TransformError {
  pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
    let message = if let Some(msg) = payload.downcast_ref::<&'static str>() {
      (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
      msg.clone()
    } else {
      "unknown panic payload".to_string()
    };
    Self::Panicked(message)
  }
}

/// Result of invoking a transformation.
pub enum TransformOutput {
  /// The text is already available.
  Immediate(String),
  /// The text becomes available once the future completes.
  Deferred(BoxFuture<'static, Result<String>>),
}

impl TransformOutput {
  pub fn deferred<F>(future: F) -> Self
  where
    F: Future<Output = Result<String>> + Send + 'static,
  {
    Self::Deferred(future.boxed())
  }

  /// An output that reports `error` once resolved.
  pub fn failed(error: TransformError) -> Self {
    Self::Deferred(futures_util::future::ready(Err(error)).boxed())
  }

  #[inline]
  pub fn is_deferred(&self) -> bool {
    matches!(self, Self::Deferred(_))
  }

  /// Waits for the text. A panic raised while polling a deferred output is
  /// turned into [`TransformError::Panicked`].
  pub async fn resolve(self) -> Result<String> {
    match self {
      Self::Immediate(text) => Ok(text),
      Self::Deferred(future) => AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(TransformError::from_panic(payload))),
    }
  }
}

impl From<String> for TransformOutput {
  fn from(text: String) -> Self {
    Self::Immediate(text)
  }
}

impl From<&str> for TransformOutput {
  fn from(text: &str) -> Self {
    Self::Immediate(text.to_string())
  }
}

impl fmt::Debug for TransformOutput {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Immediate(text) => f.debug_tuple("Immediate").field(&text.len()).finish(),
      Self::Deferred(_) => f.write_str("Deferred(..)"),
    }
  }
}

/// Any value usable as a transformation.
pub trait Transform: FnOnce(Arc<str>) -> TransformOutput {}

impl<F> Transform for F where F: FnOnce(Arc<str>) -> TransformOutput {}

/// Invokes `transform`, catching a panic raised before it returns.
pub(crate) fn invoke<F: Transform>(transform: F, text: Arc<str>) -> TransformOutput {
  std::panic::catch_unwind(AssertUnwindSafe(move || transform(text)))
    .unwrap_or_else(|payload| TransformOutput::failed(TransformError::from_panic(payload)))
}

#[cfg(test)]
mod test {
  use futures_executor::block_on;

  use super::*;

  #[test]
  fn immediate_resolves_to_its_text() {
    let output = TransformOutput::from("done");
    assert!(!output.is_deferred());
    assert_eq!(block_on(output.resolve()), Ok("done".to_string()));
  }

  #[test]
  fn deferred_resolves_after_polling() {
    let output = TransformOutput::deferred(async { Ok("later".to_string()) });
    assert!(output.is_deferred());
    assert_eq!(block_on(output.resolve()), Ok("later".to_string()));
  }

  #[test]
  fn failed_output_reports_error() {
    let output = TransformOutput::failed(TransformError::Failed("nope".into()));
    assert_eq!(
      block_on(output.resolve()),
      Err(TransformError::Failed("nope".into()))
    );
  }

  fn explode() -> Result<String> {
    panic!("boom")
  }

  #[test]
  fn panic_while_polling_is_caught() {
    let output = TransformOutput::deferred(async { explode() });
    assert_eq!(
      block_on(output.resolve()),
      Err(TransformError::Panicked("boom".into()))
    );
  }

  #[test]
  fn panic_while_invoking_is_caught() {
    let output = invoke(
      |_text: Arc<str>| -> TransformOutput { panic!("bad {}", 42) },
      Arc::from(""),
    );
    assert_eq!(
      block_on(output.resolve()),
      Err(TransformError::Panicked("bad 42".into()))
    );
  }
}
