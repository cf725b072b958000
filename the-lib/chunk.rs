//! Mapping a per-line function over text too large to process in one go.
//!
//! Small inputs are mapped synchronously. Large inputs are processed in
//! fixed-size chunks with a yield to the host's [`Scheduler`] after every
//! chunk, which keeps the interactive surface responsive while a transform
//! runs. Both paths produce the same text because the mapper only ever sees
//! a single line.

use std::{
  borrow::Cow,
  sync::{
    Arc,
    atomic::{
      AtomicUsize,
      Ordering,
    },
  },
};

use async_trait::async_trait;
use the_core::line_ending::{
  LINE_FEED,
  join_lines,
  normalize,
  split_lines,
};

use crate::transform::TransformOutput;

/// Inputs with fewer lines than this are mapped synchronously.
pub const CHUNK_THRESHOLD: usize = 3000;
/// Number of lines mapped between two yields.
pub const CHUNK_SIZE: usize = 600;

/// Host capability to suspend the current task and resume it later.
#[async_trait]
pub trait Scheduler: Send + Sync {
  async fn yield_now(&self);
}

/// Resumes right away. Counts the yields so tests can observe them.
#[derive(Debug, Default)]
pub struct ImmediateScheduler {
  yields: AtomicUsize,
}

impl ImmediateScheduler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn yields(&self) -> usize {
    self.yields.load(Ordering::Relaxed)
  }
}

#[async_trait]
impl Scheduler for ImmediateScheduler {
  async fn yield_now(&self) {
    self.yields.fetch_add(1, Ordering::Relaxed);
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
  pub threshold:  usize,
  pub chunk_size: usize,
}

impl Default for ChunkPolicy {
  fn default() -> Self {
    Self {
      threshold:  CHUNK_THRESHOLD,
      chunk_size: CHUNK_SIZE,
    }
  }
}

/// Maps every line through `mapper`, yielding after each `chunk_size` lines.
///
/// A yield also follows the final chunk. A `chunk_size` of zero is treated
/// as one.
pub async fn map_lines_chunked<L, F>(
  lines: &[L],
  mapper: &F,
  chunk_size: usize,
  scheduler: &dyn Scheduler,
) -> String
where
  L: AsRef<str> + Sync,
  F: Fn(&str) -> String + Sync + ?Sized,
{
  let mut mapped = Vec::with_capacity(lines.len());
  for chunk in lines.chunks(chunk_size.max(1)) {
    mapped.extend(chunk.iter().map(|line| mapper(line.as_ref())));
    scheduler.yield_now().await;
  }
  join_lines(mapped)
}

/// Applies line-local functions according to a [`ChunkPolicy`].
#[derive(Clone)]
pub struct LineMapper {
  policy:    ChunkPolicy,
  scheduler: Arc<dyn Scheduler>,
}

impl std::fmt::Debug for LineMapper {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LineMapper")
      .field("policy", &self.policy)
      .finish_non_exhaustive()
  }
}

impl LineMapper {
  pub fn new(policy: ChunkPolicy, scheduler: Arc<dyn Scheduler>) -> Self {
    Self { policy, scheduler }
  }

  #[inline]
  pub fn policy(&self) -> ChunkPolicy {
    self.policy
  }

  /// Replaces each line of `text` with `mapper(line)`.
  ///
  /// Returns an immediate output for empty text and for inputs below the
  /// threshold. Larger inputs get a deferred output that runs the chunked
  /// path; nothing is mapped until it is polled.
  pub fn map<F>(&self, text: Arc<str>, mapper: F) -> TransformOutput
  where
    F: Fn(&str) -> String + Send + Sync + 'static,
  {
    let normalized = match normalize(&text) {
      Cow::Borrowed(_) => None,
      Cow::Owned(normalized) => Some(normalized),
    };
    let text = normalized.map_or(text, Arc::from);
    if text.is_empty() {
      return TransformOutput::Immediate(String::new());
    }
    let line_count = text.matches(LINE_FEED).count() + 1;
    if line_count < self.policy.threshold {
      return TransformOutput::Immediate(join_lines(split_lines(&text).into_iter().map(&mapper)));
    }

    log::debug!(
      "mapping {line_count} lines in chunks of {}",
      self.policy.chunk_size
    );
    let chunk_size = self.policy.chunk_size;
    let scheduler = self.scheduler.clone();
    TransformOutput::deferred(async move {
      let lines = split_lines(&text);
      Ok(map_lines_chunked(&lines, &mapper, chunk_size, scheduler.as_ref()).await)
    })
  }
}
