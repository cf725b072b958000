//! Line and character counts derived from the buffer.
//!
//! Counting is linear in the buffer size, so the projector only recomputes
//! once edits have settled for a quiet period.

use std::{
  sync::Arc,
  time::Duration,
};

use arc_swap::ArcSwap;
use the_core::line_ending::split_lines;

use crate::engine::Engine;

/// Quiet period before metrics are recomputed.
pub const METRICS_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextMetrics {
  pub line_count:       usize,
  /// Lines that are blank once surrounding whitespace is trimmed.
  pub empty_line_count: usize,
  pub char_count:       usize,
}

impl TextMetrics {
  pub fn compute(text: &str) -> Self {
    let lines = split_lines(text);
    Self {
      line_count:       lines.len(),
      empty_line_count: lines.iter().filter(|line| line.trim().is_empty()).count(),
      char_count:       text.chars().count(),
    }
  }
}

/// Debounced [`TextMetrics`] of an engine's buffer.
#[derive(Debug, Clone)]
pub struct MetricsProjector {
  current: Arc<ArcSwap<TextMetrics>>,
}

impl MetricsProjector {
  /// Computes the initial metrics right away, then keeps them up to date
  /// `delay` after the last change.
  pub fn spawn(engine: Engine, delay: Duration) -> Self {
    let current = Arc::new(ArcSwap::from_pointee(TextMetrics::compute(&engine.text())));
    let trigger = the_transformer_event::debounce(delay, {
      let current = current.clone();
      let engine = engine.downgrade();
      // read the text when the window closes, not when the change happened
      move || {
        if let Some(engine) = engine.upgrade() {
          current.store(Arc::new(TextMetrics::compute(&engine.text())));
        }
      }
    });
    engine.subscribe(trigger);
    Self { current }
  }

  pub fn metrics(&self) -> TextMetrics {
    **self.current.load()
  }
}

#[cfg(test)]
mod test {
  use futures_executor::block_on;

  use super::*;
  use crate::{
    engine::EngineConfig,
    transform::TransformOutput,
  };

  #[test]
  fn counts_lines_blanks_and_chars() {
    assert_eq!(TextMetrics::compute(""), TextMetrics::default());
    assert_eq!(
      TextMetrics::compute("a\n\n  \nbc"),
      TextMetrics {
        line_count:       4,
        empty_line_count: 2,
        char_count:       8,
      }
    );
    // trailing newline adds an empty line
    assert_eq!(TextMetrics::compute("x\n").line_count, 2);
    assert_eq!(TextMetrics::compute("ї\tй").char_count, 3);
  }

  #[test]
  fn initial_metrics_are_available_immediately() {
    let engine = Engine::new("one\ntwo", EngineConfig::default());
    let projector = MetricsProjector::spawn(engine, METRICS_DELAY);
    assert_eq!(projector.metrics().line_count, 2);
  }

  #[tokio::test(start_paused = true)]
  async fn reads_text_at_end_of_window() {
    let engine = Engine::new("", EngineConfig::default());
    let projector = MetricsProjector::spawn(engine.clone(), METRICS_DELAY);

    // the hook does not run until we yield, so its channel fills up and the
    // later changes never reach it
    for newlines in 1..300 {
      engine.set_text_manual(&"\n".repeat(newlines));
    }
    tokio::time::sleep(METRICS_DELAY * 2).await;
    assert_eq!(projector.metrics(), TextMetrics::compute(&engine.text()));
    assert_eq!(projector.metrics().line_count, 300);
  }

  #[tokio::test(start_paused = true)]
  async fn engine_is_freed_once_handles_are_dropped() {
    let engine = Engine::new("big buffer", EngineConfig::default());
    let weak = engine.downgrade();
    let projector = MetricsProjector::spawn(engine.clone(), METRICS_DELAY);

    engine.set_text_manual("pending change");
    drop(projector);
    drop(engine);
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(weak.upgrade().is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn recomputes_only_after_quiet_period() {
    let engine = Engine::new("", EngineConfig::default());
    let projector = MetricsProjector::spawn(engine.clone(), METRICS_DELAY);

    engine.set_text_manual("a");
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.set_text_manual("a\nb");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(projector.metrics(), TextMetrics::default());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(projector.metrics().line_count, 2);
    assert_eq!(projector.metrics().char_count, 3);
  }

  #[tokio::test(start_paused = true)]
  async fn follows_undo_and_operations() {
    let engine = Engine::new("a", EngineConfig::default());
    let projector = MetricsProjector::spawn(engine.clone(), METRICS_DELAY);

    engine
      .apply_operation("triple", |text: Arc<str>| {
        TransformOutput::from(format!("{text}\n{text}\n{text}"))
      })
      .await
      .unwrap();
    tokio::time::sleep(METRICS_DELAY * 2).await;
    assert_eq!(projector.metrics().line_count, 3);

    assert!(engine.undo());
    tokio::time::sleep(METRICS_DELAY * 2).await;
    assert_eq!(projector.metrics().line_count, 1);
  }

  #[test]
  fn metrics_without_runtime_stay_at_initial_value() {
    let engine = Engine::new("x", EngineConfig::default());
    let projector = MetricsProjector::spawn(engine.clone(), METRICS_DELAY);
    block_on(engine.apply_operation("grow", |text: Arc<str>| {
      TransformOutput::from(format!("{text}\ny"))
    }))
    .unwrap();
    assert_eq!(projector.metrics().line_count, 1);
  }
}
