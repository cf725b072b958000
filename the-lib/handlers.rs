use std::{
  sync::Arc,
  time::Duration,
};

use crate::{
  engine::Engine,
  metrics::{
    METRICS_DELAY,
    MetricsProjector,
    TextMetrics,
  },
  storage::{
    Persister,
    SAVE_DELAY,
    Storage,
  },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerConfig {
  pub metrics_delay: Duration,
  pub save_delay:    Duration,
}

impl Default for HandlerConfig {
  fn default() -> Self {
    Self {
      metrics_delay: METRICS_DELAY,
      save_delay:    SAVE_DELAY,
    }
  }
}

/// Background reactions to content changes of one engine.
#[derive(Debug)]
pub struct Handlers {
  pub metrics:   MetricsProjector,
  pub persister: Option<Persister>,
}

impl Handlers {
  /// Wires the metrics projector and, when `storage` is given, the persister
  /// to `engine`. Must be called inside a tokio runtime for the debounced
  /// work to run.
  pub fn spawn(engine: &Engine, storage: Option<Arc<dyn Storage>>, config: HandlerConfig) -> Self {
    let metrics = MetricsProjector::spawn(engine.clone(), config.metrics_delay);
    let persister =
      storage.map(|storage| Persister::spawn(engine.clone(), storage, config.save_delay));
    Self { metrics, persister }
  }

  pub fn metrics(&self) -> TextMetrics {
    self.metrics.metrics()
  }

  /// Writes pending content out now. Called before exit.
  pub fn flush(&self) {
    if let Some(persister) = &self.persister {
      persister.flush();
    }
  }
}
