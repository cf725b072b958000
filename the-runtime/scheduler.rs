use async_trait::async_trait;
use the_lib::chunk::Scheduler;

/// Yields back to the tokio runtime between chunks.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
  async fn yield_now(&self) {
    tokio::task::yield_now().await;
  }
}
