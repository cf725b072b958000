//! Utilities for declaring an async (usually debounced) hook

use std::time::Duration;

use tokio::{
  sync::mpsc::{
    self,
    Sender,
    error::TrySendError,
  },
  time::Instant,
};

/// Channel capacity of a spawned hook. Rapid edits only need one pending
/// event to keep the debounce window open, so overflow is harmless.
const CHANNEL_CAPACITY: usize = 128;

/// Async hooks provide a convenient framework for implementing (debounced)
/// async event handlers. Most synchronous event hooks will likely need to
/// debounce their events, coordinate multiple different hooks and potentially
/// track some state. `AsyncHooks` facilitate these use cases by running as
/// a background tokio task that waits for events (usually an enum) to be
/// sent through a channel.
pub trait AsyncHook: Sync + Send + 'static + Sized {
  type Event: Sync + Send + 'static;
  /// Called immediately whenever an event is received, this function can
  /// consume the event immediately or debounce it. In case of debouncing,
  /// it can either define a new debounce timeout or continue the current one
  fn handle_event(&mut self, event: Self::Event, timeout: Option<Instant>) -> Option<Instant>;

  /// Called whenever the debounce timeline is reached
  fn finish_debounce(&mut self);

  fn spawn(self) -> mpsc::Sender<Self::Event> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    // only spawn worker if we are inside runtime to avoid having to spawn a runtime
    // for unrelated unit tests
    if tokio::runtime::Handle::try_current().is_ok() {
      tokio::spawn(run(self, rx));
    }
    tx
  }
}

async fn run<Hook: AsyncHook>(mut hook: Hook, mut rx: mpsc::Receiver<Hook::Event>) {
  let mut deadline = None;
  loop {
    let event = match deadline {
      Some(deadline_) => {
        let res = tokio::time::timeout_at(deadline_, rx.recv()).await;
        match res {
          Ok(event) => event,
          Err(_) => {
            hook.finish_debounce();
            deadline = None;
            continue;
          },
        }
      },
      None => rx.recv().await,
    };
    let Some(event) = event else {
      break;
    };
    deadline = hook.handle_event(event, deadline);
  }
}

/// A hook that runs `action` once no event arrived for `delay`.
///
/// Every event restarts the window, so a burst of events produces a single
/// call after the burst settles.
pub struct Debounce<F> {
  delay:  Duration,
  action: F,
}

impl<F> Debounce<F>
where
  F: FnMut() + Send + Sync + 'static,
{
  pub fn new(delay: Duration, action: F) -> Self {
    Self { delay, action }
  }
}

impl<F> AsyncHook for Debounce<F>
where
  F: FnMut() + Send + Sync + 'static,
{
  type Event = ();

  fn handle_event(&mut self, _event: Self::Event, _timeout: Option<Instant>) -> Option<Instant> {
    Some(Instant::now() + self.delay)
  }

  fn finish_debounce(&mut self) {
    (self.action)();
  }
}

/// Spawns a [`Debounce`] hook and returns the sender that triggers it.
pub fn debounce<F>(delay: Duration, action: F) -> Sender<()>
where
  F: FnMut() + Send + Sync + 'static,
{
  Debounce::new(delay, action).spawn()
}

/// Try to send an event without blocking at all.
///
/// Returns false if the channel was full or closed. A closed channel is
/// logged since it means the hook task is gone.
pub fn try_send<T>(tx: &Sender<T>, data: T) -> bool {
  match tx.try_send(data) {
    Ok(()) => true,
    Err(TrySendError::Full(_)) => false,
    Err(TrySendError::Closed(_)) => {
      log::warn!("Attempted to send to closed channel");
      false
    },
  }
}
