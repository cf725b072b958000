//! The history engine: owner of the authoritative text.
//!
//! [`Engine`] is a cheap handle; clones share one buffer, one history and one
//! busy flag. Every mutation goes through its methods, which keeps three
//! rules in a single place:
//!
//! - at most one transformation is in flight per engine (single-flight);
//! - the result of a transformation, its history entry and the busy flag are
//!   published together, so nobody observes an idle engine with a
//!   half-applied change;
//! - a failing or panicking transformation leaves buffer and history as they
//!   were.

use std::{
  sync::{
    Arc,
    Weak,
  },
  time::{
    Duration,
    Instant,
    SystemTime,
  },
};

use parking_lot::Mutex;
use the_core::line_ending::normalize;
use the_transformer_event::try_send;
use thiserror::Error;
use tokio::sync::mpsc::Sender;

use crate::{
  history::{
    self,
    History,
  },
  storage::{
    STORAGE_KEY,
    Storage,
  },
  transform::{
    self,
    Transform,
    TransformError,
  },
};

pub const UNDO_LABEL: &str = "undo";
pub const REDO_LABEL: &str = "redo";
pub const CLEAR_LABEL: &str = "clear";

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("operation '{label}' failed: {source}")]
  Transform {
    label:  String,
    #[source]
    source: TransformError,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
  pub history_capacity: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      history_capacity: history::DEFAULT_CAPACITY,
    }
  }
}

/// What happened to a call to [`Engine::apply_operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
  /// The transformation produced new text, which is now current.
  Applied,
  /// The transformation returned its input; history is untouched.
  Unchanged,
  /// Another transformation was in flight, nothing ran.
  Rejected,
}

/// Observational metadata about the most recent action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationRecord {
  pub label:          Option<String>,
  pub duration:       Option<Duration>,
  pub last_change_at: Option<SystemTime>,
}

/// A consistent view of the engine taken under one lock.
#[derive(Debug, Clone)]
pub struct Snapshot {
  pub text:     Arc<str>,
  pub busy:     bool,
  pub can_undo: bool,
  pub can_redo: bool,
  pub undo_len: usize,
  pub redo_len: usize,
  pub record:   OperationRecord,
}

#[derive(Debug)]
struct State {
  text:      Arc<str>,
  history:   History,
  busy:      bool,
  record:    OperationRecord,
  listeners: Vec<Sender<()>>,
}

impl State {
  fn touch(&mut self) {
    self.record.last_change_at = Some(SystemTime::now());
    self.listeners.retain(|tx| !tx.is_closed());
    for tx in &self.listeners {
      // a full channel already holds a pending notification
      try_send(tx, ());
    }
  }

  fn step(&mut self, label: &str) {
    self.record.label = Some(label.to_string());
    self.touch();
  }
}

#[derive(Debug, Clone)]
pub struct Engine {
  state: Arc<Mutex<State>>,
}

/// A handle that does not keep the buffer alive.
///
/// Background hooks hold one of these so that dropping the last [`Engine`]
/// frees the state and closes their channels.
#[derive(Debug, Clone)]
pub struct WeakEngine {
  state: Weak<Mutex<State>>,
}

impl WeakEngine {
  pub fn upgrade(&self) -> Option<Engine> {
    self.state.upgrade().map(|state| Engine { state })
  }
}

/// Clears the busy flag if an in-flight operation is dropped early.
struct BusyGuard<'a> {
  state: &'a Mutex<State>,
  armed: bool,
}

impl Drop for BusyGuard<'_> {
  fn drop(&mut self) {
    if self.armed {
      self.state.lock().busy = false;
    }
  }
}

impl Engine {
  pub fn new(initial: &str, config: EngineConfig) -> Self {
    Self {
      state: Arc::new(Mutex::new(State {
        text:      Arc::from(normalize(initial)),
        history:   History::with_capacity(config.history_capacity),
        busy:      false,
        record:    OperationRecord::default(),
        listeners: Vec::new(),
      })),
    }
  }

  /// Creates an engine from the persisted buffer, or from `initial` when
  /// nothing usable was stored.
  pub fn restore(storage: &dyn Storage, initial: &str, config: EngineConfig) -> Self {
    let text = match storage.load(STORAGE_KEY) {
      Ok(Some(stored)) => stored,
      Ok(None) => initial.to_string(),
      Err(err) => {
        log::debug!("could not restore persisted text, using initial value: {err}");
        initial.to_string()
      },
    };
    Self::new(&text, config)
  }

  pub fn downgrade(&self) -> WeakEngine {
    WeakEngine {
      state: Arc::downgrade(&self.state),
    }
  }

  /// Registers a channel that receives `()` after every content change.
  pub fn subscribe(&self, listener: Sender<()>) {
    self.state.lock().listeners.push(listener);
  }

  pub fn text(&self) -> Arc<str> {
    self.state.lock().text.clone()
  }

  pub fn is_busy(&self) -> bool {
    self.state.lock().busy
  }

  pub fn can_undo(&self) -> bool {
    let state = self.state.lock();
    !state.busy && state.history.can_undo()
  }

  pub fn can_redo(&self) -> bool {
    let state = self.state.lock();
    !state.busy && state.history.can_redo()
  }

  pub fn undo_len(&self) -> usize {
    self.state.lock().history.undo_len()
  }

  pub fn redo_len(&self) -> usize {
    self.state.lock().history.redo_len()
  }

  /// Undo entries oldest first.
  pub fn undo_entries(&self) -> Vec<Arc<str>> {
    self.state.lock().history.undo_entries().cloned().collect()
  }

  /// Redo entries oldest first; the last one is restored by the next redo.
  pub fn redo_entries(&self) -> Vec<Arc<str>> {
    self.state.lock().history.redo_entries().cloned().collect()
  }

  pub fn record(&self) -> OperationRecord {
    self.state.lock().record.clone()
  }

  pub fn snapshot(&self) -> Snapshot {
    let state = self.state.lock();
    Snapshot {
      text:     state.text.clone(),
      busy:     state.busy,
      can_undo: !state.busy && state.history.can_undo(),
      can_redo: !state.busy && state.history.can_redo(),
      undo_len: state.history.undo_len(),
      redo_len: state.history.redo_len(),
      record:   state.record.clone(),
    }
  }

  /// Runs `transform` on the current text and commits its result.
  ///
  /// Returns [`ApplyOutcome::Rejected`] without running anything while
  /// another operation is in flight. When the result differs from the input
  /// the input is pushed onto the undo stack and the redo stack is cleared.
  /// The label and duration are recorded for every completed run, changed or
  /// not.
  ///
  /// # Errors
  ///
  /// A transform that fails or panics yields [`EngineError::Transform`];
  /// buffer, history and record are left as they were.
  pub async fn apply_operation<F>(&self, label: impl Into<String>, transform: F) -> Result<ApplyOutcome>
  where
    F: Transform,
  {
    let label = label.into();
    let current = {
      let mut state = self.state.lock();
      if state.busy {
        log::debug!("rejecting '{label}': another operation is in flight");
        return Ok(ApplyOutcome::Rejected);
      }
      state.busy = true;
      state.text.clone()
    };
    let mut guard = BusyGuard {
      state: &self.state,
      armed: true,
    };

    let start = Instant::now();
    let result = transform::invoke(transform, current.clone()).resolve().await;
    let duration = start.elapsed();

    let mut state = self.state.lock();
    state.busy = false;
    guard.armed = false;

    let mut next = match result {
      Ok(next) => next,
      Err(source) => {
        log::warn!("operation '{label}' failed after {duration:?}: {source}");
        return Err(EngineError::Transform { label, source });
      },
    };
    if next.contains('\r') {
      next = normalize(&next).into_owned();
    }

    let outcome = if *next != *current {
      state.history.commit(current);
      state.text = Arc::from(next);
      state.touch();
      ApplyOutcome::Applied
    } else {
      ApplyOutcome::Unchanged
    };
    log::info!("operation '{label}' finished in {duration:?} ({outcome:?})");
    state.record.label = Some(label);
    state.record.duration = Some(duration);

    Ok(outcome)
  }

  /// Restores the most recent undo entry. Returns whether anything changed.
  pub fn undo(&self) -> bool {
    let mut state = self.state.lock();
    if state.busy {
      return false;
    }
    let current = state.text.clone();
    let Some(previous) = state.history.undo(current) else {
      return false;
    };
    state.text = previous;
    state.step(UNDO_LABEL);
    true
  }

  /// Re-applies the most recently undone change.
  pub fn redo(&self) -> bool {
    let mut state = self.state.lock();
    if state.busy {
      return false;
    }
    let current = state.text.clone();
    let Some(next) = state.history.redo(current) else {
      return false;
    };
    state.text = next;
    state.step(REDO_LABEL);
    true
  }

  /// Replaces the buffer with `value` and forgets all history.
  ///
  /// This is the path for typing and for imports. Rejected while an
  /// operation is in flight.
  pub fn set_text_manual(&self, value: &str) -> bool {
    let mut state = self.state.lock();
    if state.busy {
      log::debug!("rejecting manual edit: an operation is in flight");
      return false;
    }
    state.text = Arc::from(normalize(value));
    state.history.reset();
    state.record.label = None;
    state.record.duration = None;
    state.touch();
    true
  }

  /// Empties the buffer as an undoable change.
  pub fn clear_all(&self) -> bool {
    let mut state = self.state.lock();
    if state.busy || state.text.is_empty() {
      return false;
    }
    let current = std::mem::replace(&mut state.text, Arc::from(""));
    state.history.commit(current);
    state.step(CLEAR_LABEL);
    true
  }
}

#[cfg(test)]
mod test {
  use futures_executor::block_on;
  use tokio::sync::{
    mpsc,
    oneshot,
  };

  use super::*;
  use crate::{
    storage::{
      MemoryStorage,
      StorageError,
    },
    transform::TransformOutput,
  };

  fn engine(text: &str) -> Engine {
    Engine::new(text, EngineConfig::default())
  }

  fn apply(engine: &Engine, label: &str, f: fn(&str) -> String) -> Result<ApplyOutcome> {
    block_on(engine.apply_operation(label, move |text: Arc<str>| TransformOutput::from(f(&text))))
  }

  fn sort_lines(text: &str) -> String {
    let mut lines: Vec<_> = text.split('\n').collect();
    lines.sort_unstable();
    lines.join("\n")
  }

  fn stack(entries: Vec<Arc<str>>) -> Vec<String> {
    entries.iter().map(|e| e.to_string()).collect()
  }

  #[test]
  fn sort_then_undo_then_redo() {
    let engine = engine("b\na\nc");
    assert_eq!(apply(&engine, "sort", sort_lines).unwrap(), ApplyOutcome::Applied);
    assert_eq!(&*engine.text(), "a\nb\nc");
    assert_eq!(stack(engine.undo_entries()), ["b\na\nc"]);
    assert_eq!(engine.redo_len(), 0);

    assert!(engine.undo());
    assert_eq!(&*engine.text(), "b\na\nc");
    assert_eq!(stack(engine.redo_entries()), ["a\nb\nc"]);
    assert_eq!(engine.record().label.as_deref(), Some(UNDO_LABEL));

    assert!(engine.redo());
    assert_eq!(&*engine.text(), "a\nb\nc");
    assert_eq!(engine.record().label.as_deref(), Some(REDO_LABEL));
    assert_eq!(engine.redo_len(), 0);
    assert_eq!(engine.undo_len(), 1);
  }

  #[test]
  fn unchanged_result_leaves_history_alone() {
    let engine = engine("same");
    assert_eq!(
      apply(&engine, "identity", |t| t.to_string()).unwrap(),
      ApplyOutcome::Unchanged
    );
    assert_eq!(engine.undo_len(), 0);
    assert_eq!(engine.redo_len(), 0);

    let record = engine.record();
    assert_eq!(record.label.as_deref(), Some("identity"));
    assert!(record.duration.is_some());
    assert_eq!(record.last_change_at, None);
  }

  #[test]
  fn apply_clears_redo() {
    let engine = engine("x");
    apply(&engine, "a", |t| format!("{t}a")).unwrap();
    assert!(engine.undo());
    assert!(engine.can_redo());

    apply(&engine, "b", |t| format!("{t}b")).unwrap();
    assert_eq!(&*engine.text(), "xb");
    assert!(!engine.can_redo());
    assert_eq!(stack(engine.undo_entries()), ["x"]);
  }

  #[test]
  fn undo_stack_never_exceeds_capacity() {
    let engine = engine("");
    for _ in 0..45 {
      apply(&engine, "grow", |t| format!("{t}+")).unwrap();
      assert!(engine.undo_len() <= history::DEFAULT_CAPACITY);
    }
    assert_eq!(engine.undo_len(), history::DEFAULT_CAPACITY);
    // the oldest snapshots were evicted
    assert_eq!(&*engine.undo_entries()[0], "+".repeat(25));
  }

  #[test]
  fn configured_capacity_is_used() {
    let engine = Engine::new("", EngineConfig { history_capacity: 3 });
    for _ in 0..10 {
      apply(&engine, "grow", |t| format!("{t}+")).unwrap();
    }
    assert_eq!(engine.undo_len(), 3);
  }

  #[test]
  fn manual_set_resets_history() {
    let engine = engine("one");
    apply(&engine, "a", |t| format!("{t}a")).unwrap();
    apply(&engine, "b", |t| format!("{t}b")).unwrap();
    assert!(engine.undo());
    assert!(engine.can_undo() && engine.can_redo());

    assert!(engine.set_text_manual("typed\r\nby hand"));
    assert_eq!(&*engine.text(), "typed\nby hand");
    assert_eq!(engine.undo_len(), 0);
    assert_eq!(engine.redo_len(), 0);

    let record = engine.record();
    assert_eq!(record.label, None);
    assert_eq!(record.duration, None);
    assert!(record.last_change_at.is_some());
  }

  #[test]
  fn clear_is_undoable() {
    let engine = engine("content");
    assert!(engine.clear_all());
    assert_eq!(&*engine.text(), "");
    assert_eq!(engine.record().label.as_deref(), Some(CLEAR_LABEL));
    // clearing an empty buffer does nothing
    assert!(!engine.clear_all());
    assert_eq!(engine.undo_len(), 1);

    assert!(engine.undo());
    assert_eq!(&*engine.text(), "content");
  }

  #[test]
  fn clear_drops_redo() {
    let engine = engine("a");
    apply(&engine, "b", |_| "b".to_string()).unwrap();
    assert!(engine.undo());
    assert!(engine.clear_all());
    assert_eq!(engine.redo_len(), 0);
    assert_eq!(stack(engine.undo_entries()), ["a"]);
  }

  #[test]
  fn weak_handle_does_not_outlive_engine() {
    let engine = engine("text");
    let weak = engine.downgrade();
    let (tx, mut rx) = mpsc::channel(1);
    engine.subscribe(tx);

    assert_eq!(weak.upgrade().map(|e| e.text()).as_deref(), Some("text"));
    drop(engine);
    assert!(weak.upgrade().is_none());
    // dropping the state closes every listener
    assert!(matches!(
      rx.try_recv(),
      Err(mpsc::error::TryRecvError::Disconnected)
    ));
  }

  #[test]
  fn undo_and_redo_on_empty_stacks_are_no_ops() {
    let engine = engine("text");
    assert!(!engine.undo());
    assert!(!engine.redo());
    assert_eq!(engine.record(), OperationRecord::default());
  }

  #[test]
  fn failing_transform_changes_nothing() {
    let engine = engine("keep");
    apply(&engine, "ok", |t| format!("{t}!")).unwrap();
    let before = engine.record();

    let err = block_on(engine.apply_operation("broken", |_text: Arc<str>| {
      TransformOutput::failed(TransformError::Failed("bad input".into()))
    }))
    .unwrap_err();
    assert!(matches!(err, EngineError::Transform { ref label, .. } if label == "broken"));

    assert!(!engine.is_busy());
    assert_eq!(&*engine.text(), "keep!");
    assert_eq!(stack(engine.undo_entries()), ["keep"]);
    assert_eq!(engine.record(), before);
  }

  #[test]
  fn panicking_transform_changes_nothing() {
    let engine = engine("keep");
    let err = block_on(engine.apply_operation("panics", |_text: Arc<str>| -> TransformOutput {
      panic!("transform exploded")
    }))
    .unwrap_err();
    let EngineError::Transform { source, .. } = err;
    assert_eq!(source, TransformError::Panicked("transform exploded".into()));
    assert!(!engine.is_busy());
    assert_eq!(&*engine.text(), "keep");
    assert_eq!(engine.undo_len(), 0);
  }

  #[test]
  fn transform_results_are_normalized() {
    let engine = engine("a b");
    apply(&engine, "crlf", |t| t.replace(' ', "\r\n")).unwrap();
    assert_eq!(&*engine.text(), "a\nb");
  }

  #[test]
  fn initial_text_is_normalized() {
    assert_eq!(&*engine("a\r\nb\rc").text(), "a\nb\nc");
  }

  #[test]
  fn restore_prefers_stored_text() {
    let storage = MemoryStorage::default();
    storage.save(STORAGE_KEY, "saved\r\ntext").unwrap();
    let engine = Engine::restore(&storage, "initial", EngineConfig::default());
    assert_eq!(&*engine.text(), "saved\ntext");
  }

  #[test]
  fn restore_falls_back_to_initial() {
    let empty = MemoryStorage::default();
    let engine = Engine::restore(&empty, "initial", EngineConfig::default());
    assert_eq!(&*engine.text(), "initial");

    struct Broken;
    impl Storage for Broken {
      fn load(&self, _key: &str) -> std::result::Result<Option<String>, StorageError> {
        Err(StorageError::Corrupt("not utf-8".into()))
      }

      fn save(&self, _key: &str, _value: &str) -> std::result::Result<(), StorageError> {
        Err(StorageError::Unavailable("read only".into()))
      }
    }
    let engine = Engine::restore(&Broken, "fallback", EngineConfig::default());
    assert_eq!(&*engine.text(), "fallback");
  }

  #[test]
  fn listeners_hear_every_change() {
    let engine = engine("a");
    let (tx, mut rx) = mpsc::channel(16);
    engine.subscribe(tx);

    apply(&engine, "same", |t| t.to_string()).unwrap();
    assert!(rx.try_recv().is_err());

    apply(&engine, "b", |_| "b".to_string()).unwrap();
    engine.undo();
    engine.redo();
    engine.clear_all();
    engine.set_text_manual("typed");
    let mut count = 0;
    while rx.try_recv().is_ok() {
      count += 1;
    }
    assert_eq!(count, 5);
  }

  #[test]
  fn closed_listeners_are_pruned() {
    let engine = engine("a");
    let (tx, rx) = mpsc::channel(1);
    engine.subscribe(tx);
    drop(rx);
    assert!(engine.set_text_manual("b"));
    assert!(engine.state.lock().listeners.is_empty());
  }

  #[tokio::test]
  async fn busy_engine_rejects_everything() {
    let engine = engine("a");
    let (release, wait) = oneshot::channel::<()>();

    let running = tokio::spawn({
      let engine = engine.clone();
      async move {
        engine
          .apply_operation("slow", move |text: Arc<str>| {
            TransformOutput::deferred(async move {
              let _ = wait.await;
              Ok(format!("{text}!"))
            })
          })
          .await
      }
    });
    while !engine.is_busy() {
      tokio::task::yield_now().await;
    }

    let rejected = engine
      .apply_operation("fast", |_text: Arc<str>| TransformOutput::from("b"))
      .await
      .unwrap();
    assert_eq!(rejected, ApplyOutcome::Rejected);
    assert!(!engine.undo());
    assert!(!engine.redo());
    assert!(!engine.clear_all());
    assert!(!engine.set_text_manual("typed"));
    assert!(!engine.can_undo());
    assert!(engine.snapshot().busy);
    assert_eq!(&*engine.text(), "a");

    release.send(()).unwrap();
    assert_eq!(running.await.unwrap().unwrap(), ApplyOutcome::Applied);
    assert!(!engine.is_busy());
    assert_eq!(&*engine.text(), "a!");
    assert_eq!(engine.record().label.as_deref(), Some("slow"));
    assert!(engine.can_undo());
  }

  #[tokio::test]
  async fn dropping_in_flight_operation_clears_busy() {
    let engine = engine("a");
    let (_release, wait) = oneshot::channel::<()>();
    let pending = engine.apply_operation("never", move |_text: Arc<str>| {
      TransformOutput::deferred(async move {
        let _ = wait.await;
        Ok("never".to_string())
      })
    });
    let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;
    assert!(timed_out.is_err());
    assert!(!engine.is_busy());
    assert_eq!(&*engine.text(), "a");
    assert_eq!(engine.undo_len(), 0);
  }
}
