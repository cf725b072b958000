use std::{
  collections::VecDeque,
  sync::Arc,
};

/// Default number of snapshots kept on the undo stack.
pub const DEFAULT_CAPACITY: usize = 20;

/// Full-text snapshot of the buffer before a change.
pub type Entry = Arc<str>;

/// Stores the history of changes to a buffer as whole snapshots.
///
/// The undo stack is a sliding window: committing past `capacity` drops the
/// oldest snapshot instead of failing. The redo stack only ever receives
/// entries from [`History::undo`] and is emptied by every forward change, so
/// it never needs its own bound.
///
/// Both stacks are ordered oldest first; the top of a stack is its last
/// element.
#[derive(Debug, Clone)]
pub struct History {
  undo:     VecDeque<Entry>,
  redo:     Vec<Entry>,
  capacity: usize,
}

impl Default for History {
  fn default() -> Self {
    Self::with_capacity(DEFAULT_CAPACITY)
  }
}

impl History {
  /// A capacity of zero is raised to one so a change can always be undone.
  pub fn with_capacity(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self {
      undo: VecDeque::with_capacity(capacity),
      redo: Vec::new(),
      capacity,
    }
  }

  #[inline]
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Records `previous` as the state before a forward change.
  pub fn commit(&mut self, previous: Entry) {
    self.push_undo(previous);
    self.redo.clear();
  }

  /// Steps back: returns the snapshot to restore and remembers `current`
  /// for a later redo.
  pub fn undo(&mut self, current: Entry) -> Option<Entry> {
    let previous = self.undo.pop_back()?;
    self.redo.push(current);
    Some(previous)
  }

  /// Steps forward again after an undo.
  pub fn redo(&mut self, current: Entry) -> Option<Entry> {
    let next = self.redo.pop()?;
    self.push_undo(current);
    Some(next)
  }

  /// Forgets everything, used when the buffer is replaced wholesale.
  pub fn reset(&mut self) {
    self.undo.clear();
    self.redo.clear();
  }

  #[inline]
  pub fn can_undo(&self) -> bool {
    !self.undo.is_empty()
  }

  #[inline]
  pub fn can_redo(&self) -> bool {
    !self.redo.is_empty()
  }

  #[inline]
  pub fn undo_len(&self) -> usize {
    self.undo.len()
  }

  #[inline]
  pub fn redo_len(&self) -> usize {
    self.redo.len()
  }

  pub fn undo_entries(&self) -> impl ExactSizeIterator<Item = &Entry> {
    self.undo.iter()
  }

  pub fn redo_entries(&self) -> impl ExactSizeIterator<Item = &Entry> {
    self.redo.iter()
  }

  fn push_undo(&mut self, entry: Entry) {
    if self.undo.len() == self.capacity {
      self.undo.pop_front();
    }
    self.undo.push_back(entry);
  }
}
