//! Event plumbing shared by the engine's background handlers.

mod debounce;

pub use debounce::{
  AsyncHook,
  Debounce,
  debounce,
  try_send,
};
