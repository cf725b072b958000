//! Host side implementations of the ports defined in `the-lib`.

pub mod clipboard;
pub mod io;
pub mod scheduler;
pub mod storage;

pub use clipboard::{
  OsClipboard,
  detect_all,
};
pub use scheduler::TokioScheduler;
pub use storage::FileStorage;
