pub mod case_convention;
pub mod chunk;
pub mod clipboard;
pub mod engine;
pub mod handlers;
pub mod history;
pub mod metrics;
pub mod operations;
pub mod storage;
pub mod transform;

pub use engine::{
  ApplyOutcome,
  Engine,
  EngineConfig,
};
pub use operations::Operation;
