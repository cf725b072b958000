pub mod line_ending;

pub use line_ending::{
  LINE_FEED,
  LineEnding,
  join_lines,
  normalize,
  split_lines,
  split_normalized,
};
