//! Importing and exporting the buffer. The path `-` stands for the standard
//! streams.

use std::{
  io::{
    self,
    Read,
    Write,
  },
  path::Path,
};

use the_core::line_ending::auto_detect_line_ending;

pub const STD_STREAM: &str = "-";

fn is_std_stream(path: &Path) -> bool {
  path.as_os_str() == STD_STREAM
}

/// Reads `path` as text. Invalid UTF-8 sequences are replaced, never
/// rejected.
pub fn import(path: &Path) -> io::Result<String> {
  let mut bytes = Vec::new();
  if is_std_stream(path) {
    io::stdin().lock().read_to_end(&mut bytes)?;
  } else {
    std::fs::File::open(path)?.read_to_end(&mut bytes)?;
  }
  let text = decode_lossy(bytes);
  if let Some(ending) = auto_detect_line_ending(&text) {
    log::debug!("imported {} bytes with {ending:?} line endings", text.len());
  }
  Ok(text)
}

fn decode_lossy(bytes: Vec<u8>) -> String {
  match String::from_utf8(bytes) {
    Ok(text) => text,
    Err(err) => {
      log::debug!("import contains invalid UTF-8, replacing it");
      String::from_utf8_lossy(err.as_bytes()).into_owned()
    },
  }
}

/// Writes `text` verbatim to `path`.
pub fn export(path: &Path, text: &str) -> io::Result<()> {
  if is_std_stream(path) {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    return stdout.flush();
  }
  std::fs::write(path, text)
}
