use std::borrow::Cow;

/// The canonical line break stored in every buffer.
pub const LINE_FEED: char = '\n';

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum LineEnding {
  /// CarriageReturn followed by LineFeed.
  Crlf,

  /// U+000A -- LineFeed
  LF,

  /// U+000D -- CarriageReturn
  CR,
}

impl LineEnding {
  #[inline]
  pub const fn as_str(&self) -> &'static str {
    match self {
      Self::Crlf => "\u{000D}\u{000A}",
      Self::LF => "\u{000A}",
      Self::CR => "\u{000D}",
    }
  }

  // Normally we'd want to implement the FromStr trait, but in this case
  // that would force us into a different return type than from_char.
  #[allow(clippy::should_implement_trait)]
  #[inline]
  pub fn from_str(g: &str) -> Option<LineEnding> {
    match g {
      "\u{000D}\u{000A}" => Some(LineEnding::Crlf),
      "\u{000A}" => Some(LineEnding::LF),
      "\u{000D}" => Some(LineEnding::CR),
      _ => None,
    }
  }

  #[inline]
  pub const fn from_char(ch: char) -> Option<LineEnding> {
    match ch {
      '\u{000A}' => Some(LineEnding::LF),
      '\u{000D}' => Some(LineEnding::CR),
      _ => None,
    }
  }
}

/// Rewrites every `\r\n` and bare `\r` to `\n`.
///
/// Borrows the input when it contains no carriage return, which is the
/// common case for text that already went through this function.
pub fn normalize(text: &str) -> Cow<'_, str> {
  let Some(first_cr) = text.find('\r') else {
    return Cow::Borrowed(text);
  };

  let mut out = String::with_capacity(text.len());
  out.push_str(&text[..first_cr]);

  let mut chars = text[first_cr..].chars().peekable();
  while let Some(ch) = chars.next() {
    if ch == '\r' {
      if chars.peek() == Some(&LINE_FEED) {
        chars.next();
      }
      out.push(LINE_FEED);
    } else {
      out.push(ch);
    }
  }

  Cow::Owned(out)
}

/// Splits already normalized text into lines.
///
/// Empty input has no lines at all, which is different from a single empty
/// line; a trailing line feed produces a trailing empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
  if text.is_empty() {
    return Vec::new();
  }
  text.split(LINE_FEED).collect()
}

/// Normalizes raw text and returns its lines as owned strings.
pub fn split_normalized(text: &str) -> Vec<String> {
  split_lines(&normalize(text))
    .into_iter()
    .map(str::to_owned)
    .collect()
}

pub fn join_lines<I>(lines: I) -> String
where
  I: IntoIterator,
  I::Item: AsRef<str>,
{
  let mut out = String::new();
  for (idx, line) in lines.into_iter().enumerate() {
    if idx > 0 {
      out.push(LINE_FEED);
    }
    out.push_str(line.as_ref());
  }
  out
}

/// Attempts to detect what line ending the passed text uses.
///
/// Only the first line break is inspected.
pub fn auto_detect_line_ending(text: &str) -> Option<LineEnding> {
  let idx = text.find(['\r', '\n'])?;
  let rest = &text[idx..];
  if rest.starts_with(LineEnding::Crlf.as_str()) {
    Some(LineEnding::Crlf)
  } else {
    rest.chars().next().and_then(LineEnding::from_char)
  }
}
