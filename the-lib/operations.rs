//! The catalog of text transformations offered to the user.
//!
//! Line-local operations go through [`LineMapper`] so that large buffers are
//! processed in chunks; operations that need the whole text (sorting,
//! deduplication, plain character removal) run synchronously.

use std::{
  collections::HashSet,
  fmt,
  str::FromStr,
  sync::{
    Arc,
    LazyLock,
  },
};

use regex::Regex;
use the_core::line_ending::{
  join_lines,
  split_lines,
};
use thiserror::Error;

use crate::{
  case_convention,
  chunk::LineMapper,
  engine::{
    self,
    ApplyOutcome,
    Engine,
  },
  transform::TransformOutput,
};

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("valid regex"));
static PLUS_WORD: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(^|\s)\+(\S+)").expect("valid regex"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("valid regex"));

/// Characters removed by [`Operation::RemoveSpecialChars`].
pub const SPECIAL_CHARS: &[char] = &[
  '(', ')', '\\', '~', '!', '@', '#', '$', '%', '^', '&', '*', '_', '+', '=', '[', ']', '{', '}',
  '|', ';', '\'', ':', '"', ',', '/', '<', '>', '?',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
  Ascending,
  Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
  UpperCase,
  LowerCase,
  TitleCase,
  SentenceCase,
  AddPlus,
  RemovePlus,
  WrapInQuotes,
  WrapInBrackets,
  PrefixDash,
  PrefixDashBracket,
  PrefixDashQuote,
  SqueezeSpaces,
  RemoveTabs,
  CutAfterSpaceDash,
  SpacesToUnderscore,
  RemoveSpecialChars,
  SpecialCharsToSpace,
  Sort(SortOrder),
  RemoveDuplicates { case_sensitive: bool },
  FindReplace { find: String, replace: String },
}

/// A titled set of related operations, in display order.
#[derive(Debug)]
pub struct OperationGroup {
  pub title:       &'static str,
  pub description: &'static str,
  pub operations:  &'static [Operation],
}

pub static GROUPS: &[OperationGroup] = &[
  OperationGroup {
    title:       "Case",
    description: "Changes the case of every line or word.",
    operations:  &[
      Operation::UpperCase,
      Operation::LowerCase,
      Operation::TitleCase,
      Operation::SentenceCase,
    ],
  },
  OperationGroup {
    title:       "Symbols and prefixes",
    description: "Wraps or prefixes every line or word.",
    operations:  &[
      Operation::AddPlus,
      Operation::RemovePlus,
      Operation::WrapInQuotes,
      Operation::WrapInBrackets,
      Operation::PrefixDash,
      Operation::PrefixDashBracket,
      Operation::PrefixDashQuote,
    ],
  },
  OperationGroup {
    title:       "Cleanup",
    description: "Trims, removes or replaces common characters.",
    operations:  &[
      Operation::SqueezeSpaces,
      Operation::RemoveTabs,
      Operation::CutAfterSpaceDash,
      Operation::SpacesToUnderscore,
      Operation::RemoveSpecialChars,
      Operation::SpecialCharsToSpace,
    ],
  },
  OperationGroup {
    title:       "Sorting and deduplication",
    description: "Orders and cleans up a list.",
    operations:  &[
      Operation::Sort(SortOrder::Ascending),
      Operation::Sort(SortOrder::Descending),
      Operation::RemoveDuplicates {
        case_sensitive: true,
      },
      Operation::RemoveDuplicates {
        case_sensitive: false,
      },
    ],
  },
];

impl Operation {
  /// Stable identifier used on the command line.
  pub fn id(&self) -> &'static str {
    match self {
      Self::UpperCase => "upper",
      Self::LowerCase => "lower",
      Self::TitleCase => "title",
      Self::SentenceCase => "sentence",
      Self::AddPlus => "add-plus",
      Self::RemovePlus => "remove-plus",
      Self::WrapInQuotes => "quote",
      Self::WrapInBrackets => "bracket",
      Self::PrefixDash => "dash",
      Self::PrefixDashBracket => "dash-bracket",
      Self::PrefixDashQuote => "dash-quote",
      Self::SqueezeSpaces => "squeeze-spaces",
      Self::RemoveTabs => "remove-tabs",
      Self::CutAfterSpaceDash => "cut-after-dash",
      Self::SpacesToUnderscore => "spaces-to-underscore",
      Self::RemoveSpecialChars => "remove-special",
      Self::SpecialCharsToSpace => "special-to-space",
      Self::Sort(SortOrder::Ascending) => "sort-asc",
      Self::Sort(SortOrder::Descending) => "sort-desc",
      Self::RemoveDuplicates {
        case_sensitive: true,
      } => "dedup",
      Self::RemoveDuplicates {
        case_sensitive: false,
      } => "dedup-nocase",
      Self::FindReplace { .. } => "replace",
    }
  }

  /// Human readable label, recorded as the name of the last action.
  pub fn label(&self) -> &'static str {
    match self {
      Self::UpperCase => "Upper case",
      Self::LowerCase => "Lower case",
      Self::TitleCase => "Every Word",
      Self::SentenceCase => "First word",
      Self::AddPlus => "Add +",
      Self::RemovePlus => "Remove +",
      Self::WrapInQuotes => "Wrap in quotes",
      Self::WrapInBrackets => "Wrap in brackets",
      Self::PrefixDash => "Add -",
      Self::PrefixDashBracket => "Add -[]",
      Self::PrefixDashQuote => "Add -\"\"",
      Self::SqueezeSpaces => "Remove extra spaces",
      Self::RemoveTabs => "Remove tabs",
      Self::CutAfterSpaceDash => "Cut after \" -\"",
      Self::SpacesToUnderscore => "Spaces -> _",
      Self::RemoveSpecialChars => "Remove special characters",
      Self::SpecialCharsToSpace => "Special characters -> space",
      Self::Sort(SortOrder::Ascending) => "Sort A-Z",
      Self::Sort(SortOrder::Descending) => "Sort Z-A",
      Self::RemoveDuplicates {
        case_sensitive: true,
      } => "Remove duplicates",
      Self::RemoveDuplicates {
        case_sensitive: false,
      } => "Remove duplicates (ignore case)",
      Self::FindReplace { .. } => "Find and replace",
    }
  }

  /// Runs the operation on `text`.
  pub fn apply(&self, text: Arc<str>, lines: &LineMapper) -> TransformOutput {
    match self {
      Self::UpperCase => lines.map(text, case_convention::to_upper_case),
      Self::LowerCase => lines.map(text, case_convention::to_lower_case),
      Self::TitleCase => lines.map(text, case_convention::to_title_case),
      Self::SentenceCase => lines.map(text, case_convention::to_sentence_case),
      Self::AddPlus => lines.map(text, |line| WORD.replace_all(line, "+$0").into_owned()),
      Self::RemovePlus => lines.map(text, |line| {
        PLUS_WORD.replace_all(line, "${1}${2}").into_owned()
      }),
      Self::WrapInQuotes => lines.map(text, |line| format!("\"{line}\"")),
      Self::WrapInBrackets => lines.map(text, |line| format!("[{line}]")),
      Self::PrefixDash => lines.map(text, |line| format!("-{line}")),
      Self::PrefixDashBracket => lines.map(text, |line| format!("-[{line}]")),
      Self::PrefixDashQuote => lines.map(text, |line| format!("-\"{line}\"")),
      Self::SqueezeSpaces => lines.map(text, |line| SPACES.replace_all(line, " ").trim().to_string()),
      Self::RemoveTabs => text.replace('\t', "").into(),
      Self::CutAfterSpaceDash => lines.map(text, cut_after_space_dash),
      Self::SpacesToUnderscore => text.replace(' ', "_").into(),
      Self::RemoveSpecialChars => text.replace(SPECIAL_CHARS, "").into(),
      Self::SpecialCharsToSpace => text.replace(SPECIAL_CHARS, " ").into(),
      Self::Sort(order) => sort_lines(&text, *order).into(),
      Self::RemoveDuplicates { case_sensitive } => remove_duplicates(&text, *case_sensitive).into(),
      Self::FindReplace { find, replace } => find_replace(&text, find, replace).into(),
    }
  }

  /// Applies the operation through `engine`, labelled with [`Self::label`].
  ///
  /// # Errors
  ///
  /// Propagates [`engine::EngineError`] from a failed transform.
  pub async fn run(&self, engine: &Engine, lines: &LineMapper) -> engine::Result<ApplyOutcome> {
    engine
      .apply_operation(self.label(), |text: Arc<str>| self.apply(text, lines))
      .await
  }

  /// The catalog group listing this operation. Find and replace stands on
  /// its own.
  pub fn group(&self) -> Option<&'static OperationGroup> {
    GROUPS
      .iter()
      .find(|group| group.operations.contains(self))
  }

  /// Every operation with a fixed id, in catalog order.
  pub fn all() -> impl Iterator<Item = &'static Operation> {
    GROUPS.iter().flat_map(|group| group.operations.iter())
  }
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown operation '{0}'")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
  type Err = UnknownOperation;

  /// Parses a catalog id. Find and replace needs its arguments and is built
  /// directly instead.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Operation::all()
      .find(|op| op.id() == s)
      .cloned()
      .ok_or_else(|| UnknownOperation(s.to_string()))
  }
}

/// Drops everything from the first `" -"` on, then trailing whitespace.
fn cut_after_space_dash(line: &str) -> String {
  match line.find(" -") {
    Some(idx) => line[..idx].trim_end().to_string(),
    None => line.to_string(),
  }
}

/// Lowercased comparison key; equal keys keep their input order.
fn sort_key(line: &str) -> String {
  line.to_lowercase()
}

/// Stable sort of the lines, ignoring case. Accents are not folded, so `é`
/// sorts after `z`.
pub fn sort_lines(text: &str, order: SortOrder) -> String {
  let mut lines: Vec<(String, &str)> = split_lines(text)
    .into_iter()
    .map(|line| (sort_key(line), line))
    .collect();
  match order {
    SortOrder::Ascending => lines.sort_by(|a, b| a.0.cmp(&b.0)),
    SortOrder::Descending => lines.sort_by(|a, b| b.0.cmp(&a.0)),
  }
  join_lines(lines.into_iter().map(|(_, line)| line))
}

/// Keeps the first occurrence of every line.
pub fn remove_duplicates(text: &str, case_sensitive: bool) -> String {
  let mut seen = HashSet::new();
  let kept = split_lines(text).into_iter().filter(|line| {
    let key = if case_sensitive {
      (*line).to_string()
    } else {
      line.to_lowercase()
    };
    seen.insert(key)
  });
  join_lines(kept)
}

/// Replaces every non-overlapping occurrence of `find`, left to right.
///
/// The replacement is not rescanned. An empty `find` leaves the text as is.
pub fn find_replace(text: &str, find: &str, replace: &str) -> String {
  if find.is_empty() {
    return text.to_string();
  }
  text.replace(find, replace)
}
