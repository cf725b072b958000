use std::{
  fmt,
  path::PathBuf,
  str::FromStr,
};

use anyhow::{
  Result,
  bail,
};
use clap::{
  ArgAction,
  Parser,
};
use the_lib::{
  engine::{
    CLEAR_LABEL,
    REDO_LABEL,
    UNDO_LABEL,
  },
  operations::{
    Operation,
    UnknownOperation,
  },
};

/// One step of a batch run or one interactive command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  Apply(Operation),
  Undo,
  Redo,
  Clear,
}

impl FromStr for Action {
  type Err = UnknownOperation;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s {
      UNDO_LABEL => Ok(Self::Undo),
      REDO_LABEL => Ok(Self::Redo),
      CLEAR_LABEL => Ok(Self::Clear),
      _ => s.parse().map(Self::Apply),
    }
  }
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Apply(op) => write!(f, "{}", op.id()),
      Self::Undo => f.write_str(UNDO_LABEL),
      Self::Redo => f.write_str(REDO_LABEL),
      Self::Clear => f.write_str(CLEAR_LABEL),
    }
  }
}

#[derive(Clone, Debug)]
pub struct CliOptions {
  pub input:       Option<PathBuf>,
  pub output:      Option<PathBuf>,
  pub actions:     Vec<Action>,
  pub copy:        bool,
  pub stats:       bool,
  pub list:        bool,
  pub interactive: bool,
  pub persist:     bool,
  pub verbosity:   u8,
  pub log_file:    Option<PathBuf>,
  pub config_file: Option<PathBuf>,
}

impl CliOptions {
  pub fn parse() -> Result<Self> {
    let raw = RawCli::parse();
    raw.try_into()
  }
}

#[derive(Parser, Debug)]
#[command(
  name = "the-transformer",
  version,
  about = "Apply line oriented text transformations with undo and redo",
  long_about = None
)]
struct RawCli {
  /// Read the initial text from FILE (`-` for stdin)
  #[arg(short = 'i', long = "input", value_name = "FILE")]
  input: Option<PathBuf>,

  /// Write the result to FILE (`-` for stdout, the default outside
  /// interactive mode)
  #[arg(short = 'o', long = "output", value_name = "FILE")]
  output: Option<PathBuf>,

  /// Text to search for, used by the next `replace` action
  #[arg(long = "find", value_name = "TEXT", action = ArgAction::Append)]
  find: Vec<String>,

  /// Replacement for the matching --find
  #[arg(long = "replace", value_name = "TEXT", action = ArgAction::Append)]
  replace: Vec<String>,

  /// Copy the result to the clipboard
  #[arg(long = "copy")]
  copy: bool,

  /// Print line and character counts and the last action to stderr
  #[arg(long = "stats")]
  stats: bool,

  /// List the available transformations and exit
  #[arg(long = "list")]
  list: bool,

  /// Read commands from stdin, one per line
  #[arg(long = "interactive")]
  interactive: bool,

  /// Do not restore or save the persisted text
  #[arg(long = "no-persist")]
  no_persist: bool,

  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count)]
  verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE")]
  log_file: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE")]
  config_file: Option<PathBuf>,

  /// Transformations to apply in order, plus `undo`, `redo`, `clear` and
  /// `replace`
  #[arg(value_name = "ACTIONS")]
  actions: Vec<String>,
}

impl TryFrom<RawCli> for CliOptions {
  type Error = anyhow::Error;

  fn try_from(raw: RawCli) -> Result<Self> {
    if raw.find.len() != raw.replace.len() {
      bail!(
        "every --find needs a --replace ({} vs {})",
        raw.find.len(),
        raw.replace.len()
      );
    }

    let mut pairs = raw.find.into_iter().zip(raw.replace);
    let mut actions = Vec::with_capacity(raw.actions.len());
    for arg in &raw.actions {
      if arg == "replace" {
        let Some((find, replace)) = pairs.next() else {
          bail!("`replace` action without a --find/--replace pair");
        };
        actions.push(Action::Apply(Operation::FindReplace { find, replace }));
        continue;
      }
      actions.push(arg.parse()?);
    }
    if pairs.next().is_some() {
      bail!("--find/--replace pair without a `replace` action");
    }

    let output = match raw.output {
      Some(output) => Some(output),
      None if !raw.interactive => Some(PathBuf::from("-")),
      None => None,
    };

    Ok(Self {
      input: raw.input,
      output,
      actions,
      copy: raw.copy,
      stats: raw.stats,
      list: raw.list,
      interactive: raw.interactive,
      persist: !raw.no_persist,
      verbosity: raw.verbosity,
      log_file: raw.log_file,
      config_file: raw.config_file,
    })
  }
}
