use std::{
  path::{
    Path,
    PathBuf,
  },
  sync::Arc,
  time::Duration,
};

use anyhow::{
  Context,
  Result,
};
use the_lib::{
  chunk::{
    ChunkPolicy,
    LineMapper,
  },
  clipboard::{
    ClipboardProvider,
    ClipboardStatus,
    copy_text,
  },
  engine::{
    ApplyOutcome,
    Engine,
    EngineConfig,
    OperationRecord,
  },
  handlers::{
    HandlerConfig,
    Handlers,
  },
  metrics::TextMetrics,
  operations::{
    GROUPS,
    Operation,
  },
  storage::Storage,
};
use the_runtime::{
  FileStorage,
  OsClipboard,
  TokioScheduler,
};
use the_transformer_loader::config::Config;
use tokio::io::{
  AsyncBufReadExt,
  AsyncWriteExt,
  BufReader,
};

use crate::cli::{
  Action,
  CliOptions,
};

pub struct Application {
  engine:     Engine,
  lines:      LineMapper,
  handlers:   Handlers,
  clipboards: Vec<OsClipboard>,
  clipboard:  ClipboardStatus,
}

impl Application {
  pub fn new(config: &Config, opts: &CliOptions) -> Result<Self> {
    let engine_config = EngineConfig {
      history_capacity: config.history.capacity,
    };
    let storage: Option<Arc<dyn Storage>> = opts
      .persist
      .then(|| Arc::new(FileStorage::new(the_transformer_loader::state_dir())) as Arc<dyn Storage>);

    let imported = match &opts.input {
      Some(path) => Some(
        the_runtime::io::import(path)
          .with_context(|| format!("failed to import {}", path.display()))?,
      ),
      None => None,
    };
    let engine = match (&imported, &storage) {
      (None, Some(storage)) => Engine::restore(storage.as_ref(), "", engine_config),
      _ => Engine::new("", engine_config),
    };

    let lines = LineMapper::new(
      ChunkPolicy {
        threshold:  config.chunking.threshold,
        chunk_size: config.chunking.chunk_size,
      },
      Arc::new(TokioScheduler),
    );
    let handlers = Handlers::spawn(&engine, storage, HandlerConfig {
      metrics_delay: config.debounce.metrics_delay(),
      save_delay:    config.debounce.save_delay(),
    });

    // imports go through the manual edit path so listeners see them
    if let Some(text) = imported {
      engine.set_text_manual(&text);
    }

    Ok(Self {
      engine,
      lines,
      handlers,
      clipboards: the_runtime::detect_all(),
      clipboard: ClipboardStatus::default(),
    })
  }

  /// Runs every action in order, then writes the result where asked.
  pub async fn run_batch(&mut self, opts: &CliOptions) -> Result<()> {
    for action in &opts.actions {
      self.perform(action).await?;
    }
    if opts.copy {
      self.copy();
    }
    if let Some(path) = &opts.output {
      self.export(path)?;
    }
    if opts.stats {
      let metrics = TextMetrics::compute(&self.engine.text());
      eprintln!("{}", status_line(&metrics, &self.engine.record(), self.clipboard));
    }
    self.handlers.flush();
    Ok(())
  }

  /// Reads commands from stdin until `quit` or end of input.
  pub async fn run_interactive(&mut self, opts: &CliOptions) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stderr = tokio::io::stderr();

    eprintln!("{HELP}");
    loop {
      stderr.write_all(b"> ").await?;
      stderr.flush().await?;
      let Some(line) = stdin.next_line().await? else {
        break;
      };
      let command = match Command::parse(&line) {
        Ok(Some(command)) => command,
        Ok(None) => continue,
        Err(err) => {
          eprintln!("{err}");
          continue;
        },
      };
      if command == Command::Quit {
        break;
      }
      if let Err(err) = self.execute(command).await {
        eprintln!("error: {err:#}");
      }
    }

    if let Some(path) = &opts.output {
      self.export(path)?;
    }
    self.handlers.flush();
    Ok(())
  }

  async fn execute(&mut self, command: Command) -> Result<()> {
    match command {
      Command::Action(action) => {
        self.perform(&action).await?;
        println!("{}", self.engine.text());
      },
      Command::Set(text) => {
        self.engine.set_text_manual(&text);
      },
      Command::Import(path) => {
        let text = the_runtime::io::import(&path)
          .with_context(|| format!("failed to import {}", path.display()))?;
        self.engine.set_text_manual(&text);
        println!("{}", self.engine.text());
      },
      Command::Export(path) => self.export(&path)?,
      Command::Copy => {
        self.copy();
        eprintln!("clipboard: {}", clipboard_label(self.clipboard));
      },
      Command::Show => println!("{}", self.engine.text()),
      Command::Stats => {
        eprintln!(
          "{}",
          status_line(&self.handlers.metrics(), &self.engine.record(), self.clipboard)
        );
      },
      Command::History => {
        eprintln!("undo ({}):", self.engine.undo_len());
        for entry in self.engine.undo_entries().iter().rev() {
          eprintln!("  {}", preview(entry));
        }
        eprintln!("redo ({}):", self.engine.redo_len());
        for entry in self.engine.redo_entries().iter().rev() {
          eprintln!("  {}", preview(entry));
        }
      },
      Command::Help => eprintln!("{HELP}\n\n{}", catalog()),
      Command::Quit => {},
    }
    Ok(())
  }

  pub async fn perform(&mut self, action: &Action) -> Result<()> {
    let changed = match action {
      Action::Apply(op) => {
        let outcome = op.run(&self.engine, &self.lines).await?;
        log::debug!("{} -> {outcome:?}", op.id());
        outcome == ApplyOutcome::Applied
      },
      Action::Undo => self.engine.undo(),
      Action::Redo => self.engine.redo(),
      Action::Clear => self.engine.clear_all(),
    };
    if changed {
      self.clipboard = ClipboardStatus::Idle;
    } else {
      log::info!("'{action}' left the text unchanged");
    }
    Ok(())
  }

  fn copy(&mut self) {
    let providers: Vec<&dyn ClipboardProvider> = self
      .clipboards
      .iter()
      .map(|provider| provider as &dyn ClipboardProvider)
      .collect();
    self.clipboard = copy_text(&self.engine.text(), &providers);
  }

  fn export(&self, path: &Path) -> Result<()> {
    the_runtime::io::export(path, &self.engine.text())
      .with_context(|| format!("failed to export to {}", path.display()))
  }
}

/// A line typed in interactive mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Action(Action),
  Set(String),
  Import(PathBuf),
  Export(PathBuf),
  Copy,
  Show,
  Stats,
  History,
  Help,
  Quit,
}

impl Command {
  /// `Ok(None)` for blank lines.
  pub fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
      return Ok(None);
    }
    let (head, rest) = line
      .trim_start()
      .split_once(' ')
      .unwrap_or((line.trim(), ""));

    let command = match head {
      "replace" => {
        let Some((find, replace)) = rest.split_once('\t') else {
          return Err("usage: replace <find><TAB><replace>".to_string());
        };
        Self::Action(Action::Apply(Operation::FindReplace {
          find:    find.to_string(),
          replace: replace.to_string(),
        }))
      },
      "set" => Self::Set(rest.to_string()),
      "import" | "export" if rest.trim().is_empty() => {
        return Err(format!("usage: {head} <path>"));
      },
      "import" => Self::Import(PathBuf::from(rest.trim())),
      "export" => Self::Export(PathBuf::from(rest.trim())),
      "copy" => Self::Copy,
      "show" => Self::Show,
      "stats" => Self::Stats,
      "history" => Self::History,
      "help" | "?" => Self::Help,
      "quit" | "exit" | "q" => Self::Quit,
      id => Self::Action(id.parse().map_err(|err| format!("{err}, try `help`"))?),
    };
    Ok(Some(command))
  }
}

const HELP: &str = "commands: <action> | replace <find><TAB><replace> | set <text> | import <path> \
                    | export <path> | copy | show | stats | history | help | quit";

/// Every catalog entry, grouped, one id per line.
pub fn catalog() -> String {
  let mut out = String::new();
  for group in GROUPS {
    out.push_str(group.title);
    out.push_str(": ");
    out.push_str(group.description);
    out.push('\n');
    for op in group.operations {
      out.push_str(&format!("  {:<22}{}\n", op.id(), op.label()));
    }
  }
  out.push_str("Find and replace: literal, every occurrence\n");
  out.push_str(&format!("  {:<22}{}\n", "replace", "Find and replace"));
  out.push_str("History\n");
  for id in ["undo", "redo", "clear"] {
    out.push_str(&format!("  {id}\n"));
  }
  out
}

pub fn format_duration(duration: Duration) -> String {
  let millis = duration.as_millis();
  if millis < 1000 {
    format!("{millis} ms")
  } else {
    format!("{:.2} s", duration.as_secs_f64())
  }
}

fn clipboard_label(status: ClipboardStatus) -> &'static str {
  match status {
    ClipboardStatus::Idle => "idle",
    ClipboardStatus::Copied => "copied",
    ClipboardStatus::Failed => "failed",
  }
}

pub fn status_line(
  metrics: &TextMetrics,
  record: &OperationRecord,
  clipboard: ClipboardStatus,
) -> String {
  let mut line = format!(
    "{} lines ({} empty), {} chars",
    metrics.line_count, metrics.empty_line_count, metrics.char_count
  );
  if let Some(label) = &record.label {
    line.push_str(&format!(" | last: {label}"));
  }
  if let Some(duration) = record.duration {
    line.push_str(&format!(" in {}", format_duration(duration)));
  }
  if let Some(at) = record.last_change_at {
    let at: chrono::DateTime<chrono::Local> = at.into();
    line.push_str(&format!(" | changed {}", at.format("%H:%M:%S")));
  }
  if clipboard != ClipboardStatus::Idle {
    line.push_str(&format!(" | clipboard: {}", clipboard_label(clipboard)));
  }
  line
}

fn preview(entry: &str) -> String {
  const WIDTH: usize = 60;
  let first = entry.lines().next().unwrap_or("");
  let lines = entry.lines().count();
  let mut out: String = first.chars().take(WIDTH).collect();
  if first.chars().count() > WIDTH {
    out.push_str("...");
  }
  if lines > 1 {
    out.push_str(&format!(" (+{} lines)", lines - 1));
  }
  out
}
