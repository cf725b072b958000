//! OS clipboard providers for runtime hosts.
//!
//! Every provider shells out to a platform tool except the native Windows
//! one. [`detect_all`] lists the usable ones in priority order, so the host
//! can hand the whole list to `the_lib::clipboard::copy_text` and get
//! fallbacks for free.

use std::borrow::Cow;

use the_lib::clipboard::{
  ClipboardError,
  ClipboardProvider,
  Result,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
  command: Cow<'static, str>,
  args:    Cow<'static, [Cow<'static, str>]>,
}

impl Command {
  pub fn new(command: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
    Self {
      command: Cow::Owned(command.into()),
      args:    Cow::Owned(args.into_iter().map(|arg| Cow::Owned(arg.into())).collect()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsClipboard {
  Pasteboard,
  Wayland,
  XClip,
  XSel,
  Win32Yank,
  Tmux,
  #[cfg(windows)]
  Windows,
  Termux,
  /// Pipes the text into an arbitrary command.
  Custom(Command),
}

fn env_var_is_set(name: &str) -> bool {
  std::env::var_os(name).is_some()
}

fn binary_exists(name: &str) -> bool {
  which::which(name).is_ok()
}

/// Every provider usable in the current environment, best first.
pub fn detect_all() -> Vec<OsClipboard> {
  let mut found = Vec::new();

  #[cfg(windows)]
  {
    if binary_exists("win32yank.exe") {
      found.push(OsClipboard::Win32Yank);
    }
    found.push(OsClipboard::Windows);
  }

  #[cfg(target_os = "macos")]
  {
    if binary_exists("pbcopy") {
      found.push(OsClipboard::Pasteboard);
    }
    if env_var_is_set("TMUX") && binary_exists("tmux") {
      found.push(OsClipboard::Tmux);
    }
  }

  #[cfg(not(any(windows, target_os = "macos")))]
  {
    if env_var_is_set("WAYLAND_DISPLAY") && binary_exists("wl-copy") {
      found.push(OsClipboard::Wayland);
    }
    if env_var_is_set("DISPLAY") {
      if binary_exists("xclip") {
        found.push(OsClipboard::XClip);
      }
      if binary_exists("xsel") {
        found.push(OsClipboard::XSel);
      }
    }
    if binary_exists("termux-clipboard-set") {
      found.push(OsClipboard::Termux);
    }
    if env_var_is_set("TMUX") && binary_exists("tmux") {
      found.push(OsClipboard::Tmux);
    }
    if binary_exists("win32yank.exe") {
      found.push(OsClipboard::Win32Yank);
    }
  }

  log::debug!(
    "clipboard providers: {:?}",
    found.iter().map(|p| p.name()).collect::<Vec<_>>()
  );
  found
}

impl OsClipboard {
  fn builtin(&self) -> Option<&'static Command> {
    match self {
      Self::Pasteboard => Some(&PASTEBOARD),
      Self::Wayland => Some(&WL_COPY),
      Self::XClip => Some(&XCLIP),
      Self::XSel => Some(&XSEL),
      Self::Win32Yank => Some(&WIN32),
      Self::Tmux => Some(&TMUX),
      Self::Termux => Some(&TERMUX),
      #[cfg(windows)]
      Self::Windows => None,
      Self::Custom(_) => None,
    }
  }
}

impl ClipboardProvider for OsClipboard {
  fn name(&self) -> Cow<'_, str> {
    let label = match self {
      Self::Pasteboard => "pasteboard",
      Self::Wayland => "wayland",
      Self::XClip => "x-clip",
      Self::XSel => "x-sel",
      Self::Win32Yank => "win-32-yank",
      Self::Tmux => "tmux",
      Self::Termux => "termux",
      #[cfg(windows)]
      Self::Windows => return "windows".into(),
      Self::Custom(cmd) => return Cow::Owned(format!("custom ({})", cmd.command)),
    };
    match self.builtin() {
      Some(cmd) => Cow::Owned(format!("{label} ({})", cmd.command)),
      None => label.into(),
    }
  }

  fn set_contents(&self, content: &str) -> Result<()> {
    match self {
      #[cfg(windows)]
      Self::Windows => clipboard_win::set_clipboard(clipboard_win::formats::Unicode, content)
        .map_err(|err| ClipboardError::Platform(err.to_string())),
      Self::Custom(cmd) => execute_command(cmd, content),
      _ => match self.builtin() {
        Some(cmd) => execute_command(cmd, content),
        None => Err(ClipboardError::Unavailable),
      },
    }
  }
}

macro_rules! copy_command {
  ($name:ident, $cmd:literal $( , $arg:literal )* ) => {
    static $name: Command = Command {
      command: Cow::Borrowed($cmd),
      args:    Cow::Borrowed(&[ $( Cow::Borrowed($arg) ),* ]),
    };
  };
}

copy_command!(TMUX, "tmux", "load-buffer", "-w", "-");
copy_command!(PASTEBOARD, "pbcopy");
copy_command!(WL_COPY, "wl-copy", "--type", "text/plain");
copy_command!(XCLIP, "xclip", "-i", "-selection", "clipboard");
copy_command!(XSEL, "xsel", "-i", "-b");
copy_command!(WIN32, "win32yank.exe", "-i", "--crlf");
copy_command!(TERMUX, "termux-clipboard-set");

fn execute_command(cmd: &Command, input: &str) -> Result<()> {
  use std::{
    io::Write,
    process::{
      Command as ProcessCommand,
      Stdio,
    },
  };

  let mut command = ProcessCommand::new(cmd.command.as_ref());
  let mut command = command
    .args(cmd.args.iter().map(AsRef::as_ref))
    .stdin(Stdio::piped())
    .stdout(Stdio::null())
    .stderr(Stdio::null());

  // xclip and friends keep serving the selection after we exit
  #[cfg(unix)]
  {
    use std::os::unix::process::CommandExt;

    unsafe {
      command = command.pre_exec(|| match libc::setsid() {
        -1 => Err(std::io::Error::last_os_error()),
        _ => Ok(()),
      });
    }
  }

  let mut child = command.spawn()?;

  {
    let mut stdin = child.stdin.take().ok_or(ClipboardError::StdinWriteFailed)?;
    stdin
      .write_all(input.as_bytes())
      .map_err(|_| ClipboardError::StdinWriteFailed)?;
  }

  let status = child.wait()?;
  if !status.success() {
    return Err(ClipboardError::CommandFailed);
  }
  Ok(())
}
