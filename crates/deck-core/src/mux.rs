//! Terminal multiplexer seam.
//!
//! The orchestrator talks to [`Multiplexer`]; production uses [`Tmux`],
//! tests use an in-memory fake.

use crate::error::{DeckError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A live multiplexer session as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveSession {
    pub name: String,
    pub windows: usize,
    pub attached: bool,
}

/// What to run in a new session or window.
///
/// `env` and `unset` apply to this one process only. Windows added later to
/// the same session do not inherit them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub window_name: String,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    /// Variables removed from the inherited environment before `env` is applied.
    pub unset: Vec<String>,
    pub command: String,
}

impl Launch {
    /// The shell command tmux runs for this launch.
    ///
    /// `new-session -e` would write the variables into the session
    /// environment, where every later window picks them up, so they are set
    /// through `env` on the command line instead.
    pub fn shell_command(&self) -> String {
        if self.env.is_empty() && self.unset.is_empty() {
            return self.command.clone();
        }
        let mut parts = vec!["env".to_string()];
        for key in &self.unset {
            parts.push("-u".to_string());
            parts.push(shell_quote(key));
        }
        for (key, value) in &self.env {
            parts.push(format!("{key}={}", shell_quote(value)));
        }
        parts.push(self.command.clone());
        parts.join(" ")
    }
}

fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@%+,".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

pub trait Multiplexer {
    fn list_sessions(&self) -> Result<Vec<LiveSession>>;

    fn session(&self, name: &str) -> Result<Option<LiveSession>> {
        Ok(self.list_sessions()?.into_iter().find(|s| s.name == name))
    }

    fn has_session(&self, name: &str) -> Result<bool> {
        Ok(self.session(name)?.is_some())
    }

    /// Create a detached session named `name` running `launch` in its first window.
    fn new_session(&self, name: &str, launch: &Launch) -> Result<()>;

    /// Add a window to an existing session.
    fn new_window(&self, session: &str, launch: &Launch) -> Result<()>;

    /// Attach the calling terminal. Blocks until the user detaches.
    fn attach(&self, name: &str) -> Result<()>;

    fn kill_session(&self, name: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// tmux
// ---------------------------------------------------------------------------

// tmux 3.x rewrites non-printable characters such as tab in `-F` output to
// `_`, so the separator must be printable. Session names we create never
// contain `|`; fields are split from the right for names that do.
const LIST_SEPARATOR: char = '|';
const LIST_FORMAT: &str = "#{session_name}|#{session_windows}|#{session_attached}";

/// Argument builder for one tmux invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxArgs {
    args: Vec<String>,
}

impl TmuxArgs {
    fn new(command: &str) -> Self {
        Self {
            args: vec![command.to_string()],
        }
    }

    fn flag(mut self, flag: &str) -> Self {
        self.args.push(flag.to_string());
        self
    }

    fn flag_with_value(mut self, flag: &str, value: &str) -> Self {
        self.args.push(flag.to_string());
        self.args.push(value.to_string());
        self
    }

    fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    fn launch(self, launch: &Launch) -> Self {
        self.flag_with_value("-n", &launch.window_name)
            .flag_with_value("-c", &launch.cwd.to_string_lossy())
            .arg(&launch.shell_command())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    // `=name` makes tmux match the session name exactly instead of by prefix.

    pub fn has_session(name: &str) -> Self {
        Self::new("has-session").flag_with_value("-t", &format!("={name}"))
    }

    pub fn list_sessions() -> Self {
        Self::new("list-sessions").flag_with_value("-F", LIST_FORMAT)
    }

    pub fn new_session(name: &str, launch: &Launch) -> Self {
        Self::new("new-session")
            .flag("-d")
            .flag_with_value("-s", name)
            .launch(launch)
    }

    pub fn new_window(session: &str, launch: &Launch) -> Self {
        Self::new("new-window")
            .flag("-d")
            .flag_with_value("-t", &format!("={session}:"))
            .launch(launch)
    }

    pub fn attach_session(name: &str) -> Self {
        Self::new("attach-session").flag_with_value("-t", &format!("={name}"))
    }

    pub fn switch_client(name: &str) -> Self {
        Self::new("switch-client").flag_with_value("-t", &format!("={name}"))
    }

    pub fn kill_session(name: &str) -> Self {
        Self::new("kill-session").flag_with_value("-t", &format!("={name}"))
    }
}

/// Parse `list-sessions` output produced with [`LIST_FORMAT`].
pub fn parse_list_output(stdout: &str) -> Vec<LiveSession> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.rsplitn(3, LIST_SEPARATOR);
            let attached = parts.next()?.trim().parse::<u32>().ok()?;
            let windows = parts.next()?.trim().parse::<usize>().ok()?;
            let name = parts.next()?;
            if name.is_empty() {
                return None;
            }
            Some(LiveSession {
                name: name.to_string(),
                windows,
                attached: attached > 0,
            })
        })
        .collect()
}

/// `tmux` on PATH. A missing binary surfaces as `MultiplexerMissing` on the
/// first call, not at construction.
#[derive(Debug, Clone)]
pub struct Tmux {
    binary: Option<PathBuf>,
    inside_tmux: bool,
}

impl Tmux {
    pub fn detect() -> Self {
        Self {
            binary: which::which("tmux").ok(),
            inside_tmux: std::env::var_os("TMUX").is_some_and(|v| !v.is_empty()),
        }
    }

    pub fn binary(&self) -> Result<&Path> {
        self.binary.as_deref().ok_or(DeckError::MultiplexerMissing)
    }

    fn command(&self, args: &TmuxArgs) -> Result<Command> {
        let binary = self.binary()?;
        tracing::debug!(args = ?args.as_slice(), "running tmux");
        let mut cmd = Command::new(binary);
        cmd.args(args.as_slice());
        Ok(cmd)
    }

    fn run(&self, args: &TmuxArgs) -> Result<String> {
        let output = self
            .command(args)?
            .stdin(Stdio::null())
            .output()
            .map_err(|e| failed(args, e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(args, stderr.trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn failed(args: &TmuxArgs, reason: String) -> DeckError {
    DeckError::MultiplexerFailed {
        command: args.as_slice().first().cloned().unwrap_or_default(),
        reason,
    }
}

/// tmux reports "no server" in a few ways depending on version.
fn is_no_server(reason: &str) -> bool {
    reason.contains("no server running")
        || reason.contains("error connecting to")
        || reason.contains("no sessions")
}

impl Multiplexer for Tmux {
    fn list_sessions(&self) -> Result<Vec<LiveSession>> {
        match self.run(&TmuxArgs::list_sessions()) {
            Ok(out) => Ok(parse_list_output(&out)),
            Err(DeckError::MultiplexerFailed { reason, .. }) if is_no_server(&reason) => {
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn has_session(&self, name: &str) -> Result<bool> {
        let args = TmuxArgs::has_session(name);
        let status = self
            .command(&args)?
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| failed(&args, e.to_string()))?;
        Ok(status.success())
    }

    fn new_session(&self, name: &str, launch: &Launch) -> Result<()> {
        match self.run(&TmuxArgs::new_session(name, launch)) {
            Ok(_) => Ok(()),
            Err(DeckError::MultiplexerFailed { reason, .. }) if reason.contains("duplicate session") => {
                Err(DeckError::AlreadyRunning(name.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn new_window(&self, session: &str, launch: &Launch) -> Result<()> {
        self.run(&TmuxArgs::new_window(session, launch)).map(|_| ())
    }

    fn attach(&self, name: &str) -> Result<()> {
        let args = if self.inside_tmux {
            TmuxArgs::switch_client(name)
        } else {
            TmuxArgs::attach_session(name)
        };
        let status = self
            .command(&args)?
            .status()
            .map_err(|e| failed(&args, e.to_string()))?;
        if !status.success() {
            return Err(failed(&args, format!("exited with {status}")));
        }
        Ok(())
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        self.run(&TmuxArgs::kill_session(name)).map(|_| ())
    }
}
