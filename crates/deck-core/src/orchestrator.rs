//! Session lifecycle on top of a [`Multiplexer`].
//!
//! A session name moves `NoRecord -> Configured -> Live <-> Detached`, and
//! `kill` returns it to `Configured`. Records are never deleted here.

use crate::config::{Settings, SESSION_ENV, TEAMS_ENV, TEAM_ENV};
use crate::error::{DeckError, Result};
use crate::mux::{Launch, LiveSession, Multiplexer};
use crate::session::{Registry, SessionRecord};
use crate::tasks::{self, TaskCounts, TaskEntry};
use crate::types::Domain;
use serde::Serialize;
use std::path::PathBuf;

const LEAD_WINDOW: &str = "lead";

/// The two kinds of extra window `spawn` can create.
///
/// A `Coordinated` worker joins the session's team: it receives the team
/// identifier and the coordination flag, so it shares the task list and
/// mailbox with the lead. A `Standalone` worker only shares the terminal
/// session; it has no team identity and does not see the team's tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerKind {
    Coordinated { team_id: String },
    Standalone,
}

impl WorkerKind {
    fn window_prefix(&self) -> &'static str {
        match self {
            WorkerKind::Coordinated { .. } => "worker",
            WorkerKind::Standalone => "solo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A live session existed; no process was started.
    Reattached,
    /// A new session was created from the record.
    Started,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub name: String,
    pub project_dir: PathBuf,
    pub domain: Domain,
    pub team: String,
    pub live: bool,
    pub windows: usize,
    pub attached: bool,
    pub tasks: TaskCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    pub record: SessionRecord,
    pub status: SessionStatus,
    pub task_list: Vec<TaskEntry>,
}

pub struct Orchestrator<'a> {
    settings: &'a Settings,
    registry: Registry,
    mux: &'a dyn Multiplexer,
}

impl<'a> Orchestrator<'a> {
    pub fn new(settings: &'a Settings, mux: &'a dyn Multiplexer) -> Self {
        Self {
            settings,
            registry: Registry::new(&settings.home, settings.config.session_prefix.clone()),
            mux,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Live session `name`, if any. No multiplexer installed means nothing
    /// is live.
    fn live(&self, name: &str) -> Result<Option<LiveSession>> {
        match self.mux.session(name) {
            Err(DeckError::MultiplexerMissing) => Ok(None),
            other => other,
        }
    }

    fn live_sessions(&self) -> Result<Vec<LiveSession>> {
        match self.mux.list_sessions() {
            Err(DeckError::MultiplexerMissing) => {
                tracing::debug!("tmux not installed, reporting every session as stopped");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    fn lead_launch(&self, record: &SessionRecord) -> Launch {
        let mut env = vec![
            (SESSION_ENV.to_string(), record.name.clone()),
            (TEAM_ENV.to_string(), record.team.clone()),
        ];
        let mut unset = Vec::new();
        if self.settings.coordination_enabled() {
            env.push((TEAMS_ENV.to_string(), "1".to_string()));
        } else {
            unset.push(TEAMS_ENV.to_string());
        }
        Launch {
            window_name: LEAD_WINDOW.to_string(),
            cwd: record.project_dir.clone(),
            env,
            unset,
            command: self.settings.config.assistant_command.clone(),
        }
    }

    /// Attach to `name`, creating it from its record first if it is not live.
    pub fn open(&self, name: &str) -> Result<OpenOutcome> {
        if self.live(name)?.is_some() {
            tracing::info!(session = name, "attaching to live session");
            self.mux.attach(name)?;
            return Ok(OpenOutcome::Reattached);
        }
        let record = self.registry.load(name)?;
        if !record.project_dir.is_dir() {
            return Err(DeckError::ProjectNotFound(record.project_dir));
        }
        match self.mux.new_session(name, &self.lead_launch(&record)) {
            Ok(()) => {
                tracing::info!(session = name, project = %record.project_dir.display(), "started session");
                self.mux.attach(name)?;
                Ok(OpenOutcome::Started)
            }
            // Another invocation started it between the liveness check and here.
            Err(DeckError::AlreadyRunning(_)) => {
                self.mux.attach(name)?;
                Ok(OpenOutcome::Reattached)
            }
            Err(e) => Err(e),
        }
    }

    /// The coordinated worker kind for `name`. Fails when coordination is
    /// disabled.
    pub fn coordinated_worker(&self, name: &str) -> Result<WorkerKind> {
        if !self.settings.coordination_enabled() {
            return Err(DeckError::CoordinationDisabled);
        }
        let record = self.registry.load(name)?;
        Ok(WorkerKind::Coordinated {
            team_id: record.team,
        })
    }

    /// Add one assistant window to the live session `name`. Returns the new
    /// window's name.
    pub fn spawn(&self, name: &str, kind: WorkerKind) -> Result<String> {
        let live = self
            .live(name)?
            .ok_or_else(|| DeckError::NotRunning(name.to_string()))?;
        let record = self.registry.load(name)?;

        let mut env = vec![(SESSION_ENV.to_string(), name.to_string())];
        let mut unset = Vec::new();
        match &kind {
            WorkerKind::Coordinated { team_id } => {
                if !self.settings.coordination_enabled() {
                    return Err(DeckError::CoordinationDisabled);
                }
                env.push((TEAM_ENV.to_string(), team_id.clone()));
                env.push((TEAMS_ENV.to_string(), "1".to_string()));
            }
            // The tmux server may have been started from a shell that exported
            // the team variables; strip them so the window stays outside the team.
            WorkerKind::Standalone => {
                unset.push(TEAM_ENV.to_string());
                unset.push(TEAMS_ENV.to_string());
            }
        }

        let window_name = format!("{}-{}", kind.window_prefix(), live.windows + 1);
        let launch = Launch {
            window_name: window_name.clone(),
            cwd: record.project_dir,
            env,
            unset,
            command: self.settings.config.assistant_command.clone(),
        };
        self.mux.new_window(name, &launch)?;
        tracing::info!(session = name, window = %window_name, kind = ?kind, "spawned worker");
        Ok(window_name)
    }

    /// Task counts never fail a status display: an unreadable task directory
    /// shows as zero.
    fn task_counts(&self, team: &str) -> TaskCounts {
        let root = self.settings.tasks_root();
        tasks::summarize(&root, team).unwrap_or_else(|e| {
            tracing::warn!(team, tasks_root = %root.display(), error = %e, "could not read tasks");
            TaskCounts::default()
        })
    }

    fn status_for(&self, record: &SessionRecord, live: Option<&LiveSession>) -> SessionStatus {
        SessionStatus {
            name: record.name.clone(),
            project_dir: record.project_dir.clone(),
            domain: record.domain,
            team: record.team.clone(),
            live: live.is_some(),
            windows: live.map(|l| l.windows).unwrap_or(0),
            attached: live.is_some_and(|l| l.attached),
            tasks: self.task_counts(&record.team),
        }
    }

    /// Every persisted session with its live state and task counts. A
    /// multiplexer that cannot be queried shows every session as stopped.
    pub fn list(&self) -> Result<Vec<SessionStatus>> {
        let live = self.live_sessions().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not list live sessions");
            Vec::new()
        });
        Ok(self
            .registry
            .list()?
            .iter()
            .map(|record| {
                let handle = live.iter().find(|l| l.name == record.name);
                self.status_for(record, handle)
            })
            .collect())
    }

    pub fn status(&self, name: &str) -> Result<SessionDetail> {
        let record = self.registry.load(name)?;
        let live = self.live(name)?;
        let status = self.status_for(&record, live.as_ref());
        let task_list = tasks::read_team(&self.settings.tasks_root(), &record.team).unwrap_or_else(|e| {
            tracing::warn!(team = %record.team, error = %e, "could not read tasks");
            Vec::new()
        });
        Ok(SessionDetail {
            record,
            status,
            task_list,
        })
    }

    /// Terminate the live session. The record stays so `open` can bring it back.
    pub fn kill(&self, name: &str) -> Result<()> {
        if self.live(name)?.is_none() {
            return Err(DeckError::NotRunning(name.to_string()));
        }
        self.mux.kill_session(name)?;
        tracing::info!(session = name, "killed session");
        Ok(())
    }
}
