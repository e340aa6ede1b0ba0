use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeckError {
    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------
    #[error("no session record for '{0}': run 'agent-deck setup <project-dir>' first")]
    NoConfig(String),

    #[error("malformed record {path}: {reason}")]
    MalformedRecord { path: PathBuf, reason: String },

    #[error("collection not found: {0} (see 'agent-deck collection list')")]
    CollectionNotFound(String),

    #[error("collection already exists: {0} (pass --force to overwrite)")]
    CollectionExists(String),

    #[error("invalid name '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidName(String),

    #[error("invalid domain '{0}': expected one of ml, data-platform, backend, frontend, devops, cli, general")]
    InvalidDomain(String),

    #[error("invalid need '{0}': expected one of git, quality, context, docs, deploy")]
    InvalidNeed(String),

    #[error("unknown config key '{key}'; valid keys: {valid}")]
    UnknownConfigKey { key: String, valid: String },

    #[error("invalid value '{value}' for config key '{key}': {reason}")]
    InvalidConfigValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("project directory not found: {0}")]
    ProjectNotFound(PathBuf),

    #[error("home directory not found: set HOME or AGENT_DECK_HOME")]
    HomeNotFound,

    // -----------------------------------------------------------------------
    // Cache
    // -----------------------------------------------------------------------
    #[error("failed to fetch {source_url} into {path}: {reason}")]
    FetchFailed {
        source_url: String,
        path: PathBuf,
        reason: String,
    },

    #[error("timed out waiting for cache lock {0} (remove it manually if no other agent-deck is running)")]
    LockTimeout(PathBuf),

    // -----------------------------------------------------------------------
    // Process
    // -----------------------------------------------------------------------
    #[error("tmux not found on PATH: install tmux to open sessions")]
    MultiplexerMissing,

    #[error("tmux {command} failed: {reason}")]
    MultiplexerFailed { command: String, reason: String },

    #[error("session '{0}' is not running: open it with 'agent-deck open {0}'")]
    NotRunning(String),

    #[error("session '{0}' is already running")]
    AlreadyRunning(String),

    #[error("coordinated workers are disabled: set CLAUDE_CODE_EXPERIMENTAL_AGENT_TEAMS=1 or 'agent-deck config set coordinated_workers true'")]
    CoordinationDisabled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Broad grouping used by the CLI when deciding how to present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Cache,
    Process,
    Io,
}

impl DeckError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DeckError::NoConfig(_)
            | DeckError::MalformedRecord { .. }
            | DeckError::CollectionNotFound(_)
            | DeckError::CollectionExists(_)
            | DeckError::InvalidName(_)
            | DeckError::InvalidDomain(_)
            | DeckError::InvalidNeed(_)
            | DeckError::UnknownConfigKey { .. }
            | DeckError::InvalidConfigValue { .. }
            | DeckError::ProjectNotFound(_)
            | DeckError::HomeNotFound
            | DeckError::Yaml(_) => ErrorCategory::Configuration,
            DeckError::FetchFailed { .. } | DeckError::LockTimeout(_) => ErrorCategory::Cache,
            DeckError::MultiplexerMissing
            | DeckError::MultiplexerFailed { .. }
            | DeckError::NotRunning(_)
            | DeckError::AlreadyRunning(_)
            | DeckError::CoordinationDisabled => ErrorCategory::Process,
            DeckError::Io(_) | DeckError::Json(_) => ErrorCategory::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_config_suggests_setup() {
        let msg = DeckError::NoConfig("deck-proj".into()).to_string();
        assert!(msg.contains("deck-proj"));
        assert!(msg.contains("agent-deck setup"));
    }

    #[test]
    fn categories() {
        assert_eq!(
            DeckError::LockTimeout(PathBuf::from("/tmp/x")).category(),
            ErrorCategory::Cache
        );
        assert_eq!(
            DeckError::NotRunning("deck-a".into()).category(),
            ErrorCategory::Process
        );
        assert_eq!(
            DeckError::NoConfig("deck-a".into()).category(),
            ErrorCategory::Configuration
        );
    }
}
