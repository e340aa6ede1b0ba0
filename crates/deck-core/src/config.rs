use crate::error::{DeckError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment flag that turns on the assistant's multi-process team feature.
/// Read once at start-up and forwarded into spawned assistant processes.
pub const TEAMS_ENV: &str = "CLAUDE_CODE_EXPERIMENTAL_AGENT_TEAMS";

/// Environment variable carrying the team identifier into the assistant.
pub const TEAM_ENV: &str = "AGENT_DECK_TEAM";

/// Environment variable carrying the session name into the assistant.
pub const SESSION_ENV: &str = "AGENT_DECK_SESSION";

// ---------------------------------------------------------------------------
// DeckConfig
// ---------------------------------------------------------------------------

/// Global key/value configuration persisted at `<home>/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckConfig {
    #[serde(default = "default_session_prefix")]
    pub session_prefix: String,
    #[serde(default)]
    pub coordinated_workers: bool,
    #[serde(default = "default_cache_repo")]
    pub cache_repo: String,
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,
    #[serde(default = "default_lock_retries")]
    pub lock_retries: u32,
    #[serde(default = "default_lock_backoff_ms")]
    pub lock_backoff_ms: u64,
    #[serde(default = "default_assistant_command")]
    pub assistant_command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks_root: Option<PathBuf>,
}

fn default_session_prefix() -> String {
    "deck-".to_string()
}

fn default_cache_repo() -> String {
    "https://github.com/hesreallyhim/awesome-claude-code.git".to_string()
}

fn default_cache_ttl_hours() -> u64 {
    24
}

fn default_lock_retries() -> u32 {
    10
}

fn default_lock_backoff_ms() -> u64 {
    500
}

fn default_assistant_command() -> String {
    "claude".to_string()
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            session_prefix: default_session_prefix(),
            coordinated_workers: false,
            cache_repo: default_cache_repo(),
            cache_ttl_hours: default_cache_ttl_hours(),
            lock_retries: default_lock_retries(),
            lock_backoff_ms: default_lock_backoff_ms(),
            assistant_command: default_assistant_command(),
            tasks_root: None,
        }
    }
}

impl DeckConfig {
    pub const KEYS: &'static [&'static str] = &[
        "session_prefix",
        "coordinated_workers",
        "cache_repo",
        "cache_ttl_hours",
        "lock_retries",
        "lock_backoff_ms",
        "assistant_command",
        "tasks_root",
    ];

    /// Load from `<home>/config.yaml`; a missing file yields the defaults.
    pub fn load(home: &Path) -> Result<Self> {
        let path = paths::config_path(home);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&data).map_err(|e| DeckError::MalformedRecord {
            path,
            reason: e.to_string(),
        })
    }

    pub fn save(&self, home: &Path) -> Result<()> {
        let path = paths::config_path(home);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "session_prefix" => self.session_prefix.clone(),
            "coordinated_workers" => self.coordinated_workers.to_string(),
            "cache_repo" => self.cache_repo.clone(),
            "cache_ttl_hours" => self.cache_ttl_hours.to_string(),
            "lock_retries" => self.lock_retries.to_string(),
            "lock_backoff_ms" => self.lock_backoff_ms.to_string(),
            "assistant_command" => self.assistant_command.clone(),
            "tasks_root" => self
                .tasks_root
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set a key from its string form, validating the value for its type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "session_prefix" => {
                validate_prefix(value).map_err(|reason| invalid(key, value, reason))?;
                self.session_prefix = value.to_string();
            }
            "coordinated_workers" => {
                self.coordinated_workers =
                    parse_bool(value).ok_or_else(|| invalid(key, value, "expected true or false"))?;
            }
            "cache_repo" => {
                if value.trim().is_empty() {
                    return Err(invalid(key, value, "must not be empty"));
                }
                self.cache_repo = value.to_string();
            }
            "cache_ttl_hours" => self.cache_ttl_hours = parse_num(key, value)?,
            "lock_retries" => self.lock_retries = parse_num(key, value)?,
            "lock_backoff_ms" => self.lock_backoff_ms = parse_num(key, value)?,
            "assistant_command" => {
                if value.trim().is_empty() {
                    return Err(invalid(key, value, "must not be empty"));
                }
                self.assistant_command = value.to_string();
            }
            "tasks_root" => {
                self.tasks_root = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// All keys with their current string values, in declaration order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        Self::KEYS
            .iter()
            .map(|k| (*k, self.get(k).unwrap_or_default()))
            .collect()
    }
}

fn unknown_key(key: &str) -> DeckError {
    DeckError::UnknownConfigKey {
        key: key.to_string(),
        valid: DeckConfig::KEYS.join(", "),
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> DeckError {
    DeckError::InvalidConfigValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Longest accepted session prefix; the rest of the name budget goes to
/// the project's directory name.
pub const MAX_PREFIX_LEN: usize = 32;

fn validate_prefix(value: &str) -> std::result::Result<(), &'static str> {
    if value.is_empty() {
        return Ok(());
    }
    if value.len() > MAX_PREFIX_LEN {
        return Err("must be at most 32 characters");
    }
    let lower_alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    if !value.starts_with(lower_alnum) {
        return Err("must start with a lowercase letter or digit");
    }
    if !value.chars().all(|c| lower_alnum(c) || c == '-') {
        return Err("use lowercase letters, digits and '-'");
    }
    Ok(())
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(key, value, "expected a non-negative integer"))
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything a command needs to know about its environment, resolved once
/// at process start and handed to each component.
#[derive(Debug, Clone)]
pub struct Settings {
    pub home: PathBuf,
    pub config: DeckConfig,
    /// Coordination requested through the environment, independent of config.
    pub teams_env: bool,
}

impl Settings {
    pub fn new(home: PathBuf, config: DeckConfig, teams_env: bool) -> Self {
        Self {
            home,
            config,
            teams_env,
        }
    }

    /// Load config from `home`. `teams_env` is the raw value of
    /// [`TEAMS_ENV`], if set.
    pub fn load(home: PathBuf, teams_env: Option<&str>) -> Result<Self> {
        let config = DeckConfig::load(&home)?;
        let teams_env = teams_env.and_then(parse_bool).unwrap_or(false);
        Ok(Self::new(home, config, teams_env))
    }

    pub fn coordination_enabled(&self) -> bool {
        self.teams_env || self.config.coordinated_workers
    }

    pub fn cache_dir(&self) -> PathBuf {
        paths::cache_dir(&self.home)
    }

    pub fn tasks_root(&self) -> PathBuf {
        self.config
            .tasks_root
            .clone()
            .unwrap_or_else(paths::default_tasks_root)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache_ttl_hours.saturating_mul(3600))
    }

    pub fn lock_backoff(&self) -> Duration {
        Duration::from_millis(self.config.lock_backoff_ms)
    }

    /// Create the data root and its record directories.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.home.clone(),
            paths::sessions_dir(&self.home),
            paths::collections_dir(&self.home),
            paths::cache_dir(&self.home),
        ] {
            crate::io::ensure_dir(&dir)?;
        }
        Ok(())
    }
}
