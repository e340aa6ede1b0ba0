use crate::error::{DeckError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Data root layout
// ---------------------------------------------------------------------------

pub const DATA_DIR_NAME: &str = ".agent-deck";
pub const CONFIG_FILE: &str = "config.yaml";
pub const SESSIONS_DIR: &str = "sessions";
pub const COLLECTIONS_DIR: &str = "collections";
pub const CACHE_DIR: &str = "cache";
pub const CACHE_TREE_DIR: &str = "repo";
pub const CACHE_STAMP_FILE: &str = ".last-fetch";
pub const CACHE_LOCK_DIR: &str = ".lock";
pub const RECORD_EXT: &str = "yaml";

// ---------------------------------------------------------------------------
// Artifact tree layout
// ---------------------------------------------------------------------------

/// Present only in a complete tree; used to tell a finished fetch from a
/// bare or interrupted directory.
pub const TREE_MARKER: &str = "resources";
pub const SLASH_COMMANDS_DIR: &str = "resources/slash-commands";
pub const TEMPLATES_DIR: &str = "resources/claude.md-files";
pub const TEMPLATE_FILE: &str = "CLAUDE.md";

// ---------------------------------------------------------------------------
// Project layout
// ---------------------------------------------------------------------------

pub const CLAUDE_COMMANDS_DIR: &str = ".claude/commands";
pub const CLAUDE_MD: &str = "CLAUDE.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(home: &Path) -> PathBuf {
    home.join(CONFIG_FILE)
}

pub fn sessions_dir(home: &Path) -> PathBuf {
    home.join(SESSIONS_DIR)
}

pub fn session_record(home: &Path, name: &str) -> PathBuf {
    sessions_dir(home).join(format!("{name}.{RECORD_EXT}"))
}

pub fn collections_dir(home: &Path) -> PathBuf {
    home.join(COLLECTIONS_DIR)
}

pub fn collection_record(home: &Path, name: &str) -> PathBuf {
    collections_dir(home).join(format!("{name}.{RECORD_EXT}"))
}

pub fn cache_dir(home: &Path) -> PathBuf {
    home.join(CACHE_DIR)
}

pub fn cache_tree(cache: &Path) -> PathBuf {
    cache.join(CACHE_TREE_DIR)
}

pub fn cache_stamp(cache: &Path) -> PathBuf {
    cache.join(CACHE_STAMP_FILE)
}

pub fn cache_lock(cache: &Path) -> PathBuf {
    cache.join(CACHE_LOCK_DIR)
}

pub fn command_source_dir(tree: &Path, id: &str) -> PathBuf {
    tree.join(SLASH_COMMANDS_DIR).join(id)
}

pub fn template_source(tree: &Path, id: &str) -> PathBuf {
    tree.join(TEMPLATES_DIR).join(id).join(TEMPLATE_FILE)
}

pub fn claude_commands_dir(project: &Path) -> PathBuf {
    project.join(CLAUDE_COMMANDS_DIR)
}

pub fn claude_md_path(project: &Path) -> PathBuf {
    project.join(CLAUDE_MD)
}

pub fn team_tasks_dir(tasks_root: &Path, team: &str) -> PathBuf {
    tasks_root.join(team)
}

/// `~/.agent-deck`, or `None` when no home directory can be resolved.
pub fn default_home() -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(DATA_DIR_NAME))
}

/// `~/.claude/tasks`, where the assistant keeps per-team task records.
pub fn default_tasks_root() -> PathBuf {
    home::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
        .join("tasks")
}

// ---------------------------------------------------------------------------
// Name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

pub const MAX_NAME_LEN: usize = 64;

/// Session and collection names double as file stems and tmux targets.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN || !name_re().is_match(name) {
        return Err(DeckError::InvalidName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        let home = Path::new("/tmp/deck");
        assert_eq!(
            session_record(home, "deck-proj"),
            PathBuf::from("/tmp/deck/sessions/deck-proj.yaml")
        );
        assert_eq!(
            collection_record(home, "backend-kit"),
            PathBuf::from("/tmp/deck/collections/backend-kit.yaml")
        );
        assert_eq!(
            cache_lock(&cache_dir(home)),
            PathBuf::from("/tmp/deck/cache/.lock")
        );
    }

    #[test]
    fn valid_names() {
        for name in ["deck-proj", "a", "backend-kit-2", "x1"] {
            validate_name(name).unwrap_or_else(|_| panic!("expected valid: {name}"));
        }
    }

    #[test]
    fn invalid_names() {
        for name in ["", "-lead", "trail-", "has space", "Upper", "a.b", "../x"] {
            assert!(validate_name(name).is_err(), "expected invalid: {name}");
        }
    }

    #[test]
    fn tree_helpers() {
        let tree = Path::new("/c/repo");
        assert_eq!(
            command_source_dir(tree, "commit"),
            PathBuf::from("/c/repo/resources/slash-commands/commit")
        );
        assert_eq!(
            template_source(tree, "DSPy"),
            PathBuf::from("/c/repo/resources/claude.md-files/DSPy/CLAUDE.md")
        );
    }
}
