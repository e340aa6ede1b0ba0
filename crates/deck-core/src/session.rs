//! Session records: one persisted file per project, keyed by a session name
//! derived from the project's directory.

use crate::error::{DeckError, Result};
use crate::paths;
use crate::types::{Domain, Need};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Name derivation
// ---------------------------------------------------------------------------

static NON_ALNUM_RE: OnceLock<Regex> = OnceLock::new();

fn non_alnum_re() -> &'static Regex {
    NON_ALNUM_RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
}

/// Lowercase `s` and collapse every run of other characters into one `-`.
pub fn normalize(s: &str) -> String {
    let lower = s.to_lowercase();
    let replaced = non_alnum_re().replace_all(&lower, "-");
    let trimmed = replaced.trim_matches('-');
    if trimmed.is_empty() {
        "project".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Length of the `-xxxxxx` collision suffix.
const SUFFIX_LEN: usize = 7;

/// Display name for a project: `prefix` + normalized directory basename.
/// Depends only on its inputs, so the same path always gives the same name.
///
/// The basename is cut so the name stays a valid name even after a
/// collision suffix is appended.
pub fn session_name_from_path(prefix: &str, project: &Path) -> String {
    let base = project
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let budget = paths::MAX_NAME_LEN
        .saturating_sub(SUFFIX_LEN + prefix.len())
        .max(1);
    let normalized = normalize(&base);
    // normalize() only emits ASCII, so byte slicing is safe.
    let cut = normalized[..normalized.len().min(budget)].trim_end_matches('-');
    format!("{prefix}{cut}")
}

/// Team identifier for a session: the name without its prefix.
pub fn team_from_name(prefix: &str, name: &str) -> String {
    name.strip_prefix(prefix)
        .filter(|s| !s.is_empty())
        .unwrap_or(name)
        .to_string()
}

fn path_suffix(project: &Path) -> String {
    let digest = Sha256::digest(project.to_string_lossy().as_bytes());
    digest.iter().take(3).map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// SessionRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub name: String,
    pub project_dir: PathBuf,
    pub domain: Domain,
    #[serde(default)]
    pub needs: Vec<Need>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub templates: Vec<String>,
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Content equality, ignoring timestamps.
    pub fn same_content(&self, other: &SessionRecord) -> bool {
        self.name == other.name
            && self.project_dir == other.project_dir
            && self.domain == other.domain
            && self.needs == other.needs
            && self.commands == other.commands
            && self.templates == other.templates
            && self.team == other.team
            && self.collection == other.collection
    }
}

/// Inputs for creating or updating a session record.
#[derive(Debug, Clone)]
pub struct SessionSpec {
    pub project_dir: PathBuf,
    pub domain: Domain,
    pub needs: Vec<Need>,
    pub commands: Vec<String>,
    pub templates: Vec<String>,
    pub collection: Option<String>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The sessions directory under the data root.
#[derive(Debug, Clone)]
pub struct Registry {
    home: PathBuf,
    prefix: String,
}

impl Registry {
    pub fn new(home: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn load(&self, name: &str) -> Result<SessionRecord> {
        if paths::validate_name(name).is_err() {
            return Err(DeckError::NoConfig(name.to_string()));
        }
        let path = paths::session_record(&self.home, name);
        if !path.exists() {
            return Err(DeckError::NoConfig(name.to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        serde_yaml::from_str(&data).map_err(|e| DeckError::MalformedRecord {
            path,
            reason: e.to_string(),
        })
    }

    pub fn save(&self, record: &SessionRecord) -> Result<()> {
        paths::validate_name(&record.name)?;
        let path = paths::session_record(&self.home, &record.name);
        let data = serde_yaml::to_string(record)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// All readable records, sorted by name. Malformed files are logged and
    /// skipped so one bad record never hides the rest.
    pub fn list(&self) -> Result<Vec<SessionRecord>> {
        let dir = paths::sessions_dir(&self.home);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(paths::RECORD_EXT) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load(name) {
                Ok(r) => records.push(r),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping session record"),
            }
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    pub fn find_by_path(&self, project: &Path) -> Result<Option<SessionRecord>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|r| r.project_dir == project))
    }

    /// The session name owned by `project`.
    ///
    /// An existing record for the same path keeps its name. Otherwise the
    /// display name is used, with a path-derived suffix when another
    /// project already holds it.
    pub fn resolve_name(&self, project: &Path) -> Result<String> {
        if let Some(existing) = self.find_by_path(project)? {
            return Ok(existing.name);
        }
        let base = session_name_from_path(&self.prefix, project);
        match self.load(&base) {
            Err(DeckError::NoConfig(_)) => Ok(base),
            Ok(other) if other.project_dir == project => Ok(base),
            Ok(_) | Err(DeckError::MalformedRecord { .. }) => {
                Ok(format!("{base}-{}", path_suffix(project)))
            }
            Err(e) => Err(e),
        }
    }

    /// Create the record for `spec.project_dir`, or update it in place.
    /// Returns the stored record and whether it was newly created.
    pub fn upsert(&self, spec: SessionSpec) -> Result<(SessionRecord, bool)> {
        let name = self.resolve_name(&spec.project_dir)?;
        let existing = match self.load(&name) {
            Ok(r) => Some(r),
            Err(DeckError::NoConfig(_)) => None,
            Err(e) => return Err(e),
        };
        let now = Utc::now();
        let record = SessionRecord {
            team: team_from_name(&self.prefix, &name),
            name,
            project_dir: spec.project_dir,
            domain: spec.domain,
            needs: spec.needs,
            commands: spec.commands,
            templates: spec.templates,
            collection: spec.collection,
            created_at: existing.as_ref().map(|r| r.created_at).unwrap_or(now),
            updated_at: now,
        };
        self.save(&record)?;
        Ok((record, existing.is_none()))
    }
}
