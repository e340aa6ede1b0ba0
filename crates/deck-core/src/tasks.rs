//! Read-only view of a team's task records.
//!
//! The records are written by the assistant's coordination layer. We never
//! write or repair them, and a malformed record must never stop a status
//! display, so anything unreadable is counted as pending.

use crate::error::Result;
use crate::paths;
use crate::types::TaskStatus;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl TaskCounts {
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.completed
    }

    fn add(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Completed => self.completed += 1,
        }
    }
}

impl std::fmt::Display for TaskCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pending, {} in progress, {} completed",
            self.pending, self.in_progress, self.completed
        )
    }
}

/// One task as shown by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskEntry {
    pub id: String,
    pub status: TaskStatus,
    pub subject: Option<String>,
    pub blocked_by: Vec<String>,
}

/// Aggregate counts for `team`. A missing directory yields zeros.
pub fn summarize(tasks_root: &Path, team: &str) -> Result<TaskCounts> {
    let mut counts = TaskCounts::default();
    for entry in read_team(tasks_root, team)? {
        counts.add(entry.status);
    }
    Ok(counts)
}

/// Every task record for `team`, sorted by id (numerically when both ids are
/// numbers).
pub fn read_team(tasks_root: &Path, team: &str) -> Result<Vec<TaskEntry>> {
    let dir = paths::team_tasks_dir(tasks_root, team);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        entries.push(parse_record(&path, stem));
    }
    entries.sort_by(|a, b| match (a.id.parse::<u64>(), b.id.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.id.cmp(&b.id),
    });
    Ok(entries)
}

fn parse_record(path: &Path, fallback_id: String) -> TaskEntry {
    let value = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|s| serde_json::from_str::<serde_json::Value>(&s).map_err(|e| e.to_string()));
    let value = match value {
        Ok(v) => v,
        Err(reason) => {
            tracing::warn!(path = %path.display(), %reason, "unreadable task record, counting as pending");
            return TaskEntry {
                id: fallback_id,
                status: TaskStatus::Pending,
                subject: None,
                blocked_by: Vec::new(),
            };
        }
    };

    let id = match value.get("id") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => fallback_id,
    };
    let status = TaskStatus::from_record(value.get("status").and_then(|s| s.as_str()));
    let subject = value
        .get("subject")
        .and_then(|s| s.as_str())
        .map(str::to_string);
    let blocked_by = value
        .get("blockedBy")
        .and_then(|b| b.as_array())
        .map(|ids| {
            ids.iter()
                .filter_map(|v| match v {
                    serde_json::Value::String(s) => Some(s.clone()),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    TaskEntry {
        id,
        status,
        subject,
        blocked_by,
    }
}
