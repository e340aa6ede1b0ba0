use crate::error::DeckError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    Ml,
    DataPlatform,
    Backend,
    Frontend,
    Devops,
    Cli,
    General,
}

impl Domain {
    /// Menu order used by the guided setup.
    pub fn all() -> &'static [Domain] {
        &[
            Domain::Ml,
            Domain::DataPlatform,
            Domain::Backend,
            Domain::Frontend,
            Domain::Devops,
            Domain::Cli,
            Domain::General,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Ml => "ml",
            Domain::DataPlatform => "data-platform",
            Domain::Backend => "backend",
            Domain::Frontend => "frontend",
            Domain::Devops => "devops",
            Domain::Cli => "cli",
            Domain::General => "general",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Domain::Ml => "Machine learning / MLOps",
            Domain::DataPlatform => "Data platform (Databricks, Spark)",
            Domain::Backend => "Backend services / APIs",
            Domain::Frontend => "Frontend / web UI",
            Domain::Devops => "DevOps / CI / infrastructure",
            Domain::Cli => "CLI tools",
            Domain::General => "General purpose",
        }
    }

    /// 1-based position in the setup menu.
    pub fn menu_number(self) -> usize {
        self as usize + 1
    }

    pub fn from_menu_number(n: usize) -> Option<Domain> {
        n.checked_sub(1).and_then(|i| Domain::all().get(i).copied())
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Domain {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ml" => Ok(Domain::Ml),
            "data-platform" => Ok(Domain::DataPlatform),
            "backend" => Ok(Domain::Backend),
            "frontend" => Ok(Domain::Frontend),
            "devops" => Ok(Domain::Devops),
            "cli" => Ok(Domain::Cli),
            "general" => Ok(Domain::General),
            _ => Err(DeckError::InvalidDomain(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Need
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Need {
    Git,
    Quality,
    Context,
    Docs,
    Deploy,
}

impl Need {
    pub fn all() -> &'static [Need] {
        &[
            Need::Git,
            Need::Quality,
            Need::Context,
            Need::Docs,
            Need::Deploy,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Need::Git => "git",
            Need::Quality => "quality",
            Need::Context => "context",
            Need::Docs => "docs",
            Need::Deploy => "deploy",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Need::Git => "Git workflow (commits, PRs, issues)",
            Need::Quality => "Code quality and testing",
            Need::Context => "Context priming",
            Need::Docs => "Documentation",
            Need::Deploy => "Releases and deployment",
        }
    }

    pub fn menu_number(self) -> usize {
        self as usize + 1
    }

    pub fn from_menu_number(n: usize) -> Option<Need> {
        n.checked_sub(1).and_then(|i| Need::all().get(i).copied())
    }
}

impl fmt::Display for Need {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Need {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "git" => Ok(Need::Git),
            "quality" => Ok(Need::Quality),
            "context" => Ok(Need::Context),
            "docs" => Ok(Need::Docs),
            "deploy" => Ok(Need::Deploy),
            _ => Err(DeckError::InvalidNeed(s.to_string())),
        }
    }
}

/// Parse a comma- or whitespace-separated list of need names, deduplicated
/// and kept in canonical order.
pub fn parse_needs(s: &str) -> Result<Vec<Need>, DeckError> {
    let mut needs = Vec::new();
    for token in s.split(|c: char| c == ',' || c.is_whitespace()) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        needs.push(token.parse::<Need>()?);
    }
    needs.sort();
    needs.dedup();
    Ok(needs)
}

pub fn needs_display(needs: &[Need]) -> String {
    if needs.is_empty() {
        return "(none)".to_string();
    }
    needs
        .iter()
        .map(|n| n.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Status of an externally produced task record. Ordered: a task only ever
/// moves forward through these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Strict match against the producer's status strings. Anything else,
    /// including case variants, is treated as pending.
    pub fn from_record(raw: Option<&str>) -> TaskStatus {
        match raw {
            Some("completed") => TaskStatus::Completed,
            Some("in_progress") => TaskStatus::InProgress,
            _ => TaskStatus::Pending,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
