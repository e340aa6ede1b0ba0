//! Copies command files and appends instruction templates into a project.
//!
//! Both halves are safe to re-run: commands are copied only when absent, and
//! templates are appended only when their marker line is not already in the
//! instruction file.

use crate::cache::ArtifactCache;
use crate::error::Result;
use crate::{io, paths};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Prefix of the marker line that tags an installed template.
pub const MARKER_PREFIX: &str = "awesome-claude-code";

/// The marker line for template `id`. Matched as a whole line.
pub fn marker(id: &str) -> String {
    format!("<!-- {MARKER_PREFIX}: {id} -->")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Command,
    Template,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Command => "command",
            ResourceKind::Template => "template",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallEntry {
    pub kind: ResourceKind,
    pub id: String,
    pub path: PathBuf,
}

/// A requested identifier that could not be installed. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingResource {
    pub kind: ResourceKind,
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    pub installed: Vec<InstallEntry>,
    pub skipped: Vec<InstallEntry>,
    pub missing: Vec<MissingResource>,
}

impl InstallReport {
    pub fn has_warnings(&self) -> bool {
        !self.missing.is_empty()
    }

    pub fn installed_ids(&self, kind: ResourceKind) -> Vec<&str> {
        ids(&self.installed, kind)
    }

    pub fn skipped_ids(&self, kind: ResourceKind) -> Vec<&str> {
        ids(&self.skipped, kind)
    }
}

fn ids(entries: &[InstallEntry], kind: ResourceKind) -> Vec<&str> {
    entries
        .iter()
        .filter(|e| e.kind == kind)
        .map(|e| e.id.as_str())
        .collect()
}

#[derive(Debug, Clone)]
pub struct Installer {
    tree: PathBuf,
    force: bool,
}

impl Installer {
    pub fn new(tree: impl Into<PathBuf>) -> Self {
        Self {
            tree: tree.into(),
            force: false,
        }
    }

    pub fn from_cache(cache: &ArtifactCache) -> Self {
        Self::new(cache.tree())
    }

    /// Overwrite command files that already exist in the project.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn install(
        &self,
        target: &Path,
        commands: &[String],
        templates: &[String],
    ) -> Result<InstallReport> {
        let mut report = InstallReport::default();
        for id in commands {
            self.install_command(target, id, &mut report)?;
        }
        for id in templates {
            self.install_template(target, id, &mut report)?;
        }
        tracing::info!(
            target = %target.display(),
            installed = report.installed.len(),
            skipped = report.skipped.len(),
            missing = report.missing.len(),
            "install finished"
        );
        Ok(report)
    }

    fn install_command(&self, target: &Path, id: &str, report: &mut InstallReport) -> Result<()> {
        let kind = ResourceKind::Command;
        if let Err(reason) = check_id(id) {
            report.missing.push(MissingResource {
                kind,
                id: id.to_string(),
                reason,
            });
            return Ok(());
        }
        let source = match locate_command(&paths::command_source_dir(&self.tree, id), id)? {
            Ok(p) => p,
            Err(reason) => {
                report.missing.push(MissingResource {
                    kind,
                    id: id.to_string(),
                    reason,
                });
                return Ok(());
            }
        };
        let file_name = source
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| format!("{id}.md").into());
        let dest = paths::claude_commands_dir(target).join(file_name);

        let entry = InstallEntry {
            kind,
            id: id.to_string(),
            path: dest.clone(),
        };
        let copied = if self.force {
            io::atomic_write(&dest, &std::fs::read(&source)?)?;
            true
        } else {
            io::copy_if_missing(&source, &dest)?
        };
        if copied {
            tracing::debug!(id, dest = %dest.display(), "installed command");
            report.installed.push(entry);
        } else {
            report.skipped.push(entry);
        }
        Ok(())
    }

    fn install_template(&self, target: &Path, id: &str, report: &mut InstallReport) -> Result<()> {
        let kind = ResourceKind::Template;
        if let Err(reason) = check_id(id) {
            report.missing.push(MissingResource {
                kind,
                id: id.to_string(),
                reason,
            });
            return Ok(());
        }
        let source = paths::template_source(&self.tree, id);
        if !source.is_file() {
            report.missing.push(MissingResource {
                kind,
                id: id.to_string(),
                reason: format!("no template at {}", source.display()),
            });
            return Ok(());
        }

        let dest = paths::claude_md_path(target);
        let entry = InstallEntry {
            kind,
            id: id.to_string(),
            path: dest.clone(),
        };
        let marker = marker(id);
        let existing = io::read_or_empty(&dest)?;
        if existing.lines().any(|l| l.trim_end() == marker) {
            report.skipped.push(entry);
            return Ok(());
        }

        let body = std::fs::read_to_string(&source)?;
        io::append_block(&dest, &format!("{marker}\n\n{body}"))?;
        tracing::debug!(id, dest = %dest.display(), "appended template");
        report.installed.push(entry);
        Ok(())
    }
}

/// Identifiers become path components; refuse anything that could escape.
fn check_id(id: &str) -> std::result::Result<(), String> {
    if id.is_empty()
        || id.contains('/')
        || id.contains('\\')
        || id.contains("..")
        || id.contains('\0')
    {
        return Err(format!("invalid identifier '{id}'"));
    }
    Ok(())
}

/// Find the one markdown file for command `id`. `<id>.md` wins; otherwise
/// the directory must hold exactly one `.md` file.
fn locate_command(dir: &Path, id: &str) -> Result<std::result::Result<PathBuf, String>> {
    if !dir.is_dir() {
        return Ok(Err(format!("no command directory at {}", dir.display())));
    }
    let preferred = dir.join(format!("{id}.md"));
    if preferred.is_file() {
        return Ok(Ok(preferred));
    }
    let mut candidates: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("md") {
            candidates.push(path);
        }
    }
    candidates.sort();
    match candidates.len() {
        0 => Ok(Err(format!("no markdown file in {}", dir.display()))),
        1 => Ok(Ok(candidates.remove(0))),
        n => Ok(Err(format!(
            "{n} markdown files in {} and none named {id}.md",
            dir.display()
        ))),
    }
}
