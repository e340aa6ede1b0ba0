//! Fixed mapping from domain and needs to the commands and templates a
//! project receives.
//!
//! Every domain and every need maps to a (possibly empty) set, and the
//! baseline commands are always included. Resolution is pure so it can be
//! checked exhaustively.

use crate::types::{Domain, Need};
use serde::{Deserialize, Serialize};

/// Commands every project gets regardless of domain or needs.
pub const BASELINE_COMMANDS: &[&str] = &["commit", "pr-review", "todo"];

pub fn commands_for_domain(domain: Domain) -> &'static [&'static str] {
    match domain {
        Domain::Ml => &["mlflow-log-model", "uc-register-model"],
        Domain::DataPlatform => &["databricks-job", "databricks-deploy-bundle"],
        Domain::Backend => &[],
        Domain::Frontend => &[],
        Domain::Devops => &["act", "create-hook"],
        Domain::Cli => &[],
        Domain::General => &[],
    }
}

pub fn templates_for_domain(domain: Domain) -> &'static [&'static str] {
    match domain {
        Domain::Ml => &["MLflow-Databricks", "DSPy"],
        Domain::DataPlatform => &["MLflow-Databricks", "Metabase"],
        Domain::Backend => &["SG-Cars-Trends-Backend", "AWS-MCP-Server"],
        Domain::Frontend => &["Giselle", "LangGraphJS"],
        Domain::Devops => &["AWS-MCP-Server"],
        Domain::Cli => &["Cursor-Tools"],
        Domain::General => &[],
    }
}

pub fn commands_for_need(need: Need) -> &'static [&'static str] {
    match need {
        Need::Git => &["create-pr", "fix-github-issue", "create-worktrees"],
        Need::Quality => &["testing_plan_integration", "optimize"],
        Need::Context => &["context-prime", "initref"],
        Need::Docs => &["update-docs", "add-to-changelog"],
        Need::Deploy => &["release"],
    }
}

pub fn templates_for_need(need: Need) -> &'static [&'static str] {
    match need {
        Need::Git | Need::Quality | Need::Context | Need::Docs | Need::Deploy => &[],
    }
}

/// The resolved resource identifiers for one domain/needs selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub commands: Vec<String>,
    pub templates: Vec<String>,
}

/// Resolve commands and templates for `domain` and `needs`.
///
/// Output order is baseline, then domain, then needs in the order given,
/// with later duplicates dropped. Callers must not rely on the order.
pub fn resolve(domain: Domain, needs: &[Need]) -> Resources {
    let mut commands: Vec<String> = Vec::new();
    let mut templates: Vec<String> = Vec::new();

    let command_sources = BASELINE_COMMANDS
        .iter()
        .chain(commands_for_domain(domain))
        .chain(needs.iter().flat_map(|n| commands_for_need(*n)));
    for id in command_sources {
        push_unique(&mut commands, id);
    }

    let template_sources = templates_for_domain(domain)
        .iter()
        .chain(needs.iter().flat_map(|n| templates_for_need(*n)));
    for id in template_sources {
        push_unique(&mut templates, id);
    }

    Resources {
        commands,
        templates,
    }
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|s| s == id) {
        list.push(id.to_string());
    }
}
