use crate::output::{print_fields, print_json, print_table};
use anyhow::Context;
use deck_core::config::Settings;
use deck_core::mux::Tmux;
use deck_core::orchestrator::{OpenOutcome, Orchestrator, SessionStatus, WorkerKind};
use deck_core::tasks::TaskCounts;
use deck_core::types::needs_display;

// ---------------------------------------------------------------------------
// open / spawn / kill
// ---------------------------------------------------------------------------

pub fn open(settings: &Settings, name: &str) -> anyhow::Result<()> {
    let tmux = Tmux::detect();
    let orch = Orchestrator::new(settings, &tmux);
    match orch.open(name)? {
        OpenOutcome::Reattached => tracing::debug!(session = name, "reattached"),
        OpenOutcome::Started => tracing::debug!(session = name, "started and attached"),
    }
    Ok(())
}

pub fn spawn(settings: &Settings, name: &str, coordinated: bool, json: bool) -> anyhow::Result<()> {
    let tmux = Tmux::detect();
    let orch = Orchestrator::new(settings, &tmux);
    let kind = if coordinated {
        orch.coordinated_worker(name)?
    } else {
        WorkerKind::Standalone
    };
    let window = orch
        .spawn(name, kind.clone())
        .with_context(|| format!("failed to spawn a worker in '{name}'"))?;

    if json {
        return print_json(&serde_json::json!({
            "session": name,
            "window": window,
            "coordinated": coordinated,
        }));
    }
    match kind {
        WorkerKind::Coordinated { team_id } => {
            println!("Spawned coordinated worker '{window}' in {name} (team {team_id}).")
        }
        WorkerKind::Standalone => {
            println!("Spawned standalone window '{window}' in {name}.");
            println!("It shares the terminal session only, not the team's tasks; use --coordinated for a team worker.");
        }
    }
    Ok(())
}

pub fn kill(settings: &Settings, name: &str, json: bool) -> anyhow::Result<()> {
    let tmux = Tmux::detect();
    Orchestrator::new(settings, &tmux).kill(name)?;
    if json {
        return print_json(&serde_json::json!({ "session": name, "killed": true }));
    }
    println!("Killed {name}. The record is kept; reopen with 'agent-deck open {name}'.");
    Ok(())
}

// ---------------------------------------------------------------------------
// list / status
// ---------------------------------------------------------------------------

fn state_label(s: &SessionStatus) -> String {
    if !s.live {
        return "idle".to_string();
    }
    let plural = if s.windows == 1 { "" } else { "s" };
    let attached = if s.attached { ", attached" } else { "" };
    format!("running, {} window{plural}{attached}", s.windows)
}

fn tasks_label(t: &TaskCounts) -> String {
    if t.total() == 0 {
        return "-".to_string();
    }
    format!("{}/{} done, {} active", t.completed, t.total(), t.in_progress)
}

pub fn list(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let tmux = Tmux::detect();
    let statuses = Orchestrator::new(settings, &tmux)
        .list()
        .context("failed to list sessions")?;

    if json {
        return print_json(&statuses);
    }
    if statuses.is_empty() {
        println!("No sessions. Run 'agent-deck setup <project-dir>' to create one.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = statuses
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                state_label(s),
                s.domain.to_string(),
                tasks_label(&s.tasks),
                s.project_dir.display().to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "STATE", "DOMAIN", "TASKS", "PROJECT"], &rows);
    Ok(())
}

pub fn status(settings: &Settings, name: &str, json: bool) -> anyhow::Result<()> {
    let tmux = Tmux::detect();
    let detail = Orchestrator::new(settings, &tmux).status(name)?;
    if json {
        return print_json(&detail);
    }

    let record = &detail.record;
    print_fields(&[
        ("Session", record.name.clone()),
        ("Project", record.project_dir.display().to_string()),
        ("State", state_label(&detail.status)),
        ("Domain", record.domain.to_string()),
        ("Needs", needs_display(&record.needs)),
        ("Collection", record.collection.clone().unwrap_or_else(|| "-".into())),
        ("Team", record.team.clone()),
        ("Commands", record.commands.join(", ")),
        ("Templates", record.templates.join(", ")),
        ("Tasks", detail.status.tasks.to_string()),
        ("Updated", record.updated_at.format("%Y-%m-%d %H:%M UTC").to_string()),
    ]);

    if !detail.task_list.is_empty() {
        println!();
        let rows: Vec<Vec<String>> = detail
            .task_list
            .iter()
            .map(|t| {
                vec![
                    t.id.clone(),
                    t.status.to_string(),
                    if t.blocked_by.is_empty() {
                        "-".to_string()
                    } else {
                        t.blocked_by.join(",")
                    },
                    t.subject.clone().unwrap_or_default(),
                ]
            })
            .collect();
        print_table(&["ID", "STATUS", "BLOCKED BY", "SUBJECT"], &rows);
    }
    Ok(())
}
