use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use deck_core::config::{parse_bool, DeckConfig, TEAMS_ENV};
use deck_core::paths;
use std::path::Path;
use std::process::Command;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show every setting with its current value
    Show,

    /// Set one setting
    Set {
        /// Setting name (see `config show`)
        key: String,
        value: String,
    },

    /// Open config.yaml in $VISUAL / $EDITOR
    Edit,

    /// Write a config.yaml with the defaults
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

// Takes the data root rather than loaded settings so a malformed file can
// still be repaired with `edit` or `init --force`.
pub fn run(home: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(home, json),
        ConfigSubcommand::Set { key, value } => set(home, &key, &value, json),
        ConfigSubcommand::Edit => edit(home),
        ConfigSubcommand::Init { force } => init(home, force, json),
    }
}

fn load(home: &Path) -> anyhow::Result<DeckConfig> {
    DeckConfig::load(home).context("failed to load config (fix it with 'agent-deck config edit')")
}

// ---------------------------------------------------------------------------
// show / set
// ---------------------------------------------------------------------------

fn show(home: &Path, json: bool) -> anyhow::Result<()> {
    let config = load(home)?;
    let env_flag = std::env::var(TEAMS_ENV)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(false);

    if json {
        return print_json(&serde_json::json!({
            "path": paths::config_path(home),
            "config": config,
            "coordination_enabled": config.coordinated_workers || env_flag,
        }));
    }

    println!("# {}", paths::config_path(home).display());
    let rows: Vec<Vec<String>> = config
        .entries()
        .into_iter()
        .map(|(k, v)| {
            let shown = if v.is_empty() { "(default)".to_string() } else { v };
            vec![k.to_string(), shown]
        })
        .collect();
    print_table(&["KEY", "VALUE"], &rows);
    if env_flag && !config.coordinated_workers {
        println!();
        println!("Coordinated workers are enabled by {TEAMS_ENV} in the environment.");
    }
    Ok(())
}

fn set(home: &Path, key: &str, value: &str, json: bool) -> anyhow::Result<()> {
    let mut config = load(home)?;
    config.set(key, value)?;
    config
        .save(home)
        .with_context(|| format!("failed to write {}", paths::config_path(home).display()))?;
    let stored = config.get(key)?;
    if json {
        print_json(&serde_json::json!({ "key": key, "value": stored }))?;
    } else {
        println!("{key} = {stored}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// init / edit
// ---------------------------------------------------------------------------

fn init(home: &Path, force: bool, json: bool) -> anyhow::Result<()> {
    let path = paths::config_path(home);
    let written = if path.exists() && !force {
        false
    } else {
        DeckConfig::default()
            .save(home)
            .with_context(|| format!("failed to write {}", path.display()))?;
        true
    };
    if json {
        print_json(&serde_json::json!({ "path": path, "written": written }))?;
    } else if written {
        println!("Wrote defaults to {}", path.display());
    } else {
        println!("{} already exists (use --force to reset it)", path.display());
    }
    Ok(())
}

fn edit(home: &Path) -> anyhow::Result<()> {
    let path = paths::config_path(home);
    if !path.exists() {
        DeckConfig::default()
            .save(home)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let editor = ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty());
    match editor {
        Some(editor) => {
            let mut parts = editor.split_whitespace();
            let program = parts.next().unwrap_or_default();
            let status = Command::new(program)
                .args(parts)
                .arg(&path)
                .status()
                .with_context(|| format!("failed to launch editor '{editor}'"))?;
            if !status.success() {
                anyhow::bail!("editor '{editor}' exited with {status}");
            }
        }
        None => {
            open::that(&path).with_context(|| format!("failed to open {}", path.display()))?;
            println!("Opened {}", path.display());
            return Ok(());
        }
    }

    // Reject the edit early instead of at the next command.
    load(home)?;
    Ok(())
}
