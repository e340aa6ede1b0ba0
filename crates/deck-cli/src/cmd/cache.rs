use crate::output::{print_fields, print_json};
use anyhow::Context;
use chrono::Utc;
use clap::Subcommand;
use deck_core::cache::{ArtifactCache, CacheStatus};
use deck_core::config::Settings;
use deck_core::fetch::GitFetcher;

#[derive(Subcommand)]
pub enum CacheSubcommand {
    /// Show where the cache lives and how old it is
    Status,

    /// Fetch upstream changes now, regardless of age
    Refresh,

    /// Delete the cache; the next setup fetches it again
    Clear,
}

pub fn run(settings: &Settings, subcmd: CacheSubcommand, json: bool) -> anyhow::Result<()> {
    let cache = ArtifactCache::from_settings(settings);
    match subcmd {
        CacheSubcommand::Status => status(&cache, json),
        CacheSubcommand::Refresh => refresh(&cache, json),
        CacheSubcommand::Clear => clear(&cache, json),
    }
}

fn age(cache: &ArtifactCache) -> String {
    let Some(at) = cache.last_fetch() else {
        return "never".to_string();
    };
    let minutes = Utc::now().signed_duration_since(at).num_minutes().max(0);
    let ago = match minutes {
        0 => "just now".to_string(),
        m if m < 60 => format!("{m}m ago"),
        m if m < 48 * 60 => format!("{}h ago", m / 60),
        m => format!("{}d ago", m / (24 * 60)),
    };
    format!("{} ({ago})", at.format("%Y-%m-%d %H:%M UTC"))
}

fn status(cache: &ArtifactCache, json: bool) -> anyhow::Result<()> {
    let info = cache.info();
    if json {
        return print_json(&info);
    }
    print_fields(&[
        ("Directory", info.dir.display().to_string()),
        ("Source", info.source.clone()),
        ("Complete", if info.complete { "yes" } else { "no" }.to_string()),
        ("Last fetch", age(cache)),
        ("Stale", if info.stale { "yes" } else { "no" }.to_string()),
    ]);
    if info.locked {
        println!();
        println!(
            "A lock is held at {}. If no other agent-deck is running, remove it by hand.",
            deck_core::paths::cache_lock(cache.dir()).display()
        );
    }
    Ok(())
}

fn refresh(cache: &ArtifactCache, json: bool) -> anyhow::Result<()> {
    let status = cache
        .refresh(&GitFetcher)
        .with_context(|| format!("failed to refresh cache at {}", cache.dir().display()))?;
    let (label, note) = match &status {
        CacheStatus::Fetched => ("fetched", None),
        CacheStatus::Refreshed | CacheStatus::Fresh => ("refreshed", None),
        CacheStatus::Stale { reason } => ("stale", Some(reason.clone())),
    };
    if json {
        return print_json(&serde_json::json!({ "status": label, "warning": note }));
    }
    match note {
        Some(reason) => eprintln!("warning: cache not refreshed, keeping the existing copy ({reason})"),
        None => println!("Cache {label}: {}", cache.tree().display()),
    }
    Ok(())
}

fn clear(cache: &ArtifactCache, json: bool) -> anyhow::Result<()> {
    let removed = cache
        .clear()
        .with_context(|| format!("failed to clear cache at {}", cache.dir().display()))?;
    if json {
        return print_json(&serde_json::json!({ "removed": removed }));
    }
    if removed {
        println!("Removed {}", cache.dir().display());
    } else {
        println!("Cache is already empty.");
    }
    Ok(())
}
