use crate::data_root;
use crate::output::print_json;
use crate::prompt::Prompter;
use anyhow::Context;
use clap::Args;
use deck_core::cache::{ArtifactCache, CacheStatus};
use deck_core::collection::{self, Collection};
use deck_core::config::Settings;
use deck_core::detect;
use deck_core::fetch::GitFetcher;
use deck_core::installer::{InstallReport, Installer, ResourceKind};
use deck_core::session::{Registry, SessionSpec};
use deck_core::types::{needs_display, parse_needs, Domain, Need};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;

// An alias keeps clap from treating the list as a repeated argument.
type NeedList = Vec<Need>;

#[derive(Args, Debug, Default)]
pub struct SetupArgs {
    /// Project directory (default: current directory)
    pub dir: Option<PathBuf>,

    /// Domain: ml, data-platform, backend, frontend, devops, cli, general
    #[arg(long, conflicts_with = "from")]
    pub domain: Option<Domain>,

    /// Extras, comma separated: git, quality, context, docs, deploy
    #[arg(long, value_parser = parse_needs, conflicts_with = "from")]
    pub needs: Option<NeedList>,

    /// Use the resources of an existing collection
    #[arg(long, value_name = "COLLECTION")]
    pub from: Option<String>,

    /// Save the resolved choices as a collection under this name
    #[arg(long, value_name = "NAME")]
    pub collection: Option<String>,

    /// Overwrite command files that already exist in the project
    #[arg(long)]
    pub force: bool,

    /// Do not prompt; requires --domain or --from
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// The resources a setup run will install, and where they came from.
#[derive(Debug, Clone)]
struct Selection {
    domain: Domain,
    needs: Vec<Need>,
    commands: Vec<String>,
    templates: Vec<String>,
    collection: Option<String>,
}

#[derive(Serialize)]
struct SetupOutput<'a> {
    session: &'a str,
    created: bool,
    project_dir: &'a std::path::Path,
    domain: Domain,
    needs: &'a [Need],
    collection: Option<&'a str>,
    cache: &'a str,
    install: &'a InstallReport,
}

pub fn run(settings: &Settings, args: SetupArgs, json: bool) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), std::io::stderr());
    run_with(settings, args, json, &mut prompter)
}

fn aborted() -> anyhow::Result<()> {
    eprintln!("Setup cancelled; nothing was changed.");
    Ok(())
}

fn run_with<R: BufRead, W: Write>(
    settings: &Settings,
    args: SetupArgs,
    json: bool,
    prompter: &mut Prompter<R, W>,
) -> anyhow::Result<()> {
    let project = data_root::resolve_project(args.dir.as_deref())?;
    settings
        .ensure_dirs()
        .with_context(|| format!("failed to create data directory {}", settings.home.display()))?;

    let Some(selection) = select(settings, &args, &project, prompter)? else {
        return aborted();
    };
    let save_as = match (&args.collection, args.yes || args.from.is_some()) {
        (Some(name), _) => Some(name.clone()),
        (None, true) => None,
        (None, false) => match prompter.collection_name()? {
            Some(name) => name,
            None => return aborted(),
        },
    };

    if !args.yes {
        eprintln!();
        eprintln!("Project:   {}", project.display());
        eprintln!("Domain:    {}", selection.domain);
        eprintln!("Needs:     {}", needs_display(&selection.needs));
        eprintln!("Commands:  {}", selection.commands.join(", "));
        eprintln!("Templates: {}", list_or_none(&selection.templates));
        match prompter.confirm("Install these into the project?", true)? {
            Some(true) => {}
            _ => return aborted(),
        }
    }

    let cache = ArtifactCache::from_settings(settings);
    let status = cache
        .ensure(&GitFetcher)
        .with_context(|| format!("failed to prepare resource cache at {}", cache.dir().display()))?;
    if let CacheStatus::Stale { reason } = &status {
        eprintln!("warning: using cached resources that could not be refreshed ({reason})");
    }

    let report = Installer::from_cache(&cache)
        .force(args.force)
        .install(&project, &selection.commands, &selection.templates)
        .with_context(|| format!("failed to install resources into {}", project.display()))?;

    // Saved only once the install went through, so a failed fetch leaves no
    // half-finished collection behind.
    if let Some(name) = &save_as {
        collection::save(&settings.home, name, selection.domain, &selection.needs, true)
            .with_context(|| format!("failed to save collection '{name}'"))?;
    }

    let registry = Registry::new(&settings.home, settings.config.session_prefix.clone());
    let (record, created) = registry
        .upsert(SessionSpec {
            project_dir: project.clone(),
            domain: selection.domain,
            needs: selection.needs.clone(),
            commands: selection.commands.clone(),
            templates: selection.templates.clone(),
            collection: selection
                .collection
                .clone()
                .or_else(|| save_as.clone()),
        })
        .context("failed to save session record")?;

    if json {
        return print_json(&SetupOutput {
            session: &record.name,
            created,
            project_dir: &record.project_dir,
            domain: record.domain,
            needs: &record.needs,
            collection: record.collection.as_deref(),
            cache: cache_label(&status),
            install: &report,
        });
    }

    print_report(&report);
    let verb = if created { "Created" } else { "Updated" };
    println!("{verb} session {} for {}", record.name, record.project_dir.display());
    println!("Next: agent-deck open {}", record.name);
    Ok(())
}

fn select<R: BufRead, W: Write>(
    settings: &Settings,
    args: &SetupArgs,
    project: &std::path::Path,
    prompter: &mut Prompter<R, W>,
) -> anyhow::Result<Option<Selection>> {
    if let Some(name) = &args.from {
        let c = Collection::load(&settings.home, name)?;
        return Ok(Some(Selection {
            domain: c.domain,
            needs: c.needs,
            commands: c.commands,
            templates: c.templates,
            collection: Some(c.name),
        }));
    }

    let domain = match (args.domain, args.yes) {
        (Some(d), _) => d,
        (None, true) => anyhow::bail!("--yes needs --domain or --from"),
        (None, false) => match prompter.choose_domain(&detect::detect(project))? {
            Some(d) => d,
            None => return Ok(None),
        },
    };
    let needs = match (&args.needs, args.yes) {
        (Some(n), _) => n.clone(),
        (None, true) => Vec::new(),
        (None, false) => match prompter.choose_needs()? {
            Some(n) => n,
            None => return Ok(None),
        },
    };
    let resolved = Collection::resolve("setup", domain, &needs);
    Ok(Some(Selection {
        domain,
        needs: resolved.needs,
        commands: resolved.commands,
        templates: resolved.templates,
        collection: None,
    }))
}

fn cache_label(status: &CacheStatus) -> &'static str {
    match status {
        CacheStatus::Fresh => "fresh",
        CacheStatus::Fetched => "fetched",
        CacheStatus::Refreshed => "refreshed",
        CacheStatus::Stale { .. } => "stale",
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

fn print_report(report: &InstallReport) {
    for kind in [ResourceKind::Command, ResourceKind::Template] {
        let installed = report.installed_ids(kind);
        let skipped = report.skipped_ids(kind);
        if !installed.is_empty() {
            println!("Installed {}s: {}", kind.as_str(), installed.join(", "));
        }
        if !skipped.is_empty() {
            println!("Already present {}s: {}", kind.as_str(), skipped.join(", "));
        }
    }
    for missing in &report.missing {
        eprintln!(
            "warning: {} '{}' not installed: {}",
            missing.kind.as_str(),
            missing.id,
            missing.reason
        );
    }
}
