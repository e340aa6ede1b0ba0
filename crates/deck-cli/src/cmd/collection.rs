use crate::output::{print_fields, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use deck_core::collection::{self, Collection};
use deck_core::config::Settings;
use deck_core::types::{needs_display, parse_needs, Domain, Need};

type NeedList = Vec<Need>;

#[derive(Subcommand)]
pub enum CollectionSubcommand {
    /// List saved collections
    List,

    /// Show the resources in one collection
    Show { name: String },

    /// Resolve a domain and needs into a named collection
    Create {
        name: String,
        /// Domain: ml, data-platform, backend, frontend, devops, cli, general
        #[arg(long)]
        domain: Domain,
        /// Extras, comma separated: git, quality, context, docs, deploy
        #[arg(long, value_parser = parse_needs)]
        needs: Option<NeedList>,
        /// Replace an existing collection with the same name
        #[arg(long)]
        force: bool,
    },
}

pub fn run(settings: &Settings, subcmd: CollectionSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        CollectionSubcommand::List => list(settings, json),
        CollectionSubcommand::Show { name } => show(settings, &name, json),
        CollectionSubcommand::Create {
            name,
            domain,
            needs,
            force,
        } => create(settings, &name, domain, &needs.unwrap_or_default(), force, json),
    }
}

fn list(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let summaries = Collection::list(&settings.home).context("failed to list collections")?;
    if json {
        return print_json(&summaries);
    }
    if summaries.is_empty() {
        println!("No collections. Create one with 'agent-deck collection create <name> --domain <domain>'.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = summaries
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.domain.to_string(),
                needs_display(&c.needs),
                c.commands.to_string(),
                c.templates.to_string(),
                c.created_at.format("%Y-%m-%d").to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "DOMAIN", "NEEDS", "COMMANDS", "TEMPLATES", "CREATED"], &rows);
    Ok(())
}

fn print_collection(c: &Collection) {
    print_fields(&[
        ("Collection", c.name.clone()),
        ("Domain", c.domain.to_string()),
        ("Needs", needs_display(&c.needs)),
        ("Commands", c.commands.join(", ")),
        (
            "Templates",
            if c.templates.is_empty() {
                "(none)".to_string()
            } else {
                c.templates.join(", ")
            },
        ),
        ("Created", c.created_at.format("%Y-%m-%d %H:%M UTC").to_string()),
    ]);
}

fn show(settings: &Settings, name: &str, json: bool) -> anyhow::Result<()> {
    let c = Collection::load(&settings.home, name)?;
    if json {
        return print_json(&c);
    }
    print_collection(&c);
    Ok(())
}

fn create(
    settings: &Settings,
    name: &str,
    domain: Domain,
    needs: &[Need],
    force: bool,
    json: bool,
) -> anyhow::Result<()> {
    let c = collection::save(&settings.home, name, domain, needs, force)?;
    if json {
        return print_json(&c);
    }
    println!("Saved collection '{name}'.");
    print_collection(&c);
    Ok(())
}
