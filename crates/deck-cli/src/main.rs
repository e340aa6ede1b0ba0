mod cmd;
mod data_root;
mod output;
mod prompt;

use clap::{Parser, Subcommand};
use cmd::{
    cache::CacheSubcommand, collection::CollectionSubcommand, config::ConfigSubcommand,
    setup::SetupArgs,
};
use deck_core::config::{parse_bool, DeckConfig, Settings, TEAMS_ENV};
use std::path::PathBuf;

const CONFIG_REMEDY: &str =
    "fix it with 'agent-deck config edit' or reset it with 'agent-deck config init --force'";

#[derive(Parser)]
#[command(
    name = "agent-deck",
    about = "agent-deck: per-project Claude sessions in tmux, set up from reusable resource collections",
    long_about = "agent-deck: per-project Claude sessions in tmux, set up from reusable resource collections.\n\n\
        Typical flow: 'agent-deck setup <dir>' once per project, then 'agent-deck open <session>'.\n\
        'agent-deck list' shows every session with its state and task counts.",
    version,
    propagate_version = true
)]
struct Cli {
    /// Data directory (default: ~/.agent-deck)
    #[arg(long, global = true, env = "AGENT_DECK_HOME")]
    home: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log debug details to stderr
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick resources for a project, install them and record a session
    Setup(SetupArgs),

    /// Attach to a session, starting it from its record if it is not running
    Open { session: String },

    /// Add an assistant window to a running session.
    ///
    /// By default the window is standalone: it shares the terminal session
    /// but has no team identity and does not see the team's tasks. With
    /// --coordinated it joins the session's team (requires coordinated
    /// workers to be enabled).
    Spawn {
        session: String,
        /// Join the session's team instead of running standalone
        #[arg(long)]
        coordinated: bool,
    },

    /// List sessions with their state and task counts
    List,

    /// Stop a running session; its record is kept
    Kill { session: String },

    /// Show one session's record, state and tasks
    Status { session: String },

    /// Manage global settings
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Manage resource collections
    Collection {
        #[command(subcommand)]
        subcommand: CollectionSubcommand,
    },

    /// Inspect or manage the local resource cache
    Cache {
        #[command(subcommand)]
        subcommand: CacheSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let home = data_root::resolve_home(cli.home.as_deref())?;
    let json = cli.json;

    // `config` works on the raw file so a broken one can still be fixed.
    if let Commands::Config { subcommand } = cli.command {
        return cmd::config::run(&home, subcommand, json);
    }

    let teams_env = std::env::var(TEAMS_ENV).ok();
    let settings = match Settings::load(home.clone(), teams_env.as_deref()) {
        Ok(settings) => settings,
        // `list` always answers; it falls back to the defaults and says so.
        Err(e) if matches!(cli.command, Commands::List) => {
            eprintln!("warning: {e}");
            eprintln!("warning: listing with default settings; {CONFIG_REMEDY}");
            let teams = teams_env.as_deref().and_then(parse_bool).unwrap_or(false);
            Settings::new(home, DeckConfig::default(), teams)
        }
        Err(e) => return Err(anyhow::Error::new(e).context(format!("failed to load settings; {CONFIG_REMEDY}"))),
    };
    tracing::debug!(home = %settings.home.display(), coordination = settings.coordination_enabled(), "settings loaded");

    match cli.command {
        Commands::Setup(args) => cmd::setup::run(&settings, args, json),
        Commands::Open { session } => cmd::session::open(&settings, &session),
        Commands::Spawn {
            session,
            coordinated,
        } => cmd::session::spawn(&settings, &session, coordinated, json),
        Commands::List => cmd::session::list(&settings, json),
        Commands::Kill { session } => cmd::session::kill(&settings, &session, json),
        Commands::Status { session } => cmd::session::status(&settings, &session, json),
        Commands::Config { subcommand } => cmd::config::run(&settings.home, subcommand, json),
        Commands::Collection { subcommand } => cmd::collection::run(&settings, subcommand, json),
        Commands::Cache { subcommand } => cmd::cache::run(&settings, subcommand, json),
    }
}
