#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A data root with a fresh, pre-seeded resource cache so setup never
/// touches the network, plus a project directory named `proj`.
struct Deck {
    dir: TempDir,
}

impl Deck {
    fn new() -> Self {
        let deck = Deck {
            dir: TempDir::new().unwrap(),
        };
        std::fs::create_dir_all(deck.project()).unwrap();
        std::fs::create_dir_all(deck.tasks()).unwrap();
        deck.seed_cache();
        deck.cmd()
            .args(["config", "set", "tasks_root"])
            .arg(deck.tasks())
            .assert()
            .success();
        deck
    }

    fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    fn project(&self) -> PathBuf {
        self.dir.path().join("proj")
    }

    fn tasks(&self) -> PathBuf {
        self.dir.path().join("tasks")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("agent-deck").unwrap();
        cmd.current_dir(self.dir.path())
            .env("AGENT_DECK_HOME", self.home())
            .env_remove("CLAUDE_CODE_EXPERIMENTAL_AGENT_TEAMS")
            .env_remove("RUST_LOG");
        cmd
    }

    fn seed_cache(&self) {
        let tree = self.home().join("cache/repo/resources");
        for id in [
            "commit",
            "pr-review",
            "todo",
            "create-pr",
            "fix-github-issue",
            "create-worktrees",
            "update-docs",
        ] {
            let dir = tree.join("slash-commands").join(id);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join(format!("{id}.md")), format!("# /{id}\n")).unwrap();
        }
        for id in ["SG-Cars-Trends-Backend", "AWS-MCP-Server"] {
            let dir = tree.join("claude.md-files").join(id);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("CLAUDE.md"), format!("# {id}\n\nGuidance for {id}.\n")).unwrap();
        }
        std::fs::write(
            self.home().join("cache/.last-fetch"),
            chrono::Utc::now().to_rfc3339(),
        )
        .unwrap();
    }

    fn setup(&self, extra: &[&str]) -> assert_cmd::assert::Assert {
        self.cmd()
            .arg("setup")
            .arg(self.project())
            .args(extra)
            .assert()
    }

    fn claude_md(&self) -> String {
        std::fs::read_to_string(self.project().join("CLAUDE.md")).unwrap()
    }
}

fn record(home: &Path, name: &str) -> serde_yaml::Value {
    let data = std::fs::read_to_string(home.join("sessions").join(format!("{name}.yaml"))).unwrap();
    serde_yaml::from_str(&data).unwrap()
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

#[test]
fn help_lists_commands() {
    let deck = Deck::new();
    deck.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("agent-deck"))
        .stdout(predicate::str::contains("setup"))
        .stdout(predicate::str::contains("open"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn spawn_help_explains_worker_kinds() {
    let deck = Deck::new();
    deck.cmd()
        .args(["spawn", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("standalone"))
        .stdout(predicate::str::contains("--coordinated"));
}

// ---------------------------------------------------------------------------
// setup
// ---------------------------------------------------------------------------

#[test]
fn setup_installs_backend_git_resources() {
    let deck = Deck::new();
    deck.setup(&["--domain", "backend", "--needs", "git", "--yes"])
        .success()
        .stdout(predicate::str::contains("Created session deck-proj"));

    let commands = deck.project().join(".claude/commands");
    for id in ["commit", "pr-review", "todo", "create-pr", "fix-github-issue", "create-worktrees"] {
        assert!(commands.join(format!("{id}.md")).exists(), "missing {id}");
    }
    assert!(!commands.join("update-docs.md").exists());

    let content = deck.claude_md();
    assert_eq!(content.matches("<!-- awesome-claude-code: SG-Cars-Trends-Backend -->").count(), 1);
    assert_eq!(content.matches("<!-- awesome-claude-code: AWS-MCP-Server -->").count(), 1);
    assert_eq!(content.matches("<!-- awesome-claude-code:").count(), 2);

    let rec = record(&deck.home(), "deck-proj");
    assert_eq!(rec["domain"].as_str(), Some("backend"));
    assert_eq!(rec["team"].as_str(), Some("proj"));
    let project = std::fs::canonicalize(deck.project()).unwrap();
    assert_eq!(rec["project_dir"].as_str(), project.to_str());
}

#[test]
fn setup_twice_is_idempotent() {
    let deck = Deck::new();
    let args = ["--domain", "backend", "--needs", "git", "--yes"];
    deck.setup(&args).success();
    let first = deck.claude_md();
    let first_rec = record(&deck.home(), "deck-proj");

    deck.setup(&args)
        .success()
        .stdout(predicate::str::contains("Already present commands"))
        .stdout(predicate::str::contains("Already present templates"))
        .stdout(predicate::str::contains("Installed").not())
        .stdout(predicate::str::contains("Updated session deck-proj"));

    assert_eq!(deck.claude_md(), first);
    let second_rec = record(&deck.home(), "deck-proj");
    assert_eq!(first_rec["commands"], second_rec["commands"]);
    assert_eq!(first_rec["created_at"], second_rec["created_at"]);
}

#[test]
fn setup_keeps_local_command_edits() {
    let deck = Deck::new();
    let edited = deck.project().join(".claude/commands/commit.md");
    std::fs::create_dir_all(edited.parent().unwrap()).unwrap();
    std::fs::write(&edited, "my version").unwrap();

    deck.setup(&["--domain", "general", "--yes"]).success();
    assert_eq!(std::fs::read_to_string(&edited).unwrap(), "my version");

    deck.setup(&["--domain", "general", "--yes", "--force"]).success();
    assert_eq!(std::fs::read_to_string(&edited).unwrap(), "# /commit\n");
}

#[test]
fn setup_reports_missing_resources_without_failing() {
    let deck = Deck::new();
    deck.setup(&["--domain", "ml", "--yes"])
        .success()
        .stderr(predicate::str::contains("mlflow-log-model"))
        .stderr(predicate::str::contains("not installed"));
    assert!(deck.project().join(".claude/commands/commit.md").exists());
}

#[test]
fn setup_json_output() {
    let deck = Deck::new();
    let out = deck
        .cmd()
        .arg("setup")
        .arg(deck.project())
        .args(["--domain", "backend", "--yes", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["session"], "deck-proj");
    assert_eq!(value["created"], true);
    assert_eq!(value["cache"], "fresh");
    assert_eq!(value["install"]["installed"].as_array().unwrap().len(), 5);
}

#[test]
fn setup_guided_prompts() {
    let deck = Deck::new();
    // domain 3 (backend), need 1 (git), no collection, accept
    deck.cmd()
        .arg("setup")
        .arg(deck.project())
        .write_stdin("3\n1\n\n\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("What kind of project is this?"));
    assert!(deck.project().join(".claude/commands/create-pr.md").exists());
    assert_eq!(record(&deck.home(), "deck-proj")["domain"].as_str(), Some("backend"));
}

#[test]
fn setup_guided_can_save_collection() {
    let deck = Deck::new();
    deck.cmd()
        .arg("setup")
        .arg(deck.project())
        .write_stdin("backend\ngit docs\nmy-kit\ny\n")
        .assert()
        .success();
    assert!(deck.home().join("collections/my-kit.yaml").exists());
    assert_eq!(record(&deck.home(), "deck-proj")["collection"].as_str(), Some("my-kit"));
}

#[test]
fn setup_quit_changes_nothing() {
    let deck = Deck::new();
    deck.cmd()
        .arg("setup")
        .arg(deck.project())
        .write_stdin("q\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("cancelled"));
    assert!(!deck.home().join("sessions/deck-proj.yaml").exists());
    assert!(!deck.project().join(".claude").exists());
}

#[test]
fn setup_eof_aborts_cleanly() {
    let deck = Deck::new();
    deck.cmd()
        .arg("setup")
        .arg(deck.project())
        .write_stdin("")
        .assert()
        .success();
    assert!(!deck.home().join("sessions/deck-proj.yaml").exists());
}

#[test]
fn setup_declined_changes_nothing() {
    let deck = Deck::new();
    deck.cmd()
        .arg("setup")
        .arg(deck.project())
        .write_stdin("7\n\n\nn\n")
        .assert()
        .success();
    assert!(!deck.project().join("CLAUDE.md").exists());
}

#[test]
fn setup_yes_requires_domain() {
    let deck = Deck::new();
    deck.setup(&["--yes"])
        .failure()
        .stderr(predicate::str::contains("--domain"));
}

#[test]
fn setup_missing_project_fails() {
    let deck = Deck::new();
    deck.cmd()
        .args(["setup", "does-not-exist", "--domain", "cli", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist"));
}

#[test]
fn setup_rejects_unknown_domain() {
    let deck = Deck::new();
    deck.setup(&["--domain", "databricks", "--yes"])
        .failure()
        .stderr(predicate::str::contains("databricks"));
}

// ---------------------------------------------------------------------------
// open / spawn / kill / list / status
// ---------------------------------------------------------------------------

#[test]
fn open_without_record_suggests_setup() {
    let deck = Deck::new();
    deck.cmd()
        .args(["open", "deck-nonexistent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("deck-nonexistent"))
        .stderr(predicate::str::contains("setup"));
}

#[test]
fn list_with_no_sessions() {
    let deck = Deck::new();
    deck.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions"));
}

#[test]
fn list_shows_idle_session_with_path() {
    let deck = Deck::new();
    deck.setup(&["--domain", "cli", "--yes"]).success();
    let project = std::fs::canonicalize(deck.project()).unwrap();
    deck.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("deck-proj"))
        .stdout(predicate::str::contains("idle"))
        .stdout(predicate::str::contains(project.to_str().unwrap()));
}

#[test]
fn list_json_is_an_array() {
    let deck = Deck::new();
    deck.setup(&["--domain", "cli", "--yes"]).success();
    let out = deck.cmd().args(["list", "--json"]).output().unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let sessions = value.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["name"], "deck-proj");
    assert_eq!(sessions[0]["live"], false);
}

#[test]
fn kill_without_live_session_fails_and_keeps_record() {
    let deck = Deck::new();
    deck.setup(&["--domain", "cli", "--yes"]).success();
    deck.cmd()
        .args(["kill", "deck-proj"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not running"));
    assert!(deck.home().join("sessions/deck-proj.yaml").exists());
}

#[test]
fn spawn_without_live_session_fails() {
    let deck = Deck::new();
    deck.setup(&["--domain", "cli", "--yes"]).success();
    deck.cmd()
        .args(["spawn", "deck-proj"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("deck-proj"))
        .stderr(predicate::str::contains("not running"));
}

#[test]
fn coordinated_spawn_requires_coordination() {
    let deck = Deck::new();
    deck.setup(&["--domain", "cli", "--yes"]).success();
    deck.cmd()
        .args(["spawn", "deck-proj", "--coordinated"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("coordinated workers are disabled"));
}

#[test]
fn status_shows_task_counts() {
    let deck = Deck::new();
    deck.setup(&["--domain", "cli", "--yes"]).success();
    let team = deck.tasks().join("proj");
    std::fs::create_dir_all(&team).unwrap();
    std::fs::write(team.join("1.json"), r#"{"id":"1","status":"completed","blockedBy":[]}"#).unwrap();
    std::fs::write(team.join("2.json"), r#"{"id":"2","status":"in_progress","blockedBy":["1"]}"#).unwrap();
    std::fs::write(team.join("3.json"), r#"{"id":"3","status":"pending","blockedBy":["2"]}"#).unwrap();

    deck.cmd()
        .args(["status", "deck-proj"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 pending, 1 in progress, 1 completed"))
        .stdout(predicate::str::contains("idle"));
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_set_and_show() {
    let deck = Deck::new();
    deck.cmd()
        .args(["config", "set", "coordinated_workers", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("coordinated_workers = true"));
    deck.cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("coordinated_workers"))
        .stdout(predicate::str::contains("session_prefix"));
}

#[test]
fn config_set_unknown_key_names_valid_keys() {
    let deck = Deck::new();
    deck.cmd()
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("colour"))
        .stderr(predicate::str::contains("session_prefix"));
}

#[test]
fn config_set_rejects_bad_value() {
    let deck = Deck::new();
    deck.cmd()
        .args(["config", "set", "cache_ttl_hours", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cache_ttl_hours"));
    deck.cmd()
        .args(["config", "set", "session_prefix", "-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must start with a lowercase letter or digit"));
}

#[test]
fn session_prefix_changes_names() {
    let deck = Deck::new();
    deck.cmd()
        .args(["config", "set", "session_prefix", "ad-"])
        .assert()
        .success();
    deck.setup(&["--domain", "cli", "--yes"])
        .success()
        .stdout(predicate::str::contains("session ad-proj"));
}

#[test]
fn list_with_malformed_config_still_succeeds() {
    let deck = Deck::new();
    std::fs::write(deck.home().join("config.yaml"), "session_prefix: [oops").unwrap();
    deck.cmd()
        .arg("list")
        .assert()
        .success()
        .stderr(predicate::str::contains("config.yaml"))
        .stderr(predicate::str::contains("config init --force"));
}

#[test]
fn malformed_config_can_be_reset() {
    let deck = Deck::new();
    std::fs::write(deck.home().join("config.yaml"), "session_prefix: [oops").unwrap();
    deck.cmd()
        .args(["collection", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config.yaml"))
        .stderr(predicate::str::contains("agent-deck config edit"));
    deck.cmd()
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
    deck.cmd().args(["config", "init", "--force"]).assert().success();
    deck.cmd().arg("list").assert().success();
}

// ---------------------------------------------------------------------------
// collections
// ---------------------------------------------------------------------------

#[test]
fn collection_create_list_show() {
    let deck = Deck::new();
    deck.cmd()
        .args(["collection", "create", "web-kit", "--domain", "backend", "--needs", "git,docs"])
        .assert()
        .success();
    deck.cmd()
        .args(["collection", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web-kit"))
        .stdout(predicate::str::contains("backend"));
    deck.cmd()
        .args(["collection", "show", "web-kit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("update-docs"))
        .stdout(predicate::str::contains("create-pr"));
}

#[test]
fn collection_create_refuses_overwrite_without_force() {
    let deck = Deck::new();
    let create = |extra: &[&str]| {
        deck.cmd()
            .args(["collection", "create", "kit", "--domain", "cli"])
            .args(extra)
            .assert()
    };
    create(&[]).success();
    create(&[]).failure().stderr(predicate::str::contains("kit"));
    create(&["--force"]).success();
}

#[test]
fn collection_show_missing_fails() {
    let deck = Deck::new();
    deck.cmd()
        .args(["collection", "show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn setup_from_collection() {
    let deck = Deck::new();
    deck.cmd()
        .args(["collection", "create", "docs-kit", "--domain", "general", "--needs", "docs"])
        .assert()
        .success();
    deck.setup(&["--from", "docs-kit", "--yes"]).success();
    assert!(deck.project().join(".claude/commands/update-docs.md").exists());
    assert_eq!(record(&deck.home(), "deck-proj")["collection"].as_str(), Some("docs-kit"));
}

// ---------------------------------------------------------------------------
// cache
// ---------------------------------------------------------------------------

#[test]
fn failed_cold_fetch_saves_no_collection() {
    let deck = Deck::new();
    std::fs::remove_dir_all(deck.home().join("cache")).unwrap();
    let missing = deck.dir.path().join("no-such-bundle");
    deck.cmd()
        .args(["config", "set", "cache_repo"])
        .arg(&missing)
        .assert()
        .success();

    deck.setup(&["--domain", "backend", "--collection", "kit", "--yes"])
        .failure()
        .stderr(predicate::str::contains("cache"));
    assert!(!deck.home().join("collections/kit.yaml").exists());
    assert!(!deck.home().join("sessions/deck-proj.yaml").exists());
}

#[test]
fn cache_status_and_clear() {
    let deck = Deck::new();
    deck.cmd()
        .args(["cache", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Complete:"))
        .stdout(predicate::str::contains("yes"));
    deck.cmd()
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));
    assert!(!deck.home().join("cache").exists());
    deck.cmd()
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already empty"));
}
