//! Best-effort guess at what kind of project a directory holds.
//!
//! Only used to pre-select a hint in the setup menu; the user always
//! confirms the domain.

use crate::types::Domain;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Rust,
    Go,
    Java,
    Ruby,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Java => "java",
            Language::Ruby => "ruby",
        }
    }
}

// First marker present wins.
const LANGUAGE_MARKERS: &[(&str, Language)] = &[
    ("pyproject.toml", Language::Python),
    ("requirements.txt", Language::Python),
    ("setup.py", Language::Python),
    ("package.json", Language::Javascript),
    ("Cargo.toml", Language::Rust),
    ("go.mod", Language::Go),
    ("pom.xml", Language::Java),
    ("build.gradle", Language::Java),
    ("Gemfile", Language::Ruby),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
    React,
    PythonApi,
    PythonMl,
    Data,
    RustCli,
    Infra,
}

impl Framework {
    pub fn as_str(self) -> &'static str {
        match self {
            Framework::React => "react",
            Framework::PythonApi => "python-api",
            Framework::PythonMl => "python-ml",
            Framework::Data => "data",
            Framework::RustCli => "rust-cli",
            Framework::Infra => "infra",
        }
    }

    pub fn domain(self) -> Domain {
        match self {
            Framework::React => Domain::Frontend,
            Framework::PythonApi => Domain::Backend,
            Framework::PythonMl => Domain::Ml,
            Framework::Data => Domain::DataPlatform,
            Framework::RustCli => Domain::Cli,
            Framework::Infra => Domain::Devops,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetectedProject {
    pub language: Option<Language>,
    pub framework: Option<Framework>,
}

impl DetectedProject {
    pub fn suggested_domain(&self) -> Option<Domain> {
        self.framework.map(Framework::domain)
    }

    /// 1-based setup menu entry for the suggestion.
    pub fn suggested_menu_number(&self) -> Option<usize> {
        self.suggested_domain().map(Domain::menu_number)
    }
}

fn word_re(words: &[&str]) -> Regex {
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    // Static patterns built from literals; this cannot fail.
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).unwrap()
}

static DATA_RE: OnceLock<Regex> = OnceLock::new();
static ML_RE: OnceLock<Regex> = OnceLock::new();
static API_RE: OnceLock<Regex> = OnceLock::new();
static CLAP_RE: OnceLock<Regex> = OnceLock::new();

const JS_FRONTEND: &[&str] = &["react", "next", "vue", "svelte"];

pub fn detect(dir: &Path) -> DetectedProject {
    let language = LANGUAGE_MARKERS
        .iter()
        .find(|(file, _)| dir.join(file).is_file())
        .map(|(_, lang)| *lang);

    DetectedProject {
        language,
        framework: detect_framework(dir),
    }
}

fn read(dir: &Path, file: &str) -> String {
    std::fs::read_to_string(dir.join(file)).unwrap_or_default()
}

fn detect_framework(dir: &Path) -> Option<Framework> {
    if dir.join("package.json").is_file() && uses_frontend_framework(&read(dir, "package.json")) {
        return Some(Framework::React);
    }

    let python: String = ["pyproject.toml", "requirements.txt", "setup.py"]
        .iter()
        .map(|f| read(dir, f))
        .collect::<Vec<_>>()
        .join("\n");
    if !python.trim().is_empty() {
        let data = DATA_RE.get_or_init(|| word_re(&["pyspark", "databricks"]));
        let ml = ML_RE.get_or_init(|| {
            word_re(&["mlflow", "torch", "tensorflow", "scikit-learn", "dspy"])
        });
        let api = API_RE.get_or_init(|| word_re(&["fastapi", "flask", "django"]));
        if data.is_match(&python) {
            return Some(Framework::Data);
        }
        if ml.is_match(&python) {
            return Some(Framework::PythonMl);
        }
        if api.is_match(&python) {
            return Some(Framework::PythonApi);
        }
    }

    let cargo = read(dir, "Cargo.toml");
    let clap = CLAP_RE.get_or_init(|| word_re(&["clap"]));
    if clap.is_match(&cargo) {
        return Some(Framework::RustCli);
    }

    if dir.join("Dockerfile").is_file() || has_terraform(dir) {
        return Some(Framework::Infra);
    }
    None
}

/// True when package.json declares one of the frontend frameworks as a
/// dependency. Falls back to a plain text search if it does not parse.
fn uses_frontend_framework(package_json: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(package_json) else {
        return word_re(JS_FRONTEND).is_match(package_json);
    };
    ["dependencies", "devDependencies", "peerDependencies"]
        .iter()
        .filter_map(|key| value.get(key).and_then(|d| d.as_object()))
        .flat_map(|deps| deps.keys())
        .any(|name| {
            JS_FRONTEND.contains(&name.as_str()) || name.starts_with("@sveltejs/")
        })
}

fn has_terraform(dir: &Path) -> bool {
    if dir.join("terraform").is_dir() {
        return true;
    }
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tf"))
        })
        .unwrap_or(false)
}
