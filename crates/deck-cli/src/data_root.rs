use deck_core::{paths, DeckError};
use std::path::{Path, PathBuf};

/// Resolve the data root.
///
/// Priority:
/// 1. `--home` flag / `AGENT_DECK_HOME` env var (passed in as `explicit`)
/// 2. `~/.agent-deck`
pub fn resolve_home(explicit: Option<&Path>) -> Result<PathBuf, DeckError> {
    if let Some(p) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(absolute(p));
    }
    paths::default_home().ok_or(DeckError::HomeNotFound)
}

/// Resolve a project directory argument, defaulting to the working directory.
/// The result is canonical so the same project always maps to the same path.
pub fn resolve_project(dir: Option<&Path>) -> Result<PathBuf, DeckError> {
    let raw = match dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir()?,
    };
    if !raw.is_dir() {
        return Err(DeckError::ProjectNotFound(raw));
    }
    Ok(std::fs::canonicalize(&raw)?)
}

fn absolute(p: &Path) -> PathBuf {
    if p.is_absolute() {
        return p.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(p))
        .unwrap_or_else(|_| p.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_home_wins() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_home(Some(dir.path())).unwrap(), dir.path());
    }

    #[test]
    fn project_is_canonical() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a");
        std::fs::create_dir_all(&nested).unwrap();
        let dotted = dir.path().join("a").join("..").join("a");
        assert_eq!(
            resolve_project(Some(&dotted)).unwrap(),
            std::fs::canonicalize(&nested).unwrap()
        );
    }

    #[test]
    fn missing_project_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = resolve_project(Some(&dir.path().join("nope"))).unwrap_err();
        assert!(matches!(err, DeckError::ProjectNotFound(_)));
    }
}
