use crate::catalog;
use crate::error::{DeckError, Result};
use crate::paths;
use crate::types::{Domain, Need};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A named, reusable bundle of resources resolved from a domain and needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub domain: Domain,
    #[serde(default)]
    pub needs: Vec<Need>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub templates: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub name: String,
    pub domain: Domain,
    pub needs: Vec<Need>,
    pub commands: usize,
    pub templates: usize,
    pub created_at: DateTime<Utc>,
}

impl Collection {
    /// Build a collection whose resources come from the catalog mapping.
    pub fn resolve(name: impl Into<String>, domain: Domain, needs: &[Need]) -> Self {
        let resources = catalog::resolve(domain, needs);
        let mut needs = needs.to_vec();
        needs.sort();
        needs.dedup();
        Self {
            name: name.into(),
            domain,
            needs,
            commands: resources.commands,
            templates: resources.templates,
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> CollectionSummary {
        CollectionSummary {
            name: self.name.clone(),
            domain: self.domain,
            needs: self.needs.clone(),
            commands: self.commands.len(),
            templates: self.templates.len(),
            created_at: self.created_at,
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn exists(home: &Path, name: &str) -> bool {
        paths::collection_record(home, name).exists()
    }

    /// Write the record, replacing any existing collection of the same name.
    pub fn save(&self, home: &Path) -> Result<()> {
        paths::validate_name(&self.name)?;
        let path = paths::collection_record(home, &self.name);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())?;
        tracing::debug!(collection = %self.name, path = %path.display(), "saved collection");
        Ok(())
    }

    pub fn load(home: &Path, name: &str) -> Result<Self> {
        paths::validate_name(name)?;
        let path = paths::collection_record(home, name);
        if !path.exists() {
            return Err(DeckError::CollectionNotFound(name.to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        serde_yaml::from_str(&data).map_err(|e| DeckError::MalformedRecord {
            path,
            reason: e.to_string(),
        })
    }

    /// All readable collections, sorted by name. Unreadable records are
    /// logged and left out.
    pub fn list(home: &Path) -> Result<Vec<CollectionSummary>> {
        let dir = paths::collections_dir(home);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(paths::RECORD_EXT) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match Self::load(home, name) {
                Ok(c) => summaries.push(c.summary()),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping collection"),
            }
        }
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }
}

/// Resolve and persist a collection in one step, returning its name.
///
/// Overwriting replaces the record entirely; `overwrite = false` refuses to
/// touch an existing one.
pub fn save(
    home: &Path,
    name: &str,
    domain: Domain,
    needs: &[Need],
    overwrite: bool,
) -> Result<Collection> {
    paths::validate_name(name)?;
    if !overwrite && Collection::exists(home, name) {
        return Err(DeckError::CollectionExists(name.to_string()));
    }
    let collection = Collection::resolve(name, domain, needs);
    collection.save(home)?;
    Ok(collection)
}
