//! Local copy of the remote artifact bundle.
//!
//! Layout under the cache directory:
//!
//! - `repo/`        the fetched tree, complete once `repo/resources` exists
//! - `.last-fetch`  RFC 3339 time of the last successful fetch or refresh
//! - `.lock/`       directory mutex held by whoever is mutating `repo/`
//!
//! A cold fetch goes into a staging directory and is renamed into place, so
//! `repo/` is either absent or complete. Refreshes run under the lock; if a
//! refresh cannot happen the existing tree is kept and the caller is told it
//! may be stale.

use crate::config::Settings;
use crate::error::{DeckError, Result};
use crate::fetch::Fetcher;
use crate::lock::DirLock;
use crate::paths;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name prefix of the directory a cold fetch writes into before renaming.
const STAGING_PREFIX: &str = ".incoming-";

/// What `ensure` did to produce a usable tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// Tree present and within the staleness threshold.
    Fresh,
    /// Cold start: full fetch performed.
    Fetched,
    /// Stale tree refreshed incrementally.
    Refreshed,
    /// Stale tree kept because the refresh could not run.
    Stale { reason: String },
}

impl CacheStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, CacheStatus::Stale { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub dir: PathBuf,
    pub source: String,
    pub complete: bool,
    pub last_fetch: Option<DateTime<Utc>>,
    pub stale: bool,
    pub locked: bool,
}

#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
    source: String,
    ttl: Duration,
    lock_retries: u32,
    lock_backoff: Duration,
}

impl ArtifactCache {
    pub fn new(
        dir: impl Into<PathBuf>,
        source: impl Into<String>,
        ttl: Duration,
        lock_retries: u32,
        lock_backoff: Duration,
    ) -> Self {
        Self {
            dir: dir.into(),
            source: source.into(),
            ttl,
            lock_retries,
            lock_backoff,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.cache_dir(),
            settings.config.cache_repo.clone(),
            settings.cache_ttl(),
            settings.config.lock_retries,
            settings.lock_backoff(),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Root of the fetched tree. Only meaningful after a successful `ensure`.
    pub fn tree(&self) -> PathBuf {
        paths::cache_tree(&self.dir)
    }

    pub fn is_complete(&self) -> bool {
        self.tree().join(paths::TREE_MARKER).is_dir()
    }

    pub fn last_fetch(&self) -> Option<DateTime<Utc>> {
        let raw = std::fs::read_to_string(paths::cache_stamp(&self.dir)).ok()?;
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// True when the stamp is missing, unreadable, or older than the TTL.
    pub fn is_stale(&self) -> bool {
        match self.last_fetch() {
            Some(t) => {
                let age = Utc::now().signed_duration_since(t);
                age.to_std().map(|a| a > self.ttl).unwrap_or(false)
            }
            None => true,
        }
    }

    pub fn info(&self) -> CacheInfo {
        CacheInfo {
            dir: self.dir.clone(),
            source: self.source.clone(),
            complete: self.is_complete(),
            last_fetch: self.last_fetch(),
            stale: self.is_stale(),
            locked: paths::cache_lock(&self.dir).exists(),
        }
    }

    /// Make sure a complete tree exists, refreshing it when stale.
    ///
    /// Cold start failures are fatal. Once a tree exists, refresh failures
    /// and lock timeouts degrade to [`CacheStatus::Stale`].
    pub fn ensure(&self, fetcher: &dyn Fetcher) -> Result<CacheStatus> {
        if !self.is_complete() {
            return self.cold_fetch(fetcher);
        }
        if !self.is_stale() {
            return Ok(CacheStatus::Fresh);
        }
        self.refresh_stale(fetcher, false)
    }

    /// Refresh now regardless of age. A missing tree gets a full fetch.
    pub fn refresh(&self, fetcher: &dyn Fetcher) -> Result<CacheStatus> {
        if !self.is_complete() {
            return self.cold_fetch(fetcher);
        }
        self.refresh_stale(fetcher, true)
    }

    /// Remove the cache directory entirely.
    pub fn clear(&self) -> Result<bool> {
        if !self.dir.exists() {
            return Ok(false);
        }
        let lock = self.lock()?;
        let stamp = paths::cache_stamp(&self.dir);
        if stamp.exists() {
            std::fs::remove_file(&stamp)?;
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path != lock.path() && path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            }
        }
        drop(lock);
        std::fs::remove_dir_all(&self.dir)?;
        tracing::info!(cache = %self.dir.display(), "cache cleared");
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn lock(&self) -> Result<DirLock> {
        DirLock::acquire(
            &paths::cache_lock(&self.dir),
            self.lock_retries,
            self.lock_backoff,
        )
    }

    fn cold_fetch(&self, fetcher: &dyn Fetcher) -> Result<CacheStatus> {
        crate::io::ensure_dir(&self.dir)?;
        let _lock = self.lock()?;

        // Another invocation may have finished the fetch while we waited.
        if self.is_complete() {
            return Ok(CacheStatus::Fresh);
        }

        let tree = self.tree();
        if tree.exists() {
            tracing::warn!(tree = %tree.display(), "removing incomplete cache tree");
            std::fs::remove_dir_all(&tree)?;
        }
        self.sweep_staging()?;

        let staging = self
            .dir
            .join(format!("{STAGING_PREFIX}{}", uuid::Uuid::new_v4().simple()));
        tracing::info!(source = %self.source, dest = %tree.display(), "fetching artifact bundle");
        let fetched = fetcher.fetch(&self.source, &staging).and_then(|()| {
            if staging.join(paths::TREE_MARKER).is_dir() {
                Ok(())
            } else {
                Err(DeckError::FetchFailed {
                    source_url: self.source.clone(),
                    path: tree.clone(),
                    reason: format!("fetched tree has no '{}' directory", paths::TREE_MARKER),
                })
            }
        });
        if let Err(e) = fetched {
            if staging.exists() {
                let _ = std::fs::remove_dir_all(&staging);
            }
            return Err(e);
        }

        std::fs::rename(&staging, &tree)?;
        self.write_stamp()?;
        Ok(CacheStatus::Fetched)
    }

    /// Remove staging directories left behind by an interrupted fetch. Only
    /// called with the lock held, so none of them belongs to a live fetch.
    fn sweep_staging(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
                tracing::warn!(path = %entry.path().display(), "removing leftover staging directory");
                std::fs::remove_dir_all(entry.path())?;
            }
        }
        Ok(())
    }

    fn refresh_stale(&self, fetcher: &dyn Fetcher, force: bool) -> Result<CacheStatus> {
        let _lock = match self.lock() {
            Ok(lock) => lock,
            Err(DeckError::LockTimeout(path)) => {
                let reason = format!("cache lock {} is held by another process", path.display());
                tracing::warn!(%reason, "using stale cache");
                return Ok(CacheStatus::Stale { reason });
            }
            Err(e) => return Err(e),
        };

        if !force && !self.is_stale() {
            return Ok(CacheStatus::Fresh);
        }

        tracing::info!(source = %self.source, tree = %self.tree().display(), "refreshing artifact bundle");
        match fetcher.refresh(&self.source, &self.tree()) {
            Ok(()) => {
                self.write_stamp()?;
                Ok(CacheStatus::Refreshed)
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(%reason, "refresh failed, using stale cache");
                Ok(CacheStatus::Stale { reason })
            }
        }
    }

    fn write_stamp(&self) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        crate::io::atomic_write(&paths::cache_stamp(&self.dir), now.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeFetcher {
        fetches: AtomicUsize,
        refreshes: AtomicUsize,
        fail_fetch: bool,
        fail_refresh: bool,
        delay: Duration,
    }

    impl Fetcher for FakeFetcher {
        fn fetch(&self, source: &str, dest: &Path) -> Result<()> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            if self.fail_fetch {
                return Err(DeckError::FetchFailed {
                    source_url: source.to_string(),
                    path: dest.to_path_buf(),
                    reason: "offline".into(),
                });
            }
            let cmd = dest.join("resources/slash-commands/commit");
            std::fs::create_dir_all(&cmd)?;
            std::fs::write(cmd.join("commit.md"), "# commit\n")?;
            Ok(())
        }

        fn refresh(&self, source: &str, dest: &Path) -> Result<()> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            if self.fail_refresh {
                return Err(DeckError::FetchFailed {
                    source_url: source.to_string(),
                    path: dest.to_path_buf(),
                    reason: "offline".into(),
                });
            }
            Ok(())
        }
    }

    fn cache(dir: &Path) -> ArtifactCache {
        ArtifactCache::new(
            dir.join("cache"),
            "https://example.invalid/bundle.git",
            Duration::from_secs(24 * 3600),
            200,
            Duration::from_millis(5),
        )
    }

    fn make_stale(c: &ArtifactCache) {
        let old = (Utc::now() - chrono::Duration::hours(48)).to_rfc3339();
        std::fs::write(paths::cache_stamp(c.dir()), old).unwrap();
    }

    #[test]
    fn cold_start_fetches_once() {
        let dir = TempDir::new().unwrap();
        let c = cache(dir.path());
        let f = FakeFetcher::default();
        assert_eq!(c.ensure(&f).unwrap(), CacheStatus::Fetched);
        assert!(c.is_complete());
        assert!(c.last_fetch().is_some());
        assert_eq!(c.ensure(&f).unwrap(), CacheStatus::Fresh);
        assert_eq!(f.fetches.load(Ordering::SeqCst), 1);
        assert!(!paths::cache_lock(c.dir()).exists());
    }

    #[test]
    fn cold_start_failure_is_fatal_and_leaves_no_tree() {
        let dir = TempDir::new().unwrap();
        let c = cache(dir.path());
        let f = FakeFetcher {
            fail_fetch: true,
            ..Default::default()
        };
        assert!(matches!(c.ensure(&f), Err(DeckError::FetchFailed { .. })));
        assert!(!c.tree().exists());
        assert!(!paths::cache_lock(c.dir()).exists());
    }

    #[test]
    fn directory_without_marker_is_cold() {
        let dir = TempDir::new().unwrap();
        let c = cache(dir.path());
        std::fs::create_dir_all(c.tree().join("half-written")).unwrap();
        let f = FakeFetcher::default();
        assert_eq!(c.ensure(&f).unwrap(), CacheStatus::Fetched);
        assert!(!c.tree().join("half-written").exists());
    }

    #[test]
    fn cold_fetch_sweeps_leftover_staging() {
        let dir = TempDir::new().unwrap();
        let c = cache(dir.path());
        let leftover = c.dir().join(format!("{STAGING_PREFIX}deadbeef"));
        std::fs::create_dir_all(leftover.join("resources")).unwrap();

        assert_eq!(c.ensure(&FakeFetcher::default()).unwrap(), CacheStatus::Fetched);
        assert!(!leftover.exists());
        let staging: Vec<_> = std::fs::read_dir(c.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .collect();
        assert!(staging.is_empty());
    }

    #[test]
    fn stale_tree_is_refreshed() {
        let dir = TempDir::new().unwrap();
        let c = cache(dir.path());
        let f = FakeFetcher::default();
        c.ensure(&f).unwrap();
        make_stale(&c);
        assert_eq!(c.ensure(&f).unwrap(), CacheStatus::Refreshed);
        assert!(!c.is_stale());
        assert_eq!(f.refreshes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn refresh_failure_keeps_stale_tree() {
        let dir = TempDir::new().unwrap();
        let c = cache(dir.path());
        c.ensure(&FakeFetcher::default()).unwrap();
        make_stale(&c);
        let f = FakeFetcher {
            fail_refresh: true,
            ..Default::default()
        };
        let status = c.ensure(&f).unwrap();
        assert!(status.is_degraded());
        assert!(c.is_complete());
        assert!(!paths::cache_lock(c.dir()).exists());
    }

    #[test]
    fn held_lock_degrades_warm_refresh() {
        let dir = TempDir::new().unwrap();
        let mut c = cache(dir.path());
        c.ensure(&FakeFetcher::default()).unwrap();
        make_stale(&c);
        c.lock_retries = 1;
        let _held = DirLock::try_acquire(&paths::cache_lock(c.dir())).unwrap().unwrap();
        let f = FakeFetcher::default();
        assert!(c.ensure(&f).unwrap().is_degraded());
        assert_eq!(f.refreshes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn held_lock_on_cold_start_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut c = cache(dir.path());
        c.lock_retries = 1;
        std::fs::create_dir_all(paths::cache_lock(c.dir())).unwrap();
        assert!(matches!(
            c.ensure(&FakeFetcher::default()),
            Err(DeckError::LockTimeout(_))
        ));
    }

    #[test]
    fn concurrent_cold_starts_fetch_once() {
        let dir = TempDir::new().unwrap();
        let c = Arc::new(cache(dir.path()));
        let f = Arc::new(FakeFetcher {
            delay: Duration::from_millis(50),
            ..Default::default()
        });
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let c = Arc::clone(&c);
                let f = Arc::clone(&f);
                std::thread::spawn(move || c.ensure(f.as_ref()).unwrap())
            })
            .collect();
        let statuses: Vec<CacheStatus> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(f.fetches.load(Ordering::SeqCst), 1);
        assert!(statuses.contains(&CacheStatus::Fetched));
        assert!(statuses.contains(&CacheStatus::Fresh));
        assert!(c.is_complete());
    }

    #[test]
    fn concurrent_stale_refreshes_run_once() {
        let dir = TempDir::new().unwrap();
        let c = Arc::new(cache(dir.path()));
        c.ensure(&FakeFetcher::default()).unwrap();
        make_stale(&c);
        let f = Arc::new(FakeFetcher {
            delay: Duration::from_millis(50),
            ..Default::default()
        });
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let c = Arc::clone(&c);
                let f = Arc::clone(&f);
                std::thread::spawn(move || c.ensure(f.as_ref()).unwrap())
            })
            .collect();
        for h in handles {
            let status = h.join().unwrap();
            assert!(matches!(
                status,
                CacheStatus::Refreshed | CacheStatus::Fresh | CacheStatus::Stale { .. }
            ));
        }
        assert_eq!(f.refreshes.load(Ordering::SeqCst), 1);
        assert!(c.is_complete());
    }

    #[test]
    fn forced_refresh_ignores_age() {
        let dir = TempDir::new().unwrap();
        let c = cache(dir.path());
        let f = FakeFetcher::default();
        c.ensure(&f).unwrap();
        assert_eq!(c.refresh(&f).unwrap(), CacheStatus::Refreshed);
    }

    #[test]
    fn clear_removes_everything() {
        let dir = TempDir::new().unwrap();
        let c = cache(dir.path());
        c.ensure(&FakeFetcher::default()).unwrap();
        assert!(c.clear().unwrap());
        assert!(!c.dir().exists());
        assert!(!c.clear().unwrap());
    }
}
