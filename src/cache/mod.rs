//! Content cache: parsed records keyed by `"<content_type>/<path>"`.
//!
//! Parsing an `index.txt` means a disk read plus a markdown render. This
//! module keeps the result in a [`CacheBackend`] so repeated requests for the
//! same page touch neither.
//!
//! # Design
//!
//! Values are [`ContentRecord`]s serialized as JSON. The cache has no notion
//! of file freshness: an entry stays until it is explicitly
//! [invalidated](ContentCache::invalidate) (the writer does this after every
//! save) or the whole cache is [rebuilt](ContentCache::rebuild_all) at
//! start-up. Editing files behind the server's back leaves stale entries
//! until the next invalidation or restart.
//!
//! ## Failing open
//!
//! The cache is an optimization. When the backend cannot be reached,
//! [`get_or_build`](ContentCache::get_or_build) logs a warning and parses
//! straight from disk, and an undecodable stored value is treated as a miss
//! and overwritten. Only operations whose failure would leave stale data
//! behind (`invalidate`, `rebuild_all`) report
//! [`CacheUnavailable`](ContentError::CacheUnavailable).

pub mod backend;
pub mod redis_backend;

pub use backend::{CacheBackend, CacheError, CacheResult, MemoryBackend};
pub use redis_backend::RedisBackend;

use crate::error::{ContentError, Result};
use crate::parser;
use crate::store::ContentStore;
use crate::types::{ContentRecord, ContentType, cache_key};
use rayon::prelude::*;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, info, warn};

impl From<CacheError> for ContentError {
    fn from(err: CacheError) -> Self {
        ContentError::CacheUnavailable(err.to_string())
    }
}

/// Typed cache of [`ContentRecord`]s over a pluggable backend.
pub struct ContentCache {
    backend: Box<dyn CacheBackend>,
    stats: CacheStats,
}

impl ContentCache {
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            stats: CacheStats::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Stored record for a key, if any.
    pub fn get(&self, content_type: ContentType, path: &str) -> CacheResult<Option<ContentRecord>> {
        match self.backend.get(&cache_key(content_type, path))? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set(&self, record: &ContentRecord) -> CacheResult<()> {
        let json = serde_json::to_string(record)?;
        self.backend.set(&record.cache_key(), &json)
    }

    pub fn delete(&self, content_type: ContentType, path: &str) -> CacheResult<()> {
        self.backend.delete(&cache_key(content_type, path))
    }

    pub fn exists(&self, content_type: ContentType, path: &str) -> CacheResult<bool> {
        self.backend.exists(&cache_key(content_type, path))
    }

    /// Return the cached record, parsing and storing it on a miss.
    ///
    /// A parse failure is returned as-is and nothing is stored.
    pub fn get_or_build(
        &self,
        store: &ContentStore,
        content_type: ContentType,
        path: &str,
    ) -> Result<ContentRecord> {
        let key = cache_key(content_type, path);
        match self.backend.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<ContentRecord>(&raw) {
                Ok(record) => {
                    self.stats.hit();
                    debug!(%key, "content cache hit");
                    return Ok(record);
                }
                Err(err) => warn!(%key, error = %err, "discarding undecodable cache entry"),
            },
            Ok(None) => {}
            Err(err) => {
                self.stats.bypass();
                warn!(%key, error = %err, "content cache unavailable, reading from disk");
                return parser::parse(store, content_type, path);
            }
        }

        self.stats.miss();
        debug!(%key, "content cache miss");
        let record = parser::parse(store, content_type, path)?;
        if let Err(err) = self.set(&record) {
            warn!(%key, error = %err, "could not store parsed content");
        }
        Ok(record)
    }

    /// Drop the entry for one piece of content. Absent entries are fine.
    pub fn invalidate(&self, content_type: ContentType, path: &str) -> Result<()> {
        self.delete(content_type, path)?;
        debug!(key = %cache_key(content_type, path), "content cache entry invalidated");
        Ok(())
    }

    /// Flush the backend, then parse every page and work into it.
    ///
    /// Meant for process start-up: it reads the whole content tree. A file
    /// that fails to parse is reported in the [`RebuildReport`] rather than
    /// aborting the warm-up.
    pub fn rebuild_all(&self, store: &ContentStore) -> Result<RebuildReport> {
        self.backend.flush()?;

        let mut targets = Vec::new();
        for content_type in ContentType::ALL {
            for path in store.content_dirs(content_type)? {
                targets.push((content_type, path));
            }
        }

        let failures: Vec<(String, ContentError)> = targets
            .par_iter()
            .filter_map(|(content_type, path)| {
                self.get_or_build(store, *content_type, path)
                    .err()
                    .map(|err| (cache_key(*content_type, path), err))
            })
            .collect();

        let report = RebuildReport {
            warmed: targets.len() - failures.len(),
            failures,
        };
        info!(
            backend = self.backend.name(),
            warmed = report.warmed,
            failed = report.failures.len(),
            "content cache rebuilt"
        );
        Ok(report)
    }
}

/// Outcome of [`ContentCache::rebuild_all`].
#[derive(Debug, Default)]
pub struct RebuildReport {
    /// Records parsed and stored.
    pub warmed: usize,
    /// Cache keys that failed to parse, with the reason.
    pub failures: Vec<(String, ContentError)>,
}

impl RebuildReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Lookup counters since the cache was created.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU32,
    misses: AtomicU32,
    bypasses: AtomicU32,
}

impl CacheStats {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn bypass(&self) {
        self.bypasses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u32 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Lookups served from disk because the backend failed.
    pub fn bypasses(&self) -> u32 {
        self.bypasses.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u32 {
        self.hits() + self.misses() + self.bypasses()
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bypasses() > 0 {
            write!(
                f,
                "{} cached, {} parsed, {} bypassed ({} total)",
                self.hits(),
                self.misses(),
                self.bypasses(),
                self.total()
            )
        } else if self.hits() > 0 {
            write!(
                f,
                "{} cached, {} parsed ({} total)",
                self.hits(),
                self.misses(),
                self.total()
            )
        } else {
            write!(f, "{} parsed", self.misses())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::backend::tests::{DownBackend, SharedBackend};
    use super::*;
    use crate::test_helpers::*;
    use std::fs;

    // =========================================================================
    // get_or_build
    // =========================================================================

    #[test]
    fn second_lookup_is_a_hit_without_disk_access() {
        let tmp = setup_fixtures();
        let store = content_store(&tmp);
        let cache = ContentCache::in_memory();

        let parsed = parser::parse(&store, ContentType::Work, "launch").unwrap();
        let first = cache.get_or_build(&store, ContentType::Work, "launch").unwrap();

        // With the file gone, only the cache can answer.
        fs::remove_file(store.index_path(ContentType::Work, "launch")).unwrap();
        let second = cache.get_or_build(&store, ContentType::Work, "launch").unwrap();

        assert_eq!(parsed, first);
        assert_eq!(first, second);
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(cache.stats().hits(), 1);
    }

    #[test]
    fn invalidate_forces_a_fresh_read() {
        let tmp = setup_fixtures();
        let store = content_store(&tmp);
        let cache = ContentCache::in_memory();

        let before = cache.get_or_build(&store, ContentType::Page, "about").unwrap();
        write_index(tmp.path(), "pages/about", "Title: About Us\nNew body.\n");

        // Still the old record until invalidated.
        let stale = cache.get_or_build(&store, ContentType::Page, "about").unwrap();
        assert_eq!(stale, before);

        cache.invalidate(ContentType::Page, "about").unwrap();
        let after = cache.get_or_build(&store, ContentType::Page, "about").unwrap();
        assert_eq!(after.title, "About Us");
        assert_eq!(after.markdown_body, "New body.\n");
    }

    #[test]
    fn invalidate_absent_entry_is_ok() {
        let cache = ContentCache::in_memory();
        cache.invalidate(ContentType::Work, "never-cached").unwrap();
        cache.invalidate(ContentType::Work, "never-cached").unwrap();
    }

    #[test]
    fn parse_failure_stores_nothing() {
        let tmp = setup_fixtures();
        write_index(tmp.path(), "works/broken", "Title: Broken\n");
        let store = content_store(&tmp);
        let cache = ContentCache::in_memory();

        let err = cache
            .get_or_build(&store, ContentType::Work, "broken")
            .unwrap_err();
        assert!(matches!(err, ContentError::Malformed { .. }));
        assert!(!cache.exists(ContentType::Work, "broken").unwrap());

        let err = cache
            .get_or_build(&store, ContentType::Page, "missing")
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!cache.exists(ContentType::Page, "missing").unwrap());
    }

    #[test]
    fn stores_records_under_type_and_path() {
        let tmp = setup_fixtures();
        let store = content_store(&tmp);
        let shared = SharedBackend::default();
        let cache = ContentCache::new(shared.clone());

        cache.get_or_build(&store, ContentType::Page, "").unwrap();
        cache.get_or_build(&store, ContentType::Work, "launch").unwrap();

        assert!(shared.0.exists("page/").unwrap());
        assert!(shared.0.exists("work/launch").unwrap());
        let raw = shared.0.get("work/launch").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["title"], "Launch");
        assert_eq!(value["content_type"], "work");
    }

    // =========================================================================
    // Failing open
    // =========================================================================

    #[test]
    fn unreachable_backend_reads_from_disk() {
        let tmp = setup_fixtures();
        let store = content_store(&tmp);
        let cache = ContentCache::new(DownBackend);

        let record = cache.get_or_build(&store, ContentType::Work, "launch").unwrap();
        assert_eq!(record.title, "Launch");
        assert_eq!(cache.stats().bypasses(), 1);
    }

    #[test]
    fn unreachable_backend_fails_invalidate_and_rebuild() {
        let tmp = setup_fixtures();
        let store = content_store(&tmp);
        let cache = ContentCache::new(DownBackend);

        let err = cache.invalidate(ContentType::Page, "about").unwrap_err();
        assert!(matches!(err, ContentError::CacheUnavailable(_)));
        let err = cache.rebuild_all(&store).unwrap_err();
        assert!(matches!(err, ContentError::CacheUnavailable(_)));
    }

    #[test]
    fn corrupt_entry_is_treated_as_a_miss() {
        let tmp = setup_fixtures();
        let store = content_store(&tmp);
        let shared = SharedBackend::default();
        shared.0.set("page/about", "{not json").unwrap();
        let cache = ContentCache::new(shared.clone());

        let record = cache.get_or_build(&store, ContentType::Page, "about").unwrap();
        assert_eq!(record.title, "About");
        assert_eq!(cache.stats().misses(), 1);
        // Overwritten with a valid value.
        assert_eq!(cache.get(ContentType::Page, "about").unwrap(), Some(record));
    }

    // =========================================================================
    // rebuild_all
    // =========================================================================

    #[test]
    fn rebuild_all_warms_every_content_directory() {
        let tmp = setup_fixtures();
        let store = content_store(&tmp);
        let shared = SharedBackend::default();
        shared.0.set("page/ghost", "stale").unwrap();
        let cache = ContentCache::new(shared.clone());

        let report = cache.rebuild_all(&store).unwrap();

        assert!(report.is_clean(), "{:?}", report.failures);
        assert_eq!(report.warmed, 7);
        assert!(!shared.0.exists("page/ghost").unwrap());
        for key in [
            "page/",
            "page/about",
            "page/about/team",
            "page/contact",
            "work/launch",
            "work/orbit",
            "work/splashdown",
        ] {
            assert!(shared.0.exists(key).unwrap(), "{key} not warmed");
        }
    }

    #[test]
    fn rebuild_all_reports_bad_files_and_keeps_going() {
        let tmp = setup_fixtures();
        write_index(tmp.path(), "works/broken", "Title: Broken\n");
        let store = content_store(&tmp);
        let cache = ContentCache::in_memory();

        let report = cache.rebuild_all(&store).unwrap();

        assert_eq!(report.warmed, 7);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "work/broken");
        assert!(matches!(report.failures[0].1, ContentError::Malformed { .. }));
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display_with_hits() {
        let s = CacheStats::default();
        for _ in 0..5 {
            s.hit();
        }
        s.miss();
        s.miss();
        assert_eq!(format!("{}", s), "5 cached, 2 parsed (7 total)");
    }

    #[test]
    fn cache_stats_display_with_bypasses() {
        let s = CacheStats::default();
        s.hit();
        s.miss();
        s.bypass();
        assert_eq!(format!("{}", s), "1 cached, 1 parsed, 1 bypassed (3 total)");
    }

    #[test]
    fn cache_stats_display_no_hits() {
        let s = CacheStats::default();
        s.miss();
        s.miss();
        s.miss();
        assert_eq!(format!("{}", s), "3 parsed");
    }
}
