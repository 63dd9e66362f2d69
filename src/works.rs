//! The work collection: every work plus the union of their tags.
//!
//! Built once on first use and then handed out as the same
//! `Arc<WorkCollection>` until [`WorkCatalog::invalidate_all_works`] is called.
//! The memo does not watch the content cache; whoever edits a work must reset
//! it (the [`Site`](crate::site::Site) service does this on every work save).

use crate::cache::ContentCache;
use crate::error::Result;
use crate::store::ContentStore;
use crate::types::{ContentRecord, ContentType, WorkCollection};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct WorkCatalog {
    memo: Mutex<Memo>,
}

/// The stored collection and how many invalidations it has seen.
#[derive(Debug, Default)]
struct Memo {
    generation: u64,
    works: Option<Arc<WorkCollection>>,
}

impl WorkCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The memoized collection, computing it on first access.
    ///
    /// The lock is not held while computing; two threads racing on an empty
    /// memo may both compute it, and the last one stored wins. A result
    /// computed across an invalidation is returned but never stored.
    pub fn get_all_works(&self, store: &ContentStore, cache: &ContentCache) -> Result<Arc<WorkCollection>> {
        let generation = match self.memo.lock() {
            Ok(memo) => match &memo.works {
                Some(works) => return Ok(Arc::clone(works)),
                None => memo.generation,
            },
            Err(_) => 0,
        };

        let works = Arc::new(collect_works(store, cache)?);
        info!(
            works = works.list_of_works.len(),
            tags = works.set_of_tags.len(),
            "work collection built"
        );
        self.store_if_current(generation, &works);
        Ok(works)
    }

    /// Works carrying `tag`, filtered from the memoized list.
    pub fn filter_by_tag(
        &self,
        store: &ContentStore,
        cache: &ContentCache,
        tag: &str,
    ) -> Result<Vec<ContentRecord>> {
        Ok(self.get_all_works(store, cache)?.filter_by_tag(tag))
    }

    /// Forget the memo; the next access recomputes through the content cache.
    pub fn invalidate_all_works(&self) {
        if let Ok(mut memo) = self.memo.lock() {
            memo.generation += 1;
            if memo.works.take().is_some() {
                debug!("work collection invalidated");
            }
        }
    }

    fn store_if_current(&self, generation: u64, works: &Arc<WorkCollection>) {
        if let Ok(mut memo) = self.memo.lock() {
            if memo.generation == generation {
                memo.works = Some(Arc::clone(works));
            } else {
                debug!("work collection outdated while building, not stored");
            }
        }
    }
}

/// Read every work directory in name order through the cache.
fn collect_works(store: &ContentStore, cache: &ContentCache) -> Result<WorkCollection> {
    let mut list_of_works = Vec::new();
    let mut set_of_tags = BTreeSet::new();

    for name in store.child_dirs(ContentType::Work, "").or_else(|err| {
        if err.is_not_found() { Ok(Vec::new()) } else { Err(err) }
    })? {
        if !store.has_index(ContentType::Work, &name) {
            continue;
        }
        let work = cache.get_or_build(store, ContentType::Work, &name)?;
        set_of_tags.extend(work.tags.iter().map(|t| t.trim().to_string()));
        list_of_works.push(work);
    }

    Ok(WorkCollection {
        list_of_works,
        set_of_tags,
    })
}
