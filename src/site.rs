//! The site service: the one object the routing layer talks to.
//!
//! A [`Site`] owns the content store, the content cache and the work
//! collection memo. It is built once at start-up and passed by reference to
//! the request loop; there is no global state.
//!
//! Request paths arrive raw and are normalized here, so every entry point
//! rejects traversal (`..`) before touching the filesystem.

use crate::cache::{ContentCache, RebuildReport};
use crate::error::{ContentError, Result};
use crate::navigation;
use crate::store::{self, ContentStore};
use crate::parser;
use crate::types::{
    Backlink, ContentFields, ContentListing, ContentRecord, ContentType, NavigationEntry,
};
use crate::works::WorkCatalog;
use crate::writer;
use std::collections::BTreeSet;
use std::path::PathBuf;

pub struct Site {
    store: ContentStore,
    cache: ContentCache,
    works: WorkCatalog,
}

impl Site {
    pub fn new(store: ContentStore, cache: ContentCache) -> Self {
        Self {
            store,
            cache,
            works: WorkCatalog::new(),
        }
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn resolve_page(&self, path: &str) -> Result<ContentRecord> {
        let path = store::normalize_path(path)?;
        self.cache.get_or_build(&self.store, ContentType::Page, &path)
    }

    pub fn resolve_work(&self, path: &str) -> Result<ContentRecord> {
        let path = store::normalize_path(path)?;
        self.cache.get_or_build(&self.store, ContentType::Work, &path)
    }

    /// All works, or only those carrying `tag`.
    pub fn list_works(&self, tag: Option<&str>) -> Result<Vec<ContentRecord>> {
        match tag {
            Some(tag) => self.works.filter_by_tag(&self.store, &self.cache, tag),
            None => Ok(self
                .works
                .get_all_works(&self.store, &self.cache)?
                .list_of_works
                .clone()),
        }
    }

    /// Union of all work tags.
    pub fn work_tags(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .works
            .get_all_works(&self.store, &self.cache)?
            .set_of_tags
            .clone())
    }

    pub fn navigation(&self, path: &str) -> Result<Vec<NavigationEntry>> {
        navigation::list_children(&self.store, &store::normalize_path(path)?)
    }

    pub fn backlinks(&self, path: &str) -> Result<Vec<Backlink>> {
        navigation::build_backlinks(&self.store, &store::normalize_path(path)?)
    }

    /// Save an edit. Saving a work also resets the work collection so lists
    /// and tag pages pick up the change.
    pub fn save_content(
        &self,
        content_type: ContentType,
        path: &str,
        fields: &ContentFields,
    ) -> Result<()> {
        let path = store::normalize_path(path)?;
        let result = writer::write(&self.store, &self.cache, content_type, &path, fields);
        if content_type == ContentType::Work {
            self.works.invalidate_all_works();
        }
        result
    }

    /// Every page, in walk order. Fails on the first malformed page.
    pub fn all_pages(&self) -> Result<Vec<ContentRecord>> {
        self.store
            .content_dirs(ContentType::Page)?
            .iter()
            .map(|path| self.cache.get_or_build(&self.store, ContentType::Page, path))
            .collect()
    }

    /// Every page or work in walk order, for the admin dashboard.
    ///
    /// Unlike [`all_pages`](Self::all_pages) and
    /// [`list_works`](Self::list_works), a file with a short header is listed
    /// (flagged `malformed`) instead of failing the whole listing.
    pub fn listing(&self, content_type: ContentType) -> Result<Vec<ContentListing>> {
        let mut listing = Vec::new();
        for path in self.store.content_dirs(content_type)? {
            let entry = match self.cache.get_or_build(&self.store, content_type, &path) {
                Ok(record) => ContentListing {
                    title: record.title,
                    url: record.url,
                    path: record.path,
                    malformed: false,
                },
                Err(ContentError::Malformed { .. }) => {
                    let title = self.store.read_title(content_type, &path).unwrap_or_default();
                    ContentListing {
                        title: if title.is_empty() { path.clone() } else { title },
                        url: content_type.url_for(&path),
                        path,
                        malformed: true,
                    }
                }
                Err(err) => return Err(err),
            };
            listing.push(entry);
        }
        Ok(listing)
    }

    /// Pre-filled admin form fields for one piece of content.
    ///
    /// A malformed file yields whatever its header still holds together with
    /// the parse error, so the admin can repair it through the form.
    pub fn edit_fields(
        &self,
        content_type: ContentType,
        path: &str,
    ) -> Result<(String, ContentFields, Option<ContentError>)> {
        let path = store::normalize_path(path)?;
        match self.cache.get_or_build(&self.store, content_type, &path) {
            Ok(record) => Ok((path, record.fields(), None)),
            Err(err @ ContentError::Malformed { .. }) => {
                let raw = self.store.read_index(content_type, &path)?;
                Ok((path, parser::salvage_fields(content_type, &raw), Some(err)))
            }
            Err(err) => Err(err),
        }
    }

    /// A static file under the pages root, if the request names one.
    pub fn static_file(&self, path: &str) -> Option<PathBuf> {
        let path = store::normalize_path(path).ok()?;
        self.store.file_path(ContentType::Page, &path)
    }

    /// Flush and re-warm the content cache, and drop the work memo.
    pub fn rebuild_cache(&self) -> Result<RebuildReport> {
        self.works.invalidate_all_works();
        self.cache.rebuild_all(&self.store)
    }
}
