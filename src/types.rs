//! Shared types passed between the store, cache, navigation and routing layers.
//!
//! [`ContentRecord`] is also the value type of the content cache and is
//! serialized to JSON there, so its field names are part of the cache format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The two kinds of content the site knows about.
///
/// The type selects the root directory under `content/` and the URL prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Page,
    Work,
}

impl ContentType {
    pub const ALL: [ContentType; 2] = [ContentType::Page, ContentType::Work];

    /// Name used in cache keys (`page/about`, `work/launch`).
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Page => "page",
            ContentType::Work => "work",
        }
    }

    /// Directory under the content root holding this type.
    pub fn dir_name(self) -> &'static str {
        match self {
            ContentType::Page => "pages",
            ContentType::Work => "works",
        }
    }

    /// Public URL for a normalized content path.
    ///
    /// - `Page`, `""` → `/`
    /// - `Page`, `"about/team"` → `/about/team`
    /// - `Work`, `"launch"` → `/works/launch`
    pub fn url_for(self, path: &str) -> String {
        match self {
            ContentType::Page => format!("/{path}"),
            ContentType::Work => format!("/works/{path}"),
        }
    }

    /// Number of fixed header lines in an `index.txt` of this type.
    pub fn header_lines(self) -> usize {
        match self {
            ContentType::Page => 1,
            ContentType::Work => 4,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key for a piece of content: `"<content_type>/<path>"`.
pub fn cache_key(content_type: ContentType, path: &str) -> String {
    format!("{}/{}", content_type.as_str(), path)
}

/// One parsed `index.txt`.
///
/// Records are only produced by [`crate::parser`], which derives `url` from
/// `path` and `rendered_html` from `markdown_body`; nothing else can set them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub title: String,
    /// Trimmed, non-empty tags. Always empty for pages.
    pub tags: BTreeSet<String>,
    /// Free-form; never parsed as a calendar date.
    pub date: String,
    pub short: String,
    pub markdown_body: String,
    pub rendered_html: String,
    pub url: String,
    /// Normalized path relative to the content type's root (`""` = root page).
    pub path: String,
    pub content_type: ContentType,
}

impl ContentRecord {
    pub fn cache_key(&self) -> String {
        cache_key(self.content_type, &self.path)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag.trim())
    }

    /// The editable part of this record, as pre-filled into the admin form.
    pub fn fields(&self) -> ContentFields {
        ContentFields {
            title: self.title.clone(),
            tags: self.tags.clone(),
            date: self.date.clone(),
            short: self.short.clone(),
            markdown: self.markdown_body.clone(),
        }
    }
}

/// Fields supplied by an edit, serialized back to `index.txt` by
/// [`crate::writer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFields {
    pub title: String,
    pub tags: BTreeSet<String>,
    pub date: String,
    pub short: String,
    pub markdown: String,
}

/// One row of the admin dashboard.
///
/// Built from the title line alone when the rest of the header does not
/// parse, so broken files stay reachable for editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentListing {
    pub path: String,
    pub title: String,
    pub url: String,
    pub malformed: bool,
}

/// A link to an immediate child page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEntry {
    pub url: String,
    pub name: String,
}

/// One breadcrumb step from the root page down to the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backlink {
    pub url: String,
    pub name: String,
}

/// All works plus the union of their tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkCollection {
    /// Sorted by directory name.
    pub list_of_works: Vec<ContentRecord>,
    pub set_of_tags: BTreeSet<String>,
}

impl WorkCollection {
    /// Works carrying `tag`, in collection order.
    pub fn filter_by_tag(&self, tag: &str) -> Vec<ContentRecord> {
        self.list_of_works
            .iter()
            .filter(|w| w.has_tag(tag))
            .cloned()
            .collect()
    }
}
