//! Saving edited content back to `index.txt`.
//!
//! The file is rewritten in the positional header format read by
//! [`crate::parser`], then the content cache entry is evicted so the next read
//! parses the new file. The work collection memo is left alone here; the
//! [`Site`](crate::site::Site) service resets it for work edits.

use crate::cache::ContentCache;
use crate::error::{ContentError, Result};
use crate::parser::{DATE_LABEL, SHORT_LABEL, TAGS_LABEL, TITLE_LABEL};
use crate::store::ContentStore;
use crate::types::{ContentFields, ContentType};
use std::fs;
use std::io;
use tracing::info;

/// Overwrite the `index.txt` of an existing content directory and evict its
/// cache entry. `path` must be normalized.
///
/// Directories are never created: saving to a path that does not exist is an
/// IO error.
pub fn write(
    store: &ContentStore,
    cache: &ContentCache,
    content_type: ContentType,
    path: &str,
    fields: &ContentFields,
) -> Result<()> {
    validate(content_type, fields)?;

    let dir = store.dir_path(content_type, path);
    if !dir.is_dir() {
        return Err(ContentError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("content directory {} does not exist", dir.display()),
        )));
    }

    fs::write(store.index_path(content_type, path), serialize(content_type, fields))?;
    info!(content_type = %content_type, path, "content saved");

    cache.invalidate(content_type, path)
}

/// Render fields in the `index.txt` format.
pub fn serialize(content_type: ContentType, fields: &ContentFields) -> String {
    let mut out = String::with_capacity(fields.markdown.len() + 128);
    out.push_str(TITLE_LABEL);
    out.push_str(&fields.title);
    out.push('\n');
    if content_type == ContentType::Work {
        let tags: Vec<&str> = fields.tags.iter().map(String::as_str).collect();
        out.push_str(TAGS_LABEL);
        out.push_str(&tags.join(","));
        out.push('\n');
        out.push_str(DATE_LABEL);
        out.push_str(&fields.date);
        out.push('\n');
        out.push_str(SHORT_LABEL);
        out.push_str(&fields.short);
        out.push('\n');
    }
    out.push_str(&fields.markdown);
    out
}

/// Reject fields that would not survive a round trip through the header.
pub fn validate(content_type: ContentType, fields: &ContentFields) -> Result<()> {
    if fields.title.trim().is_empty() {
        return Err(ContentError::Validation("title is required".into()));
    }
    for (name, value) in [
        ("title", &fields.title),
        ("date", &fields.date),
        ("short", &fields.short),
    ] {
        if value.contains(['\n', '\r']) {
            return Err(ContentError::Validation(format!(
                "{name} must fit on one line"
            )));
        }
    }
    for tag in &fields.tags {
        if tag.trim().is_empty() || tag.trim() != tag {
            return Err(ContentError::Validation(format!(
                "tag '{tag}' must be non-empty and trimmed"
            )));
        }
        if tag.contains([',', '\n', '\r']) {
            return Err(ContentError::Validation(format!(
                "tag '{tag}' may not contain commas or line breaks"
            )));
        }
    }
    if content_type == ContentType::Page
        && (!fields.tags.is_empty() || !fields.date.is_empty() || !fields.short.is_empty())
    {
        return Err(ContentError::Validation(
            "pages carry no tags, date or short".into(),
        ));
    }
    Ok(())
}
