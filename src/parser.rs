//! Parsing of `index.txt` files into [`ContentRecord`]s.
//!
//! ## Format
//!
//! The header is positional. Labels are removed by character offset, not by
//! matching the label text, so a file whose second line reads `Tags: x`
//! still parses (as `x`), exactly like the files already on disk expect.
//!
//! ```text
//! Title: Launch              ← line 1, offset 7  (pages and works)
//! TAGS: space, rocket        ← line 2, offset 6  (works only)
//! DATE: 2021-01-01           ← line 3, offset 6  (works only)
//! SHORT: First launch        ← line 4, offset 7  (works only)
//! Body text.                 ← everything else is markdown
//! ```
//!
//! A header line shorter than its offset yields an empty field. A file with
//! fewer header lines than its type needs is
//! [`Malformed`](ContentError::Malformed).

use crate::error::{ContentError, Result};
use crate::markdown;
use crate::store::ContentStore;
use crate::types::{ContentFields, ContentRecord, ContentType};
use std::collections::BTreeSet;
use std::path::PathBuf;

pub const TITLE_LABEL: &str = "Title: ";
pub const TAGS_LABEL: &str = "TAGS: ";
pub const DATE_LABEL: &str = "DATE: ";
pub const SHORT_LABEL: &str = "SHORT: ";

pub const TITLE_OFFSET: usize = 7;
pub const TAGS_OFFSET: usize = 6;
pub const DATE_OFFSET: usize = 6;
pub const SHORT_OFFSET: usize = 7;

/// Parse the `index.txt` of one content directory. `path` must be normalized.
pub fn parse(store: &ContentStore, content_type: ContentType, path: &str) -> Result<ContentRecord> {
    let raw = store.read_index(content_type, path)?;
    parse_str(content_type, path, &raw).map_err(|err| match err {
        ContentError::Malformed {
            expected, found, ..
        } => ContentError::Malformed {
            path: store.index_path(content_type, path),
            expected,
            found,
        },
        other => other,
    })
}

/// Parse already-read file contents.
pub fn parse_str(content_type: ContentType, path: &str, raw: &str) -> Result<ContentRecord> {
    let expected = content_type.header_lines();
    let (header, body) = split_header(raw, expected).map_err(|found| ContentError::Malformed {
        path: PathBuf::from(content_type.dir_name()).join(path).join("index.txt"),
        expected,
        found,
    })?;

    let title = strip_label(header[0], TITLE_OFFSET).to_string();
    let (tags, date, short) = match content_type {
        ContentType::Page => (BTreeSet::new(), String::new(), String::new()),
        ContentType::Work => (
            parse_tags(strip_label(header[1], TAGS_OFFSET)),
            strip_label(header[2], DATE_OFFSET).to_string(),
            strip_label(header[3], SHORT_OFFSET).to_string(),
        ),
    };

    Ok(ContentRecord {
        title,
        tags,
        date,
        short,
        markdown_body: body.to_string(),
        rendered_html: markdown::to_html(body),
        url: content_type.url_for(path),
        path: path.to_string(),
        content_type,
    })
}

/// Editable fields recovered from a file whose header is too short.
///
/// The header lines that exist are read positionally; missing ones stay
/// empty so the admin form can fill them in. A short file has no body.
pub fn salvage_fields(content_type: ContentType, raw: &str) -> ContentFields {
    let header: Vec<&str> = raw.lines().take(content_type.header_lines()).collect();
    let field = |i: usize, offset: usize| {
        header
            .get(i)
            .map(|line| strip_label(line, offset).to_string())
            .unwrap_or_default()
    };

    let mut fields = ContentFields {
        title: field(0, TITLE_OFFSET),
        ..Default::default()
    };
    if content_type == ContentType::Work {
        fields.tags = parse_tags(&field(1, TAGS_OFFSET));
        fields.date = field(2, DATE_OFFSET);
        fields.short = field(3, SHORT_OFFSET);
    }
    fields
}

/// Drop the first `offset` characters of a header line.
pub fn strip_label(line: &str, offset: usize) -> &str {
    match line.char_indices().nth(offset) {
        Some((i, _)) => &line[i..],
        None => "",
    }
}

/// Split a comma-separated tag line into trimmed, non-empty tags.
pub fn parse_tags(line: &str) -> BTreeSet<String> {
    line.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Split off `count` header lines. On a short file, returns how many lines
/// were found.
fn split_header(raw: &str, count: usize) -> std::result::Result<(Vec<&str>, &str), usize> {
    let mut header = Vec::with_capacity(count);
    let mut rest = raw;
    while header.len() < count {
        if rest.is_empty() {
            return Err(header.len());
        }
        let (line, tail) = rest.split_once('\n').unwrap_or((rest, ""));
        header.push(line.strip_suffix('\r').unwrap_or(line));
        rest = tail;
    }
    Ok((header, rest))
}
