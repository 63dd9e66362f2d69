//! Filesystem access to the content tree.
//!
//! ## Layout
//!
//! ```text
//! content/
//! ├── pages/
//! │   ├── index.txt              # Root page (path "")
//! │   ├── about/
//! │   │   ├── index.txt          # Page "about"
//! │   │   ├── portrait.jpg       # Served as-is if the extension is allowed
//! │   │   └── team/
//! │   │       └── index.txt      # Page "about/team"
//! │   └── contact/
//! │       └── index.txt
//! └── works/
//!     ├── launch/
//!     │   └── index.txt          # Work "launch"
//!     └── orbit/
//!         └── index.txt
//! ```
//!
//! Every piece of content is a directory holding one `index.txt`. The store
//! only knows how to find and read those files; parsing is done by
//! [`crate::parser`] and nothing here is cached.

use crate::error::{ContentError, Result};
use crate::parser;
use crate::types::ContentType;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the structured file inside each content directory.
pub const INDEX_FILE: &str = "index.txt";

/// Handle on a `content/` directory.
#[derive(Debug, Clone)]
pub struct ContentStore {
    content_root: PathBuf,
}

impl ContentStore {
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
        }
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    /// Root directory for one content type (`content/pages`, `content/works`).
    pub fn root(&self, content_type: ContentType) -> PathBuf {
        self.content_root.join(content_type.dir_name())
    }

    /// Directory for a normalized content path.
    pub fn dir_path(&self, content_type: ContentType, path: &str) -> PathBuf {
        let root = self.root(content_type);
        if path.is_empty() { root } else { root.join(path) }
    }

    pub fn index_path(&self, content_type: ContentType, path: &str) -> PathBuf {
        self.dir_path(content_type, path).join(INDEX_FILE)
    }

    pub fn has_index(&self, content_type: ContentType, path: &str) -> bool {
        self.index_path(content_type, path).is_file()
    }

    /// Read the whole `index.txt` of a content directory.
    pub fn read_index(&self, content_type: ContentType, path: &str) -> Result<String> {
        let file = self.index_path(content_type, path);
        fs::read_to_string(&file).map_err(|e| open_error(e, &file))
    }

    /// Read only the title line of a content directory.
    ///
    /// Navigation and breadcrumbs need nothing else, so the rest of the file
    /// is never read.
    pub fn read_title(&self, content_type: ContentType, path: &str) -> Result<String> {
        let file = self.index_path(content_type, path);
        let reader = BufReader::new(fs::File::open(&file).map_err(|e| open_error(e, &file))?);
        match reader.lines().next() {
            Some(line) => Ok(parser::strip_label(&line?, parser::TITLE_OFFSET).to_string()),
            None => Err(ContentError::Malformed {
                path: file,
                expected: 1,
                found: 0,
            }),
        }
    }

    /// Names of the immediate, non-hidden subdirectories of `path`, sorted.
    pub fn child_dirs(&self, content_type: ContentType, path: &str) -> Result<Vec<String>> {
        let dir = self.dir_path(content_type, path);
        let entries = fs::read_dir(&dir).map_err(|e| open_error(e, &dir))?;

        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| !name.starts_with('.'))
            .collect();

        names.sort();
        Ok(names)
    }

    /// Every directory under the type's root that holds an `index.txt`,
    /// as normalized relative paths in walk order (sorted by file name).
    ///
    /// A missing root yields an empty list: a site without works is valid.
    pub fn content_dirs(&self, content_type: ContentType) -> Result<Vec<String>> {
        let root = self.root(content_type);
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut dirs = Vec::new();
        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_dir() || !entry.path().join(INDEX_FILE).is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            dirs.push(relative_to_string(rel));
        }
        Ok(dirs)
    }

    /// A regular file under the type's root, if one exists at `path`.
    ///
    /// Used by the routing layer for static pass-through; `path` must
    /// already be normalized.
    pub fn file_path(&self, content_type: ContentType, path: &str) -> Option<PathBuf> {
        if path.is_empty() {
            return None;
        }
        let file = self.root(content_type).join(path);
        file.is_file().then_some(file)
    }
}

/// Normalize a request path into a content path.
///
/// Leading, trailing and repeated slashes are dropped. Segments starting with
/// `.` are rejected: `..` could leave the content root, and hidden
/// directories are never listed so they are never served either.
///
/// - `"/about/team/"` → `"about/team"`
/// - `""` or `"/"` → `""`
/// - `"a/../b"` → `NotFound`
pub fn normalize_path(raw: &str) -> Result<String> {
    let mut segments = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" => continue,
            s if s.starts_with('.') => return Err(ContentError::NotFound(raw.to_string())),
            s if s.contains('\\') || s.contains('\0') => {
                return Err(ContentError::NotFound(raw.to_string()));
            }
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

/// Parent of a normalized path, or `None` for the root.
pub fn parent_path(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or(""))
}

fn relative_to_string(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Missing files (or a file where a directory was expected) are "not found";
/// everything else is a genuine IO failure.
fn open_error(err: io::Error, path: &Path) -> ContentError {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
            ContentError::NotFound(path.display().to_string())
        }
        _ => ContentError::Io(err),
    }
}
