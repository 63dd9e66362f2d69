//! Shared test utilities for the kisspages test suite.
//!
//! Every test works on a private copy of `fixtures/content/`, so tests can
//! edit files freely.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! write_index(tmp.path(), "works/apollo", "Title: Apollo\nTAGS: moon\nDATE: 1969\nSHORT: s\n");
//! let store = content_store(&tmp);
//! assert!(store.has_index(ContentType::Work, "apollo"));
//! ```
//!
//! The fixture tree:
//!
//! ```text
//! pages/index.txt               Home
//! pages/about/index.txt         About
//! pages/about/portrait.jpg      (static file)
//! pages/about/team/index.txt    Team
//! pages/contact/index.txt       Contact
//! works/launch/index.txt        Launch      space, rocket
//! works/orbit/index.txt         Orbit       rocket, orbit
//! works/splashdown/index.txt    Splashdown  ocean, space
//! ```

use std::collections::BTreeSet;
use std::path::Path;
use tempfile::TempDir;

use crate::store::{ContentStore, INDEX_FILE};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// The temp directory is the content root: it holds `pages/` and `works/`.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// A store rooted at a fixture copy.
pub fn content_store(tmp: &TempDir) -> ContentStore {
    ContentStore::new(tmp.path())
}

// =========================================================================
// Content edits
// =========================================================================

/// Write `index.txt` under `root/rel_dir`, creating the directory.
pub fn write_index(root: &Path, rel_dir: &str, content: &str) {
    let dir = root.join(rel_dir);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(INDEX_FILE), content).unwrap();
}

/// Build a tag set from string literals.
pub fn tag_set(tags: &[&str]) -> BTreeSet<String> {
    tags.iter().map(|t| t.to_string()).collect()
}
