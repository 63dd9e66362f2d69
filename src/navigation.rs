//! Child menus and breadcrumbs derived from the pages tree.
//!
//! Both are rebuilt from disk on every call and never cached; each entry costs
//! one title-line read. Page counts on a personal site stay small enough for
//! that to be cheaper than another invalidation contract.

use crate::error::{ContentError, Result};
use crate::store::{self, ContentStore};
use crate::types::{Backlink, ContentType, NavigationEntry};

/// URL of a page directory as linked from menus: `/` for the root, otherwise
/// `/<path>/`.
pub fn page_dir_url(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        format!("/{path}/")
    }
}

/// One entry per immediate child page of `path`, sorted by directory name.
///
/// Subdirectories without an `index.txt` (image folders and the like) are not
/// pages and are skipped. Fails with `NotFound` when `path` itself does not
/// exist.
pub fn list_children(store: &ContentStore, path: &str) -> Result<Vec<NavigationEntry>> {
    let mut entries = Vec::new();
    for name in store.child_dirs(ContentType::Page, path)? {
        let child = if path.is_empty() {
            name
        } else {
            format!("{path}/{name}")
        };
        if !store.has_index(ContentType::Page, &child) {
            continue;
        }
        entries.push(NavigationEntry {
            name: store.read_title(ContentType::Page, &child)?,
            url: page_dir_url(&child),
        });
    }
    Ok(entries)
}

/// Breadcrumbs from the root page down to `path`, inclusive.
///
/// `"a/b/c"` yields `["", "a", "a/b", "a/b/c"]`; the root alone yields `[""]`.
/// Every ancestor must have an `index.txt`.
pub fn build_backlinks(store: &ContentStore, path: &str) -> Result<Vec<Backlink>> {
    let mut chain = vec![path];
    let mut current = path;
    while let Some(parent) = store::parent_path(current) {
        chain.push(parent);
        current = parent;
    }
    chain.reverse();

    chain
        .into_iter()
        .map(|prefix| -> Result<Backlink> {
            let name = store
                .read_title(ContentType::Page, prefix)
                .map_err(|err| match err {
                    ContentError::NotFound(_) => {
                        ContentError::NotFound(format!("page '{prefix}' on the way to '{path}'"))
                    }
                    other => other,
                })?;
            Ok(Backlink {
                url: page_dir_url(prefix),
                name,
            })
        })
        .collect()
}
