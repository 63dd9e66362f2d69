//! CLI output formatting for the `check` command.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every entity leads
//! with its positional index and title, followed by `→` and the URL it is
//! served at. Source files and header details are indented context lines.
//!
//! # Output Format
//!
//! ```text
//! Pages
//! 001 Home → /
//!     001 About → /about
//!         001 Team → /about/team
//!     002 Contact → /contact
//!
//! Works
//! 001 Launch → /works/launch
//!     Date: 2021-01-01
//!     Tags: rocket, space
//!
//! Tags
//!     rocket, space
//!
//! Failures
//!     work/broken
//!         Malformed content in content/works/broken/index.txt: ...
//!
//! Checked 4 pages, 1 work, 1 failure (5 parsed)
//! ```
//!
//! # Architecture
//!
//! [`format_check_output`] returns `Vec<String>` for testability and
//! [`print_check_output`] writes it to stdout. The format function is pure:
//! no I/O, no side effects.

use crate::cache::{CacheStats, RebuildReport};
use crate::types::ContentRecord;
use std::collections::BTreeSet;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entity header: positional index, title and URL.
///
/// ```text
/// 001 About → /about
/// ```
fn entity_header(index: usize, title: &str, url: &str) -> String {
    format!("{} {} \u{2192} {}", format_index(index), title, url)
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

/// Depth of a page path in the tree: the root is 0, `about` is 1.
fn page_depth(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split('/').count()
    }
}

// ============================================================================
// Tree walker
// ============================================================================

/// A page placed in the tree with its position among siblings.
struct TreeNode<'a> {
    depth: usize,
    position: usize,
    page: &'a ContentRecord,
}

/// Assign depth and per-level positions to pages in walk order.
///
/// Walk order lists a parent before its children, so a running counter per
/// depth, reset whenever the walk climbs back up, yields sibling positions.
fn walk_page_tree(pages: &[ContentRecord]) -> Vec<TreeNode<'_>> {
    let mut counters: Vec<usize> = Vec::new();
    pages
        .iter()
        .map(|page| {
            let depth = page_depth(&page.path);
            counters.resize(depth + 1, 0);
            counters[depth] += 1;
            TreeNode {
                depth,
                position: counters[depth],
                page,
            }
        })
        .collect()
}

// ============================================================================
// Check output
// ============================================================================

/// Format the result of checking a site: every page and work that parsed,
/// the tag union, and every file that did not.
pub fn format_check_output(
    pages: &[ContentRecord],
    works: &[ContentRecord],
    report: &RebuildReport,
    stats: &CacheStats,
) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Pages".to_string());
    for node in walk_page_tree(pages) {
        lines.push(format!(
            "{}{}",
            indent(node.depth),
            entity_header(node.position, &node.page.title, &node.page.url)
        ));
    }

    lines.push(String::new());
    lines.push("Works".to_string());
    for (i, work) in works.iter().enumerate() {
        lines.push(entity_header(i + 1, &work.title, &work.url));
        if !work.date.is_empty() {
            lines.push(format!("{}Date: {}", indent(1), work.date));
        }
        if !work.tags.is_empty() {
            let tags: Vec<&str> = work.tags.iter().map(String::as_str).collect();
            lines.push(format!("{}Tags: {}", indent(1), tags.join(", ")));
        }
    }

    let all_tags: BTreeSet<&str> = works
        .iter()
        .flat_map(|w| w.tags.iter().map(String::as_str))
        .collect();
    if !all_tags.is_empty() {
        lines.push(String::new());
        lines.push("Tags".to_string());
        lines.push(format!(
            "{}{}",
            indent(1),
            all_tags.into_iter().collect::<Vec<_>>().join(", ")
        ));
    }

    if !report.failures.is_empty() {
        lines.push(String::new());
        lines.push("Failures".to_string());
        for (key, err) in &report.failures {
            lines.push(format!("{}{}", indent(1), key));
            lines.push(format!("{}{}", indent(2), err));
        }
    }

    lines.push(String::new());
    let mut summary = format!("Checked {}, {}", plural(pages.len(), "page"), plural(works.len(), "work"));
    if !report.failures.is_empty() {
        summary.push_str(&format!(", {}", plural(report.failures.len(), "failure")));
    }
    summary.push_str(&format!(" ({stats})"));
    lines.push(summary);

    lines
}

/// Print check output to stdout.
pub fn print_check_output(
    pages: &[ContentRecord],
    works: &[ContentRecord],
    report: &RebuildReport,
    stats: &CacheStats,
) {
    for line in format_check_output(pages, works, report, stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
