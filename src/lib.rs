//! # kisspages
//!
//! A minimal flat-file blog and portfolio server. Your filesystem is the
//! database: every page and every work is a directory holding an `index.txt`
//! with a short positional header followed by markdown.
//!
//! # Architecture: Store, Cache, Views
//!
//! ```text
//! content/  ──▶  ContentStore  ──▶  parser  ──▶  ContentCache  ──▶  Site  ──▶  serve
//!  (files)       (directories)      (records)    (memory/redis)    (API)      (HTTP)
//!                      ▲                                            │
//!                      └──────────────── writer ◀───────────────────┘
//! ```
//!
//! - Requests resolve through [`site::Site`], which normalizes the path and
//!   asks the [`cache`] for a record, parsing `index.txt` only on a miss.
//! - Navigation and breadcrumbs are read straight from disk on every call.
//! - The work collection (all works plus their tag union) is memoized once
//!   per process in [`works`].
//! - Admin edits go through [`writer`], which rewrites `index.txt` and evicts
//!   the cache entry.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Content records, navigation entries, the work collection |
//! | [`error`] | `ContentError`: the failure kinds the routing layer maps to statuses |
//! | [`store`] | Content directory layout, `index.txt` reads, path normalization |
//! | [`parser`] | Positional header parsing into `ContentRecord`s |
//! | [`markdown`] | Markdown to HTML with tables, footnotes and definition lists |
//! | [`cache`] | Typed record cache over memory or Redis backends, start-up warm-up |
//! | [`navigation`] | Child page menus and root-first breadcrumbs |
//! | [`works`] | Memoized work collection and tag filtering |
//! | [`writer`] | Saving edits back to `index.txt` |
//! | [`site`] | The service object the server talks to |
//! | [`config`] | `kisspages.toml` loading and validation |
//! | [`render`] | Maud templates for pages, works and the admin surface |
//! | [`serve`] | `tiny_http` request loop and routing |
//! | [`output`] | CLI output formatting for `check` |
//!
//! # Design Decisions
//!
//! ## Positional Headers
//!
//! Header fields are found by line number and label length, not by parsing
//! `key: value` pairs. Line 1 minus 7 characters is the title; works add tags,
//! date and a one-line summary on lines 2 to 4. The label text itself is never
//! checked, so `Title:` misspelled still yields a title. Keeping the format
//! dumb keeps it editable in any text editor.
//!
//! ## Explicit Invalidation
//!
//! Cached records have no freshness check. An entry lives until the writer
//! evicts it or the cache is rebuilt at start-up. Files edited behind the
//! server's back show up after a restart.
//!
//! ## Failing Open
//!
//! The cache is an optimization, not a source of truth. When Redis is down,
//! reads parse from disk and log a warning; only operations that would leave
//! stale entries behind report the failure.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/). Header fields are
//! escaped automatically; only markdown output is injected raw.

pub mod cache;
pub mod config;
pub mod error;
pub mod markdown;
pub mod navigation;
pub mod output;
pub mod parser;
pub mod render;
pub mod serve;
pub mod site;
pub mod store;
pub mod types;
pub mod works;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_helpers;
