//! HTML rendering for the server.
//!
//! Every response body is built here with [maud](https://maud.lambda.xyz/).
//! Titles, tags and other header fields are auto-escaped; only the
//! markdown-rendered body of a record is injected raw.
//!
//! ## Page Layout
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Home › About › Team          (breadcrumb) │
//! │ About  Contact  Works          (site nav) │
//! ├──────────────────────────────────────────┤
//! │ children / tags                 (sub nav) │
//! │ <h1>title</h1>                            │
//! │ rendered markdown                         │
//! └──────────────────────────────────────────┘
//! ```
//!
//! The stylesheet (`static/style.css`) is embedded at compile time.

use crate::types::{
    Backlink, ContentFields, ContentListing, ContentRecord, ContentType, NavigationEntry,
};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::collections::BTreeSet;

const CSS: &str = include_str!("../static/style.css");

/// Outcome banner shown above the admin edit form.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Saved,
    Error(String),
}

// ============================================================================
// URLs
// ============================================================================

/// Admin edit URL for a piece of content. The root page is `/admin/pages`.
pub fn admin_url(content_type: ContentType, path: &str) -> String {
    match (content_type, path) {
        (ContentType::Page, "") => "/admin/pages".to_string(),
        (ContentType::Page, path) => format!("/admin/pages/{path}"),
        (ContentType::Work, path) => format!("/admin/works/{path}"),
    }
}

pub fn tag_url(tag: &str) -> String {
    format!("/tag/{}", urlencoding::encode(tag))
}

/// Sub-navigation entries for the works section, one per tag.
pub fn tag_links(tags: &BTreeSet<String>) -> Vec<NavigationEntry> {
    tags.iter()
        .map(|tag| NavigationEntry {
            url: tag_url(tag),
            name: tag.clone(),
        })
        .collect()
}

fn is_current(entry_url: &str, current_url: &str) -> bool {
    let entry = entry_url.trim_end_matches('/');
    let current = current_url.trim_end_matches('/');
    !entry.is_empty() && (entry == current || current.starts_with(&format!("{entry}/")))
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

/// Renders the site header with breadcrumb and navigation
fn site_header(breadcrumb: Markup, nav: Markup) -> Markup {
    html! {
        header.site-header {
            nav.breadcrumb {
                (breadcrumb)
            }
            nav.site-nav {
                (nav)
            }
        }
    }
}

/// Breadcrumb trail, root first. The last link is the current page.
pub fn render_breadcrumb(backlinks: &[Backlink]) -> Markup {
    html! {
        @for (i, link) in backlinks.iter().enumerate() {
            @if i > 0 {
                span.sep { "›" }
            }
            a href=(link.url) { (link.name) }
        }
    }
}

/// Top-level menu: the root page's children plus the works section.
pub fn render_nav(items: &[NavigationEntry], current_url: &str) -> Markup {
    let works_current = current_url.starts_with("/works") || current_url.starts_with("/tag");
    html! {
        ul {
            @for item in items {
                li class=[is_current(&item.url, current_url).then_some("current")] {
                    a href=(item.url) { (item.name) }
                }
            }
            li class=[works_current.then_some("current")] {
                a href="/works" { "Works" }
            }
        }
    }
}

fn render_sub_nav(items: &[NavigationEntry], current_url: &str) -> Markup {
    html! {
        @if !items.is_empty() {
            nav.sub-nav {
                ul {
                    @for item in items {
                        li class=[is_current(&item.url, current_url).then_some("current")] {
                            a href=(item.url) { (item.name) }
                        }
                    }
                }
            }
        }
    }
}

fn render_tags(tags: &BTreeSet<String>) -> Markup {
    html! {
        @if !tags.is_empty() {
            span.tags {
                @for tag in tags {
                    a href=(tag_url(tag)) { (tag) }
                }
            }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// A page with its child pages as sub-navigation.
pub fn render_page(
    page: &ContentRecord,
    navigation: &[NavigationEntry],
    children: &[NavigationEntry],
    backlinks: &[Backlink],
) -> Markup {
    let content = html! {
        (site_header(render_breadcrumb(backlinks), render_nav(navigation, &page.url)))
        (render_sub_nav(children, &page.url))
        main.page {
            h1 { (page.title) }
            (PreEscaped(&page.rendered_html))
        }
    };
    base_document(&page.title, Some("page-view"), content)
}

/// The works index, optionally narrowed to one tag.
pub fn render_works(
    works: &[ContentRecord],
    navigation: &[NavigationEntry],
    tags: &[NavigationEntry],
    backlinks: &[Backlink],
    active_tag: Option<&str>,
) -> Markup {
    let current_url = active_tag.map(tag_url).unwrap_or_else(|| "/works".to_string());
    let heading = match active_tag {
        Some(tag) => format!("Works tagged {tag}"),
        None => "Works".to_string(),
    };

    let content = html! {
        (site_header(render_breadcrumb(backlinks), render_nav(navigation, &current_url)))
        (render_sub_nav(tags, &current_url))
        main.works {
            h1 { (heading) }
            @if works.is_empty() {
                p { "Nothing here yet." }
            } @else {
                ul.work-list {
                    @for work in works {
                        li {
                            a href=(work.url) { (work.title) }
                            @if !work.date.is_empty() {
                                " " span.work-date { (work.date) }
                            }
                            @if !work.short.is_empty() {
                                p { (work.short) }
                            }
                            div.work-meta { (render_tags(&work.tags)) }
                        }
                    }
                }
            }
        }
    };
    base_document(&heading, Some("works-view"), content)
}

/// A single work.
pub fn render_work(
    work: &ContentRecord,
    navigation: &[NavigationEntry],
    tags: &[NavigationEntry],
    backlinks: &[Backlink],
) -> Markup {
    let content = html! {
        (site_header(render_breadcrumb(backlinks), render_nav(navigation, &work.url)))
        (render_sub_nav(tags, &work.url))
        main.work {
            h1 { (work.title) }
            div.work-meta {
                @if !work.date.is_empty() {
                    span.work-date { (work.date) } " "
                }
                (render_tags(&work.tags))
            }
            (PreEscaped(&work.rendered_html))
        }
    };
    base_document(&work.title, Some("work-view"), content)
}

pub fn render_error(status: u16, message: &str) -> Markup {
    let title = match status {
        400 => "Bad request",
        404 => "Not found",
        405 => "Method not allowed",
        413 => "Payload too large",
        _ => "Something went wrong",
    };
    let content = html! {
        main.error-page {
            h1 { (status) " " (title) }
            p { (message) }
            p { a href="/" { "Back to the start page" } }
        }
    };
    base_document(title, Some("error-view"), content)
}

// ============================================================================
// Admin
// ============================================================================

pub fn render_admin_dashboard(pages: &[ContentListing], works: &[ContentListing]) -> Markup {
    let content = html! {
        main.admin {
            h1 { "Admin" }
            h2 { "Pages" }
            (admin_list(ContentType::Page, pages))
            h2 { "Works" }
            (admin_list(ContentType::Work, works))
        }
    };
    base_document("Admin", Some("admin-view"), content)
}

fn admin_list(content_type: ContentType, entries: &[ContentListing]) -> Markup {
    html! {
        ul {
            @for entry in entries {
                li {
                    a href=(admin_url(content_type, &entry.path)) { (entry.title) }
                    @if entry.malformed {
                        " " span.malformed { "malformed" }
                    } @else {
                        " " a.view href=(entry.url) { "view" }
                    }
                }
            }
        }
    }
}

/// Edit form for one piece of content. Pages only get a title and a body.
pub fn render_admin_form(
    content_type: ContentType,
    path: &str,
    fields: &ContentFields,
    notice: Option<&Notice>,
) -> Markup {
    let tags: Vec<&str> = fields.tags.iter().map(String::as_str).collect();
    let view_url = content_type.url_for(path);

    let content = html! {
        main.admin {
            p { a href="/admin" { "← Admin" } " " a href=(view_url) { "view" } }
            h1 { "Edit " (fields.title) }
            @match notice {
                Some(Notice::Saved) => {
                    div.notice.saved { "Saved." }
                }
                Some(Notice::Error(message)) => {
                    div.notice.error { (message) }
                }
                None => {}
            }
            form.admin-form method="post" action=(admin_url(content_type, path)) {
                label for="title" { "Title" }
                input id="title" type="text" name="title" value=(fields.title);
                @if content_type == ContentType::Work {
                    label for="tags" { "Tags (comma separated)" }
                    input id="tags" type="text" name="tags" value=(tags.join(", "));
                    label for="date" { "Date" }
                    input id="date" type="text" name="date" value=(fields.date);
                    label for="short" { "Short" }
                    input id="short" type="text" name="short" value=(fields.short);
                }
                label for="markdown" { "Content" }
                textarea id="markdown" name="markdown" { (fields.markdown) }
                p { button type="submit" { "Save" } }
            }
        }
    };
    base_document(&format!("Edit {}", fields.title), Some("admin-view"), content)
}
