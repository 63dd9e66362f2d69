//! HTTP server.
//!
//! A single-threaded `tiny_http` loop in front of a [`Site`]. Request
//! handling is split in two so routing can be tested without a socket:
//! [`handle`] turns a method, URL and form body into a [`Reply`], and the
//! loop writes that reply out.
//!
//! ## Routes
//!
//! ```text
//! GET  /works              works index with tag sub-navigation
//! GET  /works/<name>       one work
//! GET  /tag                redirect to /works
//! GET  /tag/<tag>          works carrying <tag>
//! GET  /admin              dashboard of all pages and works
//! GET  /admin/pages[/<p>]  edit form for a page (bare `pages` is the root)
//! GET  /admin/works/<n>    edit form for a work
//! POST /admin/...          save the form, re-render it with a notice
//! GET  /<path>             static file (allowed extension) or page
//! ```
//!
//! Read errors map to `404` (not found) or `500` (malformed file, IO);
//! rejected edits to `400` and oversized form bodies to `413`. The admin
//! views list and open malformed files too, so they can be repaired.

use crate::config::SiteConfig;
use crate::error::ContentError;
use crate::render::{self, Notice};
use crate::site::Site;
use crate::store;
use crate::types::{ContentFields, ContentType};
use maud::Markup;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Could not bind {addr}: {message}")]
    Bind { addr: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Server Entry Point
// ============================================================================

/// Bind `config.interface:port` and answer requests until the process ends.
pub fn serve(site: &Site, config: &SiteConfig, port: u16) -> Result<(), ServeError> {
    let interface: IpAddr = config.interface.parse().map_err(|err| ServeError::Bind {
        addr: config.interface.clone(),
        message: format!("{err}"),
    })?;
    let addr = SocketAddr::new(interface, port);
    let server = Server::http(addr).map_err(|err| ServeError::Bind {
        addr: addr.to_string(),
        message: err.to_string(),
    })?;
    info!(%addr, backend = site.cache().backend_name(), "serving");

    for request in server.incoming_requests() {
        if let Err(err) = respond(site, config, request) {
            warn!(error = %err, "could not answer request");
        }
    }
    Ok(())
}

fn respond(site: &Site, config: &SiteConfig, mut request: Request) -> io::Result<()> {
    let method = request.method().clone();
    let url = request.url().to_string();

    let reply = if method == Method::Post {
        match read_form_body(request.as_reader(), MAX_FORM_BODY)? {
            Some(body) => handle(site, config, &method, &url, &body),
            None => {
                warn!(%url, limit = MAX_FORM_BODY, "form body too large");
                Reply::html(413, render::render_error(413, "Form body too large"))
            }
        }
    } else {
        handle(site, config, &method, &url, "")
    };
    debug!(%method, %url, status = reply.status, "request");

    match reply.body {
        Body::Html(html) => {
            let response = Response::from_string(html)
                .with_status_code(reply.status)
                .with_header(header("Content-Type", "text/html; charset=utf-8")?);
            request.respond(response)
        }
        Body::Redirect(location) => {
            let response =
                Response::empty(reply.status).with_header(header("Location", &location)?);
            request.respond(response)
        }
        Body::File(path) => match fs::File::open(&path) {
            Ok(file) => {
                let response = Response::from_file(file)
                    .with_header(header("Content-Type", guess_content_type(&path))?);
                request.respond(response)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "static file vanished");
                let html = render::render_error(404, "File not found").into_string();
                request.respond(Response::from_string(html).with_status_code(404))
            }
        },
    }
}

/// Largest admin form submission accepted, in bytes.
pub const MAX_FORM_BODY: u64 = 1024 * 1024;

/// Read a form body of at most `limit` bytes. `None` when it is longer.
fn read_form_body(reader: impl Read, limit: u64) -> io::Result<Option<String>> {
    let mut raw = Vec::new();
    reader.take(limit + 1).read_to_end(&mut raw)?;
    if raw.len() as u64 > limit {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
}

fn header(name: &str, value: &str) -> io::Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|()| io::Error::other(format!("invalid header {name}: {value}")))
}

// ============================================================================
// Replies
// ============================================================================

/// What to send back for one request.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub body: Body,
}

#[derive(Debug)]
pub enum Body {
    Html(String),
    File(PathBuf),
    Redirect(String),
}

impl Reply {
    fn html(status: u16, markup: Markup) -> Self {
        Self {
            status,
            body: Body::Html(markup.into_string()),
        }
    }

    fn ok(markup: Markup) -> Self {
        Self::html(200, markup)
    }

    fn redirect(location: &str) -> Self {
        Self {
            status: 303,
            body: Body::Redirect(location.to_string()),
        }
    }

    fn file(path: PathBuf) -> Self {
        Self {
            status: 200,
            body: Body::File(path),
        }
    }

    fn error(err: &ContentError) -> Self {
        let status = status_for(err);
        Self::html(status, render::render_error(status, &err.to_string()))
    }
}

/// HTTP status for a content error.
pub fn status_for(err: &ContentError) -> u16 {
    match err {
        ContentError::NotFound(_) => 404,
        ContentError::Validation(_) => 400,
        ContentError::Malformed { .. } | ContentError::Io(_) | ContentError::CacheUnavailable(_) => {
            500
        }
    }
}

fn log_failure(err: &ContentError, url: &str) {
    match err {
        ContentError::Malformed { .. } => error!(kind = err.kind(), %url, error = %err, "request failed"),
        ContentError::NotFound(_) => debug!(kind = err.kind(), %url, error = %err, "request failed"),
        _ => warn!(kind = err.kind(), %url, error = %err, "request failed"),
    }
}

// ============================================================================
// Routing
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Works,
    Work(String),
    TagIndex,
    Tag(String),
    AdminDashboard,
    AdminItem(ContentType, String),
    Content(String),
    NotFound,
}

/// Path part of a request URL, percent-decoded. `None` when the path does not
/// decode to UTF-8.
pub fn request_path(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    urlencoding::decode(path).ok().map(|p| p.into_owned())
}

/// Map a decoded request path onto a route.
pub fn route(path: &str) -> Route {
    let trimmed = path.trim_matches('/');
    let (head, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
    let rest = rest.trim_matches('/');
    match head {
        "works" if rest.is_empty() => Route::Works,
        "works" => Route::Work(rest.to_string()),
        "tag" if rest.is_empty() => Route::TagIndex,
        "tag" => Route::Tag(rest.to_string()),
        "admin" if rest.is_empty() => Route::AdminDashboard,
        "admin" => match admin_target(rest) {
            Some((content_type, path)) => Route::AdminItem(content_type, path),
            None => Route::NotFound,
        },
        _ => Route::Content(trimmed.to_string()),
    }
}

/// `pages`, `pages/<path>` or `works/<name>`.
fn admin_target(item: &str) -> Option<(ContentType, String)> {
    let (kind, path) = item.split_once('/').unwrap_or((item, ""));
    match (kind, path) {
        ("pages", path) => Some((ContentType::Page, path.to_string())),
        ("works", "") => None,
        ("works", name) => Some((ContentType::Work, name.to_string())),
        _ => None,
    }
}

/// Answer one request.
pub fn handle(site: &Site, config: &SiteConfig, method: &Method, url: &str, body: &str) -> Reply {
    let route = match request_path(url) {
        Some(path) => route(&path),
        None => Route::NotFound,
    };

    match (method, route) {
        (Method::Post, Route::AdminItem(content_type, path)) => {
            save(site, content_type, &path, body, url)
        }
        (Method::Get | Method::Head, route) => get(site, config, route).unwrap_or_else(|err| {
            log_failure(&err, url);
            Reply::error(&err)
        }),
        _ => Reply::html(405, render::render_error(405, "Method not allowed")),
    }
}

fn get(site: &Site, config: &SiteConfig, route: Route) -> Result<Reply, ContentError> {
    match route {
        Route::Works => works_index(site, None),
        Route::Tag(tag) => works_index(site, Some(&tag)),
        Route::TagIndex => Ok(Reply::redirect("/works")),
        Route::Work(name) => {
            let work = site.resolve_work(&name)?;
            let tags = render::tag_links(&site.work_tags()?);
            Ok(Reply::ok(render::render_work(
                &work,
                &site.navigation("")?,
                &tags,
                &site.backlinks("")?,
            )))
        }
        Route::AdminDashboard => Ok(Reply::ok(render::render_admin_dashboard(
            &site.listing(ContentType::Page)?,
            &site.listing(ContentType::Work)?,
        ))),
        Route::AdminItem(content_type, path) => {
            let (path, fields, parse_error) = site.edit_fields(content_type, &path)?;
            let notice = parse_error.map(|err| {
                warn!(kind = err.kind(), error = %err, "editing malformed content");
                Notice::Error(err.to_string())
            });
            Ok(Reply::ok(render::render_admin_form(
                content_type,
                &path,
                &fields,
                notice.as_ref(),
            )))
        }
        Route::Content(path) => {
            if config.is_allowed_extension(&path) {
                if let Some(file) = site.static_file(&path) {
                    return Ok(Reply::file(file));
                }
            }
            let page = site.resolve_page(&path)?;
            Ok(Reply::ok(render::render_page(
                &page,
                &site.navigation("")?,
                &site.navigation(&page.path)?,
                &site.backlinks(&page.path)?,
            )))
        }
        Route::NotFound => Err(ContentError::NotFound("no such route".into())),
    }
}

fn works_index(site: &Site, tag: Option<&str>) -> Result<Reply, ContentError> {
    let works = site.list_works(tag)?;
    let tags = render::tag_links(&site.work_tags()?);
    Ok(Reply::ok(render::render_works(
        &works,
        &site.navigation("")?,
        &tags,
        &site.backlinks("")?,
        tag,
    )))
}

fn save(site: &Site, content_type: ContentType, path: &str, body: &str, url: &str) -> Reply {
    let path = match store::normalize_path(path) {
        Ok(path) => path,
        Err(err) => return Reply::error(&err),
    };
    let fields = fields_from_form(content_type, &parse_form(body));

    match site.save_content(content_type, &path, &fields) {
        Ok(()) => Reply::ok(render::render_admin_form(
            content_type,
            &path,
            &fields,
            Some(&Notice::Saved),
        )),
        Err(err) => {
            log_failure(&err, url);
            Reply::html(
                status_for(&err),
                render::render_admin_form(
                    content_type,
                    &path,
                    &fields,
                    Some(&Notice::Error(err.to_string())),
                ),
            )
        }
    }
}

// ============================================================================
// Forms
// ============================================================================

/// Decode an `application/x-www-form-urlencoded` body. Later keys win.
pub fn parse_form(body: &str) -> HashMap<String, String> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

/// Build editable fields from a submitted admin form.
///
/// Header fields are trimmed, tags are split on commas, and browser line
/// endings in the body are normalized to `\n`. Pages only take a title and
/// a body.
pub fn fields_from_form(content_type: ContentType, form: &HashMap<String, String>) -> ContentFields {
    let field = |name: &str| form.get(name).map(|v| v.trim().to_string()).unwrap_or_default();
    let markdown = form
        .get("markdown")
        .map(|m| m.replace("\r\n", "\n"))
        .unwrap_or_default();

    match content_type {
        ContentType::Page => ContentFields {
            title: field("title"),
            markdown,
            ..Default::default()
        },
        ContentType::Work => ContentFields {
            title: field("title"),
            tags: field("tags")
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
            date: field("date"),
            short: field("short"),
            markdown,
        },
    }
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",

        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",

        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("zip") => "application/zip",
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",

        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ContentCache;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn site(tmp: &TempDir) -> Site {
        Site::new(content_store(tmp), ContentCache::in_memory())
    }

    fn get(site: &Site, url: &str) -> Reply {
        handle(site, &SiteConfig::default(), &Method::Get, url, "")
    }

    fn post(site: &Site, url: &str, body: &str) -> Reply {
        handle(site, &SiteConfig::default(), &Method::Post, url, body)
    }

    fn html(reply: &Reply) -> &str {
        match &reply.body {
            Body::Html(html) => html,
            other => panic!("expected html, got {other:?}"),
        }
    }

    // =========================================================================
    // Routing
    // =========================================================================

    #[test]
    fn routes_by_first_segment() {
        assert_eq!(route("/works"), Route::Works);
        assert_eq!(route("/works/"), Route::Works);
        assert_eq!(route("/works/launch"), Route::Work("launch".into()));
        assert_eq!(route("/tag"), Route::TagIndex);
        assert_eq!(route("/tag/deep space"), Route::Tag("deep space".into()));
        assert_eq!(route("/admin"), Route::AdminDashboard);
        assert_eq!(route("/"), Route::Content("".into()));
        assert_eq!(route("/about/team/"), Route::Content("about/team".into()));
    }

    #[test]
    fn admin_items_name_their_type() {
        assert_eq!(route("/admin/pages"), Route::AdminItem(ContentType::Page, "".into()));
        assert_eq!(
            route("/admin/pages/about/team"),
            Route::AdminItem(ContentType::Page, "about/team".into())
        );
        assert_eq!(
            route("/admin/works/launch"),
            Route::AdminItem(ContentType::Work, "launch".into())
        );
        assert_eq!(route("/admin/works"), Route::NotFound);
        assert_eq!(route("/admin/launch"), Route::NotFound);
    }

    #[test]
    fn request_path_strips_query_and_decodes() {
        assert_eq!(request_path("/tag/deep%20space?x=1").unwrap(), "/tag/deep space");
        assert_eq!(request_path("/about#team").unwrap(), "/about");
        assert!(request_path("/%FF").is_none());
    }

    // =========================================================================
    // Forms
    // =========================================================================

    #[test]
    fn parse_form_decodes_plus_and_percent() {
        let form = parse_form("title=Hello+world&markdown=a%0D%0Ab%26c&empty=");
        assert_eq!(form["title"], "Hello world");
        assert_eq!(form["markdown"], "a\r\nb&c");
        assert_eq!(form["empty"], "");
    }

    #[test]
    fn work_form_fields() {
        let form = parse_form("title=+Launch+&tags=space%2C+rocket%2C%2C&date=2021&short=s&markdown=x%0D%0Ay");
        let fields = fields_from_form(ContentType::Work, &form);
        assert_eq!(fields.title, "Launch");
        assert_eq!(fields.tags, tag_set(&["rocket", "space"]));
        assert_eq!(fields.markdown, "x\ny");
    }

    #[test]
    fn page_form_ignores_work_fields() {
        let form = parse_form("title=About&tags=x&date=2020&markdown=hi");
        let fields = fields_from_form(ContentType::Page, &form);
        assert!(fields.tags.is_empty());
        assert!(fields.date.is_empty());
        assert_eq!(fields.markdown, "hi");
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[test]
    fn page_renders_with_navigation() {
        let tmp = setup_fixtures();
        let site = site(&tmp);
        let reply = get(&site, "/about/");
        assert_eq!(reply.status, 200);
        let body = html(&reply);
        assert!(body.contains("<h1>About</h1>"));
        assert!(body.contains(r#"<a href="/about/team/">Team</a>"#));
        assert!(body.contains(r#"<a href="/contact/">Contact</a>"#));
    }

    #[test]
    fn root_page_renders() {
        let tmp = setup_fixtures();
        let site = site(&tmp);
        let reply = get(&site, "/");
        assert_eq!(reply.status, 200);
        assert!(html(&reply).contains("<h1>Home</h1>"));
    }

    #[test]
    fn missing_page_is_404() {
        let tmp = setup_fixtures();
        let site = site(&tmp);
        assert_eq!(get(&site, "/nowhere").status, 404);
        assert_eq!(get(&site, "/works/nowhere").status, 404);
        assert_eq!(get(&site, "/../works/launch").status, 404);
    }

    #[test]
    fn malformed_work_is_500() {
        let tmp = setup_fixtures();
        write_index(tmp.path(), "works/broken", "Title: Broken\n");
        let site = site(&tmp);
        let reply = get(&site, "/works/broken");
        assert_eq!(reply.status, 500);
        assert!(html(&reply).contains("expected 4 header lines, found 1"));
    }

    #[test]
    fn works_and_tags() {
        let tmp = setup_fixtures();
        let site = site(&tmp);

        let all = get(&site, "/works");
        assert_eq!(all.status, 200);
        assert!(html(&all).contains("Splashdown"));

        let tagged = get(&site, "/tag/rocket");
        let body = html(&tagged);
        assert!(body.contains("Launch"));
        assert!(body.contains("Orbit"));
        assert!(!body.contains(r#"<a href="/works/splashdown">"#));

        let work = get(&site, "/works/launch");
        assert!(html(&work).contains("<p>Body text.</p>"));
    }

    #[test]
    fn bare_tag_redirects_to_works() {
        let tmp = setup_fixtures();
        let site = site(&tmp);
        let reply = get(&site, "/tag/");
        assert_eq!(reply.status, 303);
        assert!(matches!(reply.body, Body::Redirect(ref to) if to == "/works"));
    }

    #[test]
    fn static_files_need_an_allowed_extension() {
        let tmp = setup_fixtures();
        let site = site(&tmp);

        let image = get(&site, "/about/portrait.jpg");
        assert!(matches!(image.body, Body::File(ref p) if p.ends_with("about/portrait.jpg")));

        // index.txt exists but is never served raw.
        assert_eq!(get(&site, "/about/index.txt").status, 404);
    }

    #[test]
    fn unsupported_method_is_405() {
        let tmp = setup_fixtures();
        let site = site(&tmp);
        let reply = handle(&site, &SiteConfig::default(), &Method::Delete, "/about", "");
        assert_eq!(reply.status, 405);
        assert_eq!(post(&site, "/about", "title=x").status, 405);
    }

    // =========================================================================
    // Admin
    // =========================================================================

    #[test]
    fn dashboard_lists_everything() {
        let tmp = setup_fixtures();
        let site = site(&tmp);
        let reply = get(&site, "/admin");
        let body = html(&reply);
        assert!(body.contains(r#"href="/admin/pages/about/team""#));
        assert!(body.contains(r#"href="/admin/works/orbit""#));
    }

    #[test]
    fn edit_form_shows_current_content() {
        let tmp = setup_fixtures();
        let site = site(&tmp);
        let reply = get(&site, "/admin/works/launch");
        assert_eq!(reply.status, 200);
        assert!(html(&reply).contains(r#"value="rocket, space""#));
        assert_eq!(get(&site, "/admin/pages").status, 200);
    }

    #[test]
    fn malformed_work_stays_editable() {
        let tmp = setup_fixtures();
        write_index(tmp.path(), "works/broken", "Title: Broken\nTAGS: x\n");
        let site = site(&tmp);
        assert_eq!(get(&site, "/works").status, 500);

        let dashboard = get(&site, "/admin");
        assert_eq!(dashboard.status, 200);
        assert!(html(&dashboard).contains(r#"href="/admin/works/broken""#));

        let form = get(&site, "/admin/works/broken");
        assert_eq!(form.status, 200);
        assert!(html(&form).contains("notice error"));
        assert!(html(&form).contains(r#"name="title" value="Broken""#));

        let fixed = post(
            &site,
            "/admin/works/broken",
            "title=Broken&tags=x&date=2022&short=Fixed&markdown=Body.",
        );
        assert_eq!(fixed.status, 200);
        assert_eq!(get(&site, "/works").status, 200);
        assert_eq!(site.resolve_work("broken").unwrap().short, "Fixed");
    }

    #[test]
    fn posting_a_work_saves_and_refreshes_tags() {
        let tmp = setup_fixtures();
        let site = site(&tmp);
        get(&site, "/works");

        let reply = post(
            &site,
            "/admin/works/orbit",
            "title=Orbit&tags=rocket%2C+archive&date=2021-06-15&short=Up&markdown=New+body.",
        );
        assert_eq!(reply.status, 200);
        assert!(html(&reply).contains("Saved."));

        assert!(html(&get(&site, "/tag/archive")).contains(r#"<a href="/works/orbit">Orbit</a>"#));
        assert!(html(&get(&site, "/works/orbit")).contains("<p>New body.</p>"));
    }

    #[test]
    fn posting_without_title_is_400() {
        let tmp = setup_fixtures();
        let site = site(&tmp);
        let reply = post(&site, "/admin/pages/about", "title=&markdown=x");
        assert_eq!(reply.status, 400);
        assert!(html(&reply).contains("title is required"));
        // Nothing changed on disk.
        assert_eq!(site.resolve_page("about").unwrap().title, "About");
    }

    #[test]
    fn posting_to_missing_item_is_500() {
        let tmp = setup_fixtures();
        let site = site(&tmp);
        let reply = post(&site, "/admin/works/ghost", "title=Ghost&markdown=x");
        assert_eq!(reply.status, 500);
    }

    #[test]
    fn form_body_is_capped() {
        let body = read_form_body(io::Cursor::new("title=Hi"), 8).unwrap();
        assert_eq!(body.as_deref(), Some("title=Hi"));
        assert!(read_form_body(io::Cursor::new("title=Hi!"), 8).unwrap().is_none());

        let huge = vec![b'a'; MAX_FORM_BODY as usize + 1];
        assert!(read_form_body(huge.as_slice(), MAX_FORM_BODY).unwrap().is_none());
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(guess_content_type(Path::new("a/b.JPG")), "image/jpeg");
        assert_eq!(guess_content_type(Path::new("cv.pdf")), "application/pdf");
        assert_eq!(guess_content_type(Path::new("blob")), "application/octet-stream");
    }
}
