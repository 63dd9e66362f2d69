//! Markdown to HTML conversion for content bodies.
//!
//! Enables the extensions content files were written against: tables,
//! footnotes, definition lists, strikethrough and heading attributes. Fenced
//! code blocks are core CommonMark and need no flag.
//!
//! ## Abbreviations
//!
//! pulldown-cmark has no abbreviation extension, so it is layered on top.
//! Definition lines are taken out of the body before parsing:
//!
//! ```text
//! The HTML standard.
//!
//! *[HTML]: Hyper Text Markup Language
//! ```
//!
//! and every whole-word occurrence in ordinary text becomes
//! `<abbr title="Hyper Text Markup Language">HTML</abbr>`. Code spans and
//! code blocks are left alone.

use maud::html as markup;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html};
use regex::Regex;
use std::borrow::Cow;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static ABBR_DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\[(.+?)\]:[ \t]*(.*)$").unwrap());

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_DEFINITION_LIST);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options
}

/// Render a markdown body. Pure: the same input always yields the same HTML.
pub fn to_html(markdown: &str) -> String {
    let (body, definitions) = extract_abbreviations(markdown);
    let mut out = String::with_capacity(body.len() + body.len() / 2);
    let parser = Parser::new_ext(&body, options());
    match Abbreviations::new(definitions) {
        Some(abbreviations) => html::push_html(&mut out, abbreviations.apply(parser)),
        None => html::push_html(&mut out, parser),
    }
    out
}

/// Split `*[ABBR]: title` lines off the body. Lines inside fenced code are
/// kept. A later definition of the same abbreviation wins.
fn extract_abbreviations(markdown: &str) -> (Cow<'_, str>, BTreeMap<String, String>) {
    let mut definitions = BTreeMap::new();
    if !markdown.contains("*[") {
        return (Cow::Borrowed(markdown), definitions);
    }

    let mut body = String::with_capacity(markdown.len());
    let mut fence: Option<&str> = None;
    for line in markdown.split_inclusive('\n') {
        let content = line.trim_end_matches(['\r', '\n']);
        let marker = content.trim_start();
        if marker.starts_with("```") || marker.starts_with("~~~") {
            let kind = &marker[..3];
            fence = match fence {
                Some(open) if open == kind => None,
                None => Some(kind),
                open => open,
            };
        } else if fence.is_none() {
            if let Some(caps) = ABBR_DEFINITION.captures(content) {
                definitions.insert(caps[1].to_string(), caps[2].trim().to_string());
                continue;
            }
        }
        body.push_str(line);
    }
    (Cow::Owned(body), definitions)
}

/// Abbreviation titles plus one pattern matching any of them as a word.
struct Abbreviations {
    pattern: Regex,
    titles: BTreeMap<String, String>,
}

impl Abbreviations {
    fn new(titles: BTreeMap<String, String>) -> Option<Self> {
        if titles.is_empty() {
            return None;
        }
        // Longest first, so `HTML5` wins over `HTML`.
        let mut names: Vec<&str> = titles.keys().map(String::as_str).collect();
        names.sort_by_key(|name| Reverse(name.len()));
        let alternation: Vec<String> = names.into_iter().map(regex::escape).collect();
        let pattern = Regex::new(&format!(r"\b(?:{})\b", alternation.join("|"))).ok()?;
        Some(Self { pattern, titles })
    }

    fn apply<'a>(
        &'a self,
        events: impl Iterator<Item = Event<'a>> + 'a,
    ) -> impl Iterator<Item = Event<'a>> + 'a {
        let mut in_code_block = false;
        events.flat_map(move |event| match event {
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                vec![event]
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                vec![event]
            }
            Event::Text(text) if !in_code_block => self.expand(text),
            other => vec![other],
        })
    }

    /// Break a text event around abbreviation matches.
    fn expand<'a>(&self, text: CowStr<'a>) -> Vec<Event<'a>> {
        if !self.pattern.is_match(&text) {
            return vec![Event::Text(text)];
        }

        let mut events = Vec::new();
        let mut last = 0;
        for found in self.pattern.find_iter(&text) {
            if found.start() > last {
                events.push(Event::Text(CowStr::from(text[last..found.start()].to_string())));
            }
            let name = found.as_str();
            let title = self.titles.get(name).map(String::as_str).unwrap_or_default();
            let abbr = markup! { abbr title=(title) { (name) } };
            events.push(Event::InlineHtml(CowStr::from(abbr.into_string())));
            last = found.end();
        }
        if last < text.len() {
            events.push(Event::Text(CowStr::from(text[last..].to_string())));
        }
        events
    }
}
