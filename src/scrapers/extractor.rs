//! Main-text extraction from arbitrary article pages.
//!
//! The extractor never fails. It walks a fixed fallback chain and returns the
//! first usable text:
//!
//! 1. Embedded JSON-LD `articleBody`/`description` for domains known to hide
//!    their body in structured data.
//! 2. Non-content elements (`script`, `style`, `nav`, `footer`, `header`,
//!    `aside`, `iframe`, `noscript`) are removed, then an ordered list of
//!    [`ContainerProbe`]s picks the element most likely to hold the article.
//! 3. Paragraphs inside that container, or its raw text.
//! 4. Long paragraphs from anywhere on the page.
//! 5. For very short results: page title and meta description, then headings.
//! 6. A placeholder naming the source domain.
//!
//! Text is always whitespace-collapsed and bounded by the configured maximum.

use crate::config::ExtractionSettings;
use crate::models::ExtractedArticle;
use crate::utils::{collapse_whitespace, domain_of, truncate_chars};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

static STRIP_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script, style, nav, footer, header, aside, iframe, noscript").unwrap()
});
static JSON_LD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static ARTICLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static TEST_ID_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("[data-testid]").unwrap());
static CLASS_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("[class]").unwrap());
static MAIN_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("main").unwrap());
static DIV_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div").unwrap());
static P_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static META_DESCRIPTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[name="description"], meta[property="og:description"]"#).unwrap()
});
static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2, h3").unwrap());

static PAYWALL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)subscribe|subscription|paywall|premium").unwrap());

/// Class-name fragments that usually mark the article body.
const CONTENT_CLASS_HINTS: [&str; 8] = [
    "article", "content", "main", "story", "entry", "post", "text", "body",
];

/// A named rule that locates a candidate article container.
///
/// Probes are pure functions of the parsed document and are tried in order;
/// the first one returning an element wins.
#[derive(Clone, Copy)]
pub struct ContainerProbe {
    pub name: &'static str,
    pub find: for<'a> fn(&'a Html, &ExtractionSettings) -> Option<ElementRef<'a>>,
}

/// Probe order used by [`ArticleExtractor`].
pub const CONTAINER_PROBES: [ContainerProbe; 5] = [
    ContainerProbe {
        name: "article_element",
        find: find_article_element,
    },
    ContainerProbe {
        name: "article_test_id",
        find: find_article_test_id,
    },
    ContainerProbe {
        name: "content_class",
        find: find_content_class,
    },
    ContainerProbe {
        name: "main_element",
        find: find_main_element,
    },
    ContainerProbe {
        name: "paragraph_dense_div",
        find: find_paragraph_dense_div,
    },
];

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn has_text(element: &ElementRef<'_>) -> bool {
    element.text().any(|t| !t.trim().is_empty())
}

fn find_article_element<'a>(doc: &'a Html, _: &ExtractionSettings) -> Option<ElementRef<'a>> {
    doc.select(&ARTICLE_SELECTOR).find(has_text)
}

fn find_article_test_id<'a>(doc: &'a Html, _: &ExtractionSettings) -> Option<ElementRef<'a>> {
    doc.select(&TEST_ID_SELECTOR)
        .filter(|el| {
            el.value()
                .attr("data-testid")
                .is_some_and(|id| id.to_lowercase().contains("article"))
        })
        .find(has_text)
}

fn find_content_class<'a>(doc: &'a Html, _: &ExtractionSettings) -> Option<ElementRef<'a>> {
    CONTENT_CLASS_HINTS.iter().find_map(|hint| {
        doc.select(&CLASS_SELECTOR)
            .filter(|el| {
                el.value()
                    .attr("class")
                    .is_some_and(|class| class.to_lowercase().contains(hint))
            })
            .find(has_text)
    })
}

fn find_main_element<'a>(doc: &'a Html, _: &ExtractionSettings) -> Option<ElementRef<'a>> {
    doc.select(&MAIN_SELECTOR).find(has_text)
}

/// The div with the most direct `<p>` children (first one on ties), if it has enough.
fn find_paragraph_dense_div<'a>(
    doc: &'a Html,
    settings: &ExtractionSettings,
) -> Option<ElementRef<'a>> {
    let mut best: Option<(ElementRef<'a>, usize)> = None;
    for div in doc.select(&DIV_SELECTOR) {
        let count = child_paragraphs(div);
        if best.is_none_or(|(_, max)| count > max) {
            best = Some((div, count));
        }
    }
    best.filter(|(_, count)| *count >= settings.min_container_paragraphs)
        .map(|(div, _)| div)
}

fn child_paragraphs(div: ElementRef<'_>) -> usize {
    div.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "p")
        .count()
}

/// Heuristic article-body extractor.
#[derive(Debug, Clone, Default)]
pub struct ArticleExtractor {
    settings: ExtractionSettings,
}

impl ArticleExtractor {
    pub fn new(settings: ExtractionSettings) -> Self {
        Self { settings }
    }

    /// Extract the main text of `html`, fetched from `source_url`.
    #[instrument(level = "info", skip_all, fields(url = %source_url))]
    pub fn extract(&self, html: &str, source_url: &str) -> ExtractedArticle {
        let max = self.settings.max_text_chars;

        let paywall_suspected = PAYWALL_REGEX.is_match(html);
        if paywall_suspected {
            warn!(url = %source_url, "Possible paywall detected");
        }

        let mut document = Html::parse_document(html);

        if self.uses_structured_data(source_url) {
            if let Some(body) = structured_article_body(&document) {
                info!(url = %source_url, chars = body.chars().count(), "Extracted structured article body");
                return ExtractedArticle::new(source_url, truncate_chars(&body, max), paywall_suspected);
            }
            debug!(url = %source_url, "No structured article body; using generic extraction");
        }

        // Title and description live in <head>, which stripping leaves alone.
        let title = first_text(&document, &TITLE_SELECTOR);
        let meta_description = meta_description(&document);

        strip_non_content(&mut document);

        let mut text = self.container_text(&document, source_url);
        if text.is_empty() {
            text = self.page_paragraphs(&document);
        }
        let mut text = collapse_whitespace(&text);

        if text.chars().count() < self.settings.min_content_chars {
            if let Some(fallback) = title_and_description(title.as_deref(), meta_description.as_deref()) {
                info!(url = %source_url, "Using title and meta description as fallback");
                text = fallback;
            } else {
                let headings = headings_text(&document);
                if !headings.is_empty() {
                    info!(url = %source_url, "Using headings as fallback");
                    text = headings;
                }
            }
        }

        if text.is_empty() {
            warn!(url = %source_url, "Nothing extractable");
            return ExtractedArticle::placeholder(source_url, &domain_of(source_url));
        }

        info!(url = %source_url, chars = text.chars().count(), "Scraped article text");
        ExtractedArticle::new(source_url, truncate_chars(&text, max), paywall_suspected)
    }

    fn uses_structured_data(&self, url: &str) -> bool {
        let host = domain_of(url).to_lowercase();
        self.settings
            .structured_data_domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    }

    fn container_text(&self, document: &Html, source_url: &str) -> String {
        let Some((probe, container)) = CONTAINER_PROBES
            .iter()
            .find_map(|probe| (probe.find)(document, &self.settings).map(|el| (probe, el)))
        else {
            debug!(url = %source_url, "No container matched");
            return String::new();
        };
        debug!(url = %source_url, probe = probe.name, "Selected container");

        let paragraphs: Vec<String> = container
            .select(&P_SELECTOR)
            .map(element_text)
            .filter(|p| p.chars().count() >= self.settings.min_paragraph_chars)
            .collect();

        if paragraphs.is_empty() {
            element_text(container)
        } else {
            paragraphs.join(" ")
        }
    }

    fn page_paragraphs(&self, document: &Html) -> String {
        document
            .select(&P_SELECTOR)
            .map(element_text)
            .filter(|p| p.chars().count() > self.settings.min_page_paragraph_chars)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn strip_non_content(document: &mut Html) {
    let ids: Vec<_> = document.select(&STRIP_SELECTOR).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn meta_description(document: &Html) -> Option<String> {
    document
        .select(&META_DESCRIPTION_SELECTOR)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|c| !c.is_empty())
}

fn title_and_description(title: Option<&str>, description: Option<&str>) -> Option<String> {
    match (title, description) {
        (Some(t), Some(d)) => Some(format!("{t}. {d}")),
        (Some(t), None) => Some(t.to_string()),
        (None, Some(d)) => Some(d.to_string()),
        (None, None) => None,
    }
}

fn headings_text(document: &Html) -> String {
    document
        .select(&HEADING_SELECTOR)
        .map(element_text)
        .filter(|h| !h.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `articleBody`, else `description`, from the page's JSON-LD blocks.
fn structured_article_body(document: &Html) -> Option<String> {
    let blocks: Vec<Value> = document
        .select(&JSON_LD_SELECTOR)
        .filter_map(|script| {
            serde_json::from_str::<Value>(script.text().collect::<String>().trim()).ok()
        })
        .collect();

    ["articleBody", "description"].iter().find_map(|key| {
        blocks
            .iter()
            .find_map(|block| find_string_field(block, key))
    })
}

fn find_string_field(value: &Value, key: &str) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get(key) {
                let s = collapse_whitespace(s);
                if !s.is_empty() {
                    return Some(s);
                }
            }
            map.values().find_map(|v| find_string_field(v, key))
        }
        Value::Array(items) => items.iter().find_map(|v| find_string_field(v, key)),
        _ => None,
    }
}
