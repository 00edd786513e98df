//! Topic → candidate article URLs.
//!
//! Discovery walks an ordered chain of search surfaces (see
//! [`DiscoverySettings`]) and stops as soon as the cap is reached:
//!
//! 1. the primary news search page;
//! 2. a secondary news search, when the primary found fewer than
//!    `min_primary_links`;
//! 3. a topic RSS search, when the HTML surfaces together are still short;
//! 4. a web search per source-name hint, when nothing at all was found.
//!
//! Any surface that fails to answer contributes zero links. The result is
//! deduplicated by exact string and keeps discovery order.

use crate::config::{DiscoverySettings, LinkRule, SearchSurface, Settings};
use crate::feeds::rss::parse_feed;
use crate::fetch::{Fetch, RequestKind};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

const REDIRECT_PREFIX: &str = "/url?q=";
const HINT_STOP_WORDS: [&str; 4] = ["news", "the", "and", "for"];
const HINT_TRIM_CHARS: [char; 4] = ['.', ',', ':', '*'];

fn is_http(link: &str) -> bool {
    link.starts_with("http://") || link.starts_with("https://")
}

/// Ordered, unique, capped URL collector.
#[derive(Debug)]
struct Candidates {
    urls: Vec<String>,
    seen: HashSet<String>,
    cap: usize,
}

impl Candidates {
    fn new(cap: usize) -> Self {
        Self {
            urls: Vec::new(),
            seen: HashSet::new(),
            cap,
        }
    }

    fn is_full(&self) -> bool {
        self.urls.len() >= self.cap
    }

    fn len(&self) -> usize {
        self.urls.len()
    }

    fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Add links in order until the cap is hit.
    fn extend(&mut self, links: impl IntoIterator<Item = String>) {
        for link in links {
            if self.is_full() {
                break;
            }
            if self.seen.insert(link.clone()) {
                self.urls.push(link);
            }
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.urls
    }
}

/// Pull article links out of a search surface response according to `rule`.
///
/// Links come back in document order and may contain duplicates.
pub fn extract_links(body: &str, rule: &LinkRule) -> Vec<String> {
    match rule {
        LinkRule::RssItems => match parse_feed(body) {
            Ok(feed) => feed
                .entries
                .into_iter()
                .map(|entry| entry.link.trim().to_string())
                .filter(|link| is_http(link))
                .collect(),
            Err(e) => {
                debug!(error = %e, "Search feed did not parse");
                Vec::new()
            }
        },
        LinkRule::RelativePrefix { prefix, base } => {
            let Ok(base) = Url::parse(base) else {
                warn!(%base, "Invalid base URL in link rule");
                return Vec::new();
            };
            hrefs(body)
                .into_iter()
                .filter(|href| href.starts_with(prefix.as_str()))
                .filter_map(|href| base.join(&href).ok())
                .map(String::from)
                .collect()
        }
        LinkRule::External { exclude } => hrefs(body)
            .into_iter()
            .filter(|href| is_http(href) && !contains_any(href, exclude))
            .collect(),
        LinkRule::Redirect { exclude } => hrefs(body)
            .into_iter()
            .filter_map(|href| redirect_target(&href))
            .filter(|target| is_http(target) && !contains_any(target, exclude))
            .collect(),
    }
}

fn hrefs(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .collect()
}

fn contains_any(link: &str, markers: &[String]) -> bool {
    markers.iter().any(|m| link.contains(m.as_str()))
}

/// Target of a search-engine redirect link such as `/url?q=https://a.test/x&sa=U`.
fn redirect_target(href: &str) -> Option<String> {
    let rest = href.strip_prefix(REDIRECT_PREFIX)?;
    let raw = rest.split('&').next().unwrap_or(rest);
    let target = urlencoding::decode(raw)
        .map(|t| t.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    Some(target)
}

/// Candidate publisher words in a free-text source hint.
///
/// Words are lowercased and trimmed of list punctuation; short words and
/// generic stop words are dropped.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(hint_terms("1. **Reuters** and The Guardian"), vec!["reuters", "guardian"]);
/// ```
pub fn hint_terms(hint: &str) -> Vec<String> {
    hint.split_whitespace()
        .map(|word| word.to_lowercase().trim_matches(&HINT_TRIM_CHARS[..]).to_string())
        .filter(|word| word.chars().count() > 3 && !HINT_STOP_WORDS.contains(&word.as_str()))
        .unique()
        .collect()
}

/// Finds candidate article URLs for a free-text topic.
pub struct UrlDiscovery<F> {
    fetcher: F,
    settings: DiscoverySettings,
    cap: usize,
}

impl<F: Fetch> UrlDiscovery<F> {
    pub fn new(fetcher: F, settings: &Settings) -> Self {
        Self {
            fetcher,
            settings: settings.discovery.clone(),
            cap: settings.max_candidate_urls,
        }
    }

    /// Discover at most `cap` unique article URLs for `query`.
    ///
    /// `hints` are optional publisher names; they are only consulted when
    /// every other surface came up empty.
    #[instrument(level = "info", skip(self, hints), fields(hints = hints.len()))]
    pub async fn discover(&self, query: &str, hints: &[String]) -> Vec<String> {
        let mut found = Candidates::new(self.cap);
        if self.cap == 0 {
            return found.into_vec();
        }

        let primary = self.surface_links(&self.settings.primary, query).await;
        found.extend(primary);

        if found.len() < self.settings.min_primary_links && !found.is_full() {
            info!(found = found.len(), "Too few primary links; trying secondary surface");
            let secondary = self.surface_links(&self.settings.secondary, query).await;
            found.extend(secondary);
        }

        if found.len() < self.settings.min_primary_links && !found.is_full() {
            info!(found = found.len(), "HTML surfaces exhausted; trying feed search");
            let from_feed = self.surface_links(&self.settings.feed, query).await;
            found.extend(from_feed);
        }

        if found.is_empty() && !hints.is_empty() {
            self.search_with_hints(query, hints, &mut found).await;
        }

        info!(count = found.len(), "Discovery finished");
        found.into_vec()
    }

    async fn search_with_hints(&self, query: &str, hints: &[String], found: &mut Candidates) {
        info!(?hints, "Searching with source hints");
        for term in hints.iter().flat_map(|hint| hint_terms(hint)).unique() {
            if found.is_full() {
                break;
            }
            let augmented = format!("{term} {query} news");
            let links = self.surface_links(&self.settings.hint_search, &augmented).await;
            found.extend(links);
        }
    }

    /// Links from one surface; any failure yields none.
    async fn surface_links(&self, surface: &SearchSurface, query: &str) -> Vec<String> {
        let url = surface.search_url(query);
        let kind = match surface.links {
            LinkRule::RssItems => RequestKind::Feed,
            _ => RequestKind::Search,
        };

        match self.fetcher.get_text(&url, kind).await {
            Ok(body) => {
                let links = extract_links(&body, &surface.links);
                info!(surface = %surface.name, links = links.len(), "Collected links");
                links
            }
            Err(e) => {
                warn!(surface = %surface.name, %url, stage = "discovery", error = %e, "Search surface failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockFetcher;

    const QUERY: &str = "solar power";

    fn settings() -> Settings {
        Settings::default()
    }

    fn url_for(surface: &SearchSurface, query: &str) -> String {
        surface.search_url(query)
    }

    fn anchors(hrefs: &[&str]) -> String {
        let links: String = hrefs
            .iter()
            .map(|h| format!(r#"<a href="{h}">link</a>"#))
            .collect();
        format!("<html><body>{links}</body></html>")
    }

    fn rss_items(links: &[&str]) -> String {
        let items: String = links
            .iter()
            .map(|l| format!("<item><title>t</title><link>{l}</link></item>"))
            .collect();
        format!("<rss><channel>{items}</channel></rss>")
    }

    #[test]
    fn test_relative_prefix_links_are_resolved() {
        let rule = settings().discovery.primary.links;
        let body = anchors(&["./articles/abc?hl=en", "./topics/xyz", "https://elsewhere.test/"]);
        assert_eq!(
            extract_links(&body, &rule),
            vec!["https://news.google.com/articles/abc?hl=en".to_string()]
        );
    }

    #[test]
    fn test_external_links_skip_surface_domains() {
        let rule = settings().discovery.secondary.links;
        let body = anchors(&[
            "https://www.bing.com/news/more",
            "https://go.microsoft.com/privacy",
            "https://a.test/story",
            "/relative/path",
        ]);
        assert_eq!(extract_links(&body, &rule), vec!["https://a.test/story".to_string()]);
    }

    #[test]
    fn test_redirect_links_are_unwrapped() {
        let rule = settings().discovery.hint_search.links;
        let body = anchors(&[
            "/url?q=https://a.test/x%3Fid%3D1&sa=U",
            "/url?q=https://maps.google.com/&sa=U",
            "/search?q=other",
        ]);
        assert_eq!(extract_links(&body, &rule), vec!["https://a.test/x?id=1".to_string()]);
    }

    #[test]
    fn test_rss_item_links() {
        let body = rss_items(&["https://a.test/1", "ftp://a.test/2"]);
        assert_eq!(
            extract_links(&body, &LinkRule::RssItems),
            vec!["https://a.test/1".to_string()]
        );
        assert!(extract_links("<html>blocked</html>", &LinkRule::RssItems).is_empty());
    }

    #[test]
    fn test_hint_terms() {
        assert_eq!(
            hint_terms("1. **Reuters** and The Guardian"),
            vec!["reuters".to_string(), "guardian".to_string()]
        );
        assert!(hint_terms("The news for BBC").is_empty());
        assert_eq!(hint_terms("Reuters: reuters."), vec!["reuters".to_string()]);
    }

    #[tokio::test]
    async fn test_primary_with_enough_links_stops_the_chain() {
        let s = settings();
        let fetcher = MockFetcher::new().page(
            &url_for(&s.discovery.primary, QUERY),
            &anchors(&["./articles/1", "./articles/2", "./articles/2", "./articles/3"]),
        );
        let discovery = UrlDiscovery::new(&fetcher, &s);

        let urls = discovery.discover(QUERY, &[]).await;
        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0], "https://news.google.com/articles/1");
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_secondary_fills_a_short_primary() {
        let s = settings();
        let fetcher = MockFetcher::new()
            .page(&url_for(&s.discovery.primary, QUERY), &anchors(&["./articles/1"]))
            .page(
                &url_for(&s.discovery.secondary, QUERY),
                &anchors(&["https://a.test/1", "https://b.test/2", "https://c.test/3"]),
            );
        let discovery = UrlDiscovery::new(&fetcher, &s);

        let urls = discovery.discover(QUERY, &[]).await;
        assert_eq!(
            urls,
            vec![
                "https://news.google.com/articles/1",
                "https://a.test/1",
                "https://b.test/2",
                "https://c.test/3",
            ]
        );
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_feed_search_after_html_failures() {
        let s = settings();
        let fetcher = MockFetcher::new()
            .status(&url_for(&s.discovery.primary, QUERY), 503)
            .page(
                &url_for(&s.discovery.feed, QUERY),
                &rss_items(&["https://a.test/1", "https://a.test/1", "https://b.test/2"]),
            );
        let discovery = UrlDiscovery::new(&fetcher, &s);

        let urls = discovery.discover(QUERY, &[]).await;
        assert_eq!(urls, vec!["https://a.test/1", "https://b.test/2"]);
    }

    #[tokio::test]
    async fn test_hints_used_only_when_everything_else_is_empty() {
        let s = settings();
        let hint_url = url_for(&s.discovery.hint_search, &format!("reuters {QUERY} news"));
        let fetcher = MockFetcher::new().page(
            &hint_url,
            &anchors(&["/url?q=https://reuters.test/solar&sa=U"]),
        );
        let discovery = UrlDiscovery::new(&fetcher, &s);

        let urls = discovery
            .discover(QUERY, &["1. Reuters".to_string(), "".to_string()])
            .await;
        assert_eq!(urls, vec!["https://reuters.test/solar"]);
    }

    #[tokio::test]
    async fn test_no_hints_and_no_results_is_empty() {
        let fetcher = MockFetcher::new();
        let discovery = UrlDiscovery::new(&fetcher, &settings());
        assert!(discovery.discover(QUERY, &[]).await.is_empty());
        assert_eq!(fetcher.call_count(), 3);
    }

    /// Every combination of surface behaviour stays unique and within the cap.
    #[tokio::test]
    async fn test_cap_and_uniqueness_hold_for_all_surface_responses() {
        let s = settings();
        let d = &s.discovery;
        let hint_url = url_for(&d.hint_search, &format!("guardian {QUERY} news"));

        let primary: [Option<String>; 4] = [
            None,
            Some(anchors(&[])),
            Some(anchors(&["./articles/1", "./articles/1"])),
            Some(anchors(&["./articles/1", "./articles/2", "./articles/3", "./articles/4", "./articles/5", "./articles/6", "./articles/7"])),
        ];
        let secondary: [Option<String>; 4] = [
            None,
            Some(anchors(&[])),
            Some(anchors(&["https://news.google.com/articles/1", "https://a.test/1"])),
            Some(anchors(&["https://a.test/1", "https://a.test/2", "https://a.test/3", "https://a.test/4", "https://a.test/5", "https://a.test/6"])),
        ];
        let feed: [Option<String>; 4] = [
            None,
            Some(rss_items(&[])),
            Some(rss_items(&["https://a.test/1", "https://a.test/1"])),
            Some(rss_items(&["https://b.test/1", "https://b.test/2", "https://b.test/3", "https://b.test/4", "https://b.test/5", "https://b.test/6"])),
        ];
        let hinted: [Option<String>; 4] = [
            None,
            Some(anchors(&[])),
            Some(anchors(&["/url?q=https://c.test/1&sa=U", "/url?q=https://c.test/1&sa=U"])),
            Some(anchors(&["/url?q=https://c.test/1", "/url?q=https://c.test/2", "/url?q=https://c.test/3", "/url?q=https://c.test/4", "/url?q=https://c.test/5", "/url?q=https://c.test/6"])),
        ];

        for p in &primary {
            for sec in &secondary {
                for f in &feed {
                    for h in &hinted {
                        let mut fetcher = MockFetcher::new();
                        for (surface_url, body) in [
                            (url_for(&d.primary, QUERY), p),
                            (url_for(&d.secondary, QUERY), sec),
                            (url_for(&d.feed, QUERY), f),
                            (hint_url.clone(), h),
                        ] {
                            fetcher = match body {
                                Some(body) => fetcher.page(&surface_url, body),
                                None => fetcher.status(&surface_url, 500),
                            };
                        }

                        let discovery = UrlDiscovery::new(&fetcher, &s);
                        let urls = discovery.discover(QUERY, &["The Guardian".to_string()]).await;

                        assert!(urls.len() <= 5, "too many urls: {urls:?}");
                        let unique: HashSet<&String> = urls.iter().collect();
                        assert_eq!(unique.len(), urls.len(), "duplicates in {urls:?}");
                    }
                }
            }
        }
    }
}
