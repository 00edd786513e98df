//! Pipeline settings.
//!
//! Everything that decides *where* content comes from lives here rather than in
//! code: the category feed registry, the ordered discovery surfaces, caps,
//! thresholds and request timeouts. Settings can be loaded from a YAML file;
//! any field left out of the file keeps its built-in default.
//!
//! ```yaml
//! max_candidate_urls: 5
//! feeds:
//!   general:
//!     - https://rss.nytimes.com/services/xml/rss/nyt/HomePage.xml
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Category used whenever a requested category has no registered feeds.
pub const DEFAULT_CATEGORY: &str = "general";

const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;

/// How links are recognised on a discovery surface's result page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkRule {
    /// Relative hrefs starting with `prefix` (e.g. `./articles`), resolved against `base`.
    RelativePrefix { prefix: String, base: String },
    /// Absolute http(s) hrefs that contain none of the `exclude` markers.
    External { exclude: Vec<String> },
    /// Redirect hrefs of the form `/url?q=<target>&...`; targets containing an
    /// `exclude` marker are dropped.
    Redirect { exclude: Vec<String> },
    /// `<item><link>` values of an RSS document.
    RssItems,
}

/// One search endpoint used during URL discovery.
///
/// `url` must contain a `{query}` placeholder which is replaced by the
/// percent-encoded query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchSurface {
    pub name: String,
    pub url: String,
    pub links: LinkRule,
}

impl SearchSurface {
    pub fn search_url(&self, query: &str) -> String {
        self.url.replace("{query}", &urlencoding::encode(query))
    }
}

/// The discovery fallback chain, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Strategy 1: primary news search page.
    pub primary: SearchSurface,
    /// Strategy 2: consulted when the primary yields fewer than `min_primary_links`.
    pub secondary: SearchSurface,
    /// Strategy 3: structured feed search used when both HTML strategies come up empty.
    pub feed: SearchSurface,
    /// Strategy 4: web search used with source-name hints.
    pub hint_search: SearchSurface,
    pub min_primary_links: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            primary: SearchSurface {
                name: "google-news".to_string(),
                url: "https://news.google.com/search?q={query}&hl=en-US".to_string(),
                links: LinkRule::RelativePrefix {
                    prefix: "./articles".to_string(),
                    base: "https://news.google.com".to_string(),
                },
            },
            secondary: SearchSurface {
                name: "bing-news".to_string(),
                url: "https://www.bing.com/news/search?q={query}".to_string(),
                links: LinkRule::External {
                    exclude: vec!["bing".to_string(), "microsoft".to_string()],
                },
            },
            feed: SearchSurface {
                name: "google-news-rss".to_string(),
                url: "https://news.google.com/rss/search?q={query}&hl=en-US&gl=US&ceid=US:en"
                    .to_string(),
                links: LinkRule::RssItems,
            },
            hint_search: SearchSurface {
                name: "google-web".to_string(),
                url: "https://www.google.com/search?q={query}".to_string(),
                links: LinkRule::Redirect {
                    exclude: vec!["google".to_string()],
                },
            },
            min_primary_links: 3,
        }
    }
}

/// Minimum and maximum sizes used by the extractor and aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub max_text_chars: usize,
    pub min_paragraph_chars: usize,
    pub min_page_paragraph_chars: usize,
    pub min_content_chars: usize,
    pub min_container_paragraphs: usize,
    pub min_valid_article_chars: usize,
    /// Domains whose pages are tried through embedded JSON-LD first.
    pub structured_data_domains: Vec<String>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            max_text_chars: 5000,
            min_paragraph_chars: 20,
            min_page_paragraph_chars: 30,
            min_content_chars: 100,
            min_container_paragraphs: 3,
            min_valid_article_chars: 50,
            structured_data_domains: vec!["msn.com".to_string()],
        }
    }
}

/// Request timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub search_secs: u64,
    pub article_secs: u64,
    pub feed_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            search_secs: 15,
            article_secs: 20,
            feed_secs: 10,
        }
    }
}

impl TimeoutSettings {
    pub fn search(&self) -> Duration {
        Duration::from_secs(self.search_secs)
    }

    pub fn article(&self) -> Duration {
        Duration::from_secs(self.article_secs)
    }

    pub fn feed(&self) -> Duration {
        Duration::from_secs(self.feed_secs)
    }
}

/// Top-level settings for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Category name to ordered feed URLs.
    pub feeds: BTreeMap<String, Vec<String>>,
    pub entries_per_feed: usize,
    pub cache_ttl_secs: u64,
    pub max_candidate_urls: usize,
    pub max_concurrent_fetches: usize,
    pub discovery: DiscoverySettings,
    pub extraction: ExtractionSettings,
    pub timeouts: TimeoutSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let feeds = [
            (
                "technology",
                vec!["https://techcrunch.com/feed/", "https://www.wired.com/feed/rss"],
            ),
            (
                "business",
                vec!["https://www.cnbc.com/id/10001147/device/rss/rss.html"],
            ),
            (
                "politics",
                vec!["https://rss.nytimes.com/services/xml/rss/nyt/Politics.xml"],
            ),
            (
                "science",
                vec!["https://www.science.org/rss/news_feeds/toc_science.xml"],
            ),
            (
                DEFAULT_CATEGORY,
                vec!["https://rss.nytimes.com/services/xml/rss/nyt/HomePage.xml"],
            ),
        ]
        .into_iter()
        .map(|(category, urls)| {
            (
                category.to_string(),
                urls.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

        Self {
            feeds,
            entries_per_feed: 5,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            max_candidate_urls: 5,
            max_concurrent_fetches: 5,
            discovery: DiscoverySettings::default(),
            extraction: ExtractionSettings::default(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Load settings from `path`, or return the defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            info!("No settings file given; using built-in defaults");
            return Ok(Self::default());
        };

        let yaml = tokio::fs::read_to_string(path).await?;
        let settings = Self::from_yaml(&yaml)?;
        info!(
            categories = settings.feeds.len(),
            max_candidate_urls = settings.max_candidate_urls,
            "Loaded settings"
        );
        Ok(settings)
    }

    /// Feed URLs registered for `category`, falling back to the default list.
    pub fn feeds_for(&self, category: &str) -> &[String] {
        self.feeds
            .get(category)
            .or_else(|| self.feeds.get(DEFAULT_CATEGORY))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_category(&self, name: &str) -> bool {
        self.feeds.contains_key(name)
    }

    /// Feed cache lifetime. Values chrono cannot represent fall back to one hour.
    pub fn cache_ttl(&self) -> chrono::Duration {
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or_else(|| {
                warn!(secs = self.cache_ttl_secs, "cache_ttl_secs out of range; using default");
                chrono::Duration::hours(1)
            })
    }
}
