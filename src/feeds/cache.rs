//! Time-bounded, in-memory cache of category headlines.
//!
//! Each category maps to one [`CacheEntry`] that is replaced wholesale on
//! refresh. Entries stay fresh for the configured TTL (one hour by default).
//! The map sits behind a single mutex that is never held across network I/O,
//! so concurrent readers see either the old entry or the new one.

use crate::config::{DEFAULT_CATEGORY, SearchSurface, Settings};
use crate::feeds::rss::{FeedEntry, parse_feed};
use crate::fetch::{Fetch, RequestKind};
use crate::models::ArticleRef;
use crate::utils::{domain_of, truncate_chars};
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

const SUMMARY_MAX_CHARS: usize = 500;

/// Headlines cached for one category.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub items: Vec<ArticleRef>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

/// Category → headline cache backed by the feed registry.
pub struct FeedCache<F> {
    fetcher: F,
    registry: BTreeMap<String, Vec<String>>,
    default_feeds: Vec<String>,
    site_search: SearchSurface,
    ttl: Duration,
    entries_per_feed: usize,
    max_concurrent: usize,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl<F: Fetch> FeedCache<F> {
    /// Create an empty cache over the registry in `settings`.
    pub fn new(fetcher: F, settings: &Settings) -> Self {
        Self {
            fetcher,
            registry: settings.feeds.clone(),
            default_feeds: settings.feeds_for(DEFAULT_CATEGORY).to_vec(),
            site_search: settings.discovery.feed.clone(),
            ttl: settings.cache_ttl(),
            entries_per_feed: settings.entries_per_feed,
            max_concurrent: settings.max_concurrent_fetches.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Categories with registered feeds, in name order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str)
    }

    /// Return the headlines for `category`.
    ///
    /// A fresh entry is returned as-is without any I/O unless `force_refresh`
    /// is set. Otherwise every feed registered for the category (or the
    /// default list for unknown categories) is fetched, capped to the top
    /// entries of each, and the concatenation replaces the cached entry.
    pub async fn get(&self, category: &str, force_refresh: bool) -> Vec<ArticleRef> {
        self.get_at(category, force_refresh, Utc::now()).await
    }

    /// Force-refresh every registered category. Returns the headline count.
    #[instrument(level = "info", skip(self))]
    pub async fn refresh_all(&self) -> usize {
        let categories: Vec<String> = self.registry.keys().cloned().collect();
        let mut total = 0;
        for category in categories {
            total += self.get(&category, true).await.len();
        }
        info!(total, "Refreshed all categories");
        total
    }

    /// Latest headlines from a single publisher, found with a `site:` query on
    /// the feed search surface. These are not cached.
    #[instrument(level = "info", skip(self))]
    pub async fn site_headlines(&self, site: &str) -> Vec<ArticleRef> {
        let url = self.site_search.search_url(&format!("site:{site}"));
        let items = self.fetch_feed(&url).await;
        info!(count = items.len(), "Fetched site headlines");
        items
    }

    #[instrument(level = "info", skip(self, now))]
    async fn get_at(
        &self,
        category: &str,
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> Vec<ArticleRef> {
        let category = self.cache_key(category);
        if !force_refresh && let Some(items) = self.fresh_items(category, now) {
            debug!(count = items.len(), "Cache hit");
            return items;
        }

        let items = self.fetch_category(category).await;
        info!(count = items.len(), "Fetched category feeds");

        let entry = CacheEntry {
            items: items.clone(),
            fetched_at: now,
        };
        self.lock_entries().insert(category.to_string(), entry);
        items
    }

    /// Unregistered categories share the default category's entry.
    fn cache_key<'a>(&self, category: &'a str) -> &'a str {
        if self.registry.contains_key(category) {
            category
        } else {
            DEFAULT_CATEGORY
        }
    }

    fn fresh_items(&self, category: &str, now: DateTime<Utc>) -> Option<Vec<ArticleRef>> {
        self.lock_entries()
            .get(category)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.items.clone())
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn fetch_category(&self, category: &str) -> Vec<ArticleRef> {
        let feeds = self
            .registry
            .get(category)
            .unwrap_or(&self.default_feeds)
            .clone();

        // `buffered` keeps registration order even though fetches overlap.
        let per_feed: Vec<Vec<ArticleRef>> = stream::iter(feeds)
            .map(|url| async move { self.fetch_feed(&url).await })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        per_feed.into_iter().flatten().collect()
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch_feed(&self, url: &str) -> Vec<ArticleRef> {
        let body = match self.fetcher.get_text(url, RequestKind::Feed).await {
            Ok(body) => body,
            Err(e) => {
                warn!(%url, stage = "feed_fetch", error = %e, "Feed fetch failed");
                return Vec::new();
            }
        };

        let feed = match parse_feed(&body) {
            Ok(feed) => feed,
            Err(e) => {
                warn!(%url, stage = "feed_parse", error = %e, "Feed parse failed");
                return Vec::new();
            }
        };

        let source = feed.title.clone().unwrap_or_else(|| domain_of(url));
        feed.entries
            .into_iter()
            .take(self.entries_per_feed)
            .map(|entry| to_article_ref(entry, &source))
            .collect()
    }
}

fn to_article_ref(entry: FeedEntry, source: &str) -> ArticleRef {
    ArticleRef {
        title: if entry.title.is_empty() {
            "Untitled".to_string()
        } else {
            entry.title
        },
        link: entry.link,
        published: entry.published.unwrap_or_else(|| "Unknown date".to_string()),
        source: source.to_string(),
        summary: entry
            .summary
            .map(|s| truncate_chars(&s, SUMMARY_MAX_CHARS))
            .unwrap_or_else(|| "No summary available".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockFetcher;

    fn rss(title: &str, links: &[&str]) -> String {
        let items: String = links
            .iter()
            .map(|l| format!("<item><title>Story {l}</title><link>{l}</link></item>"))
            .collect();
        format!("<rss><channel><title>{title}</title>{items}</channel></rss>")
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.feeds = [
            ("general", vec!["https://gen.test/feed"]),
            ("technology", vec!["https://tech1.test/feed", "https://tech2.test/feed"]),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.into_iter().map(str::to_string).collect()))
        .collect();
        settings
    }

    #[tokio::test]
    async fn test_unknown_category_uses_general_sources() {
        let fetcher = MockFetcher::new().page("https://gen.test/feed", &rss("General", &["https://gen.test/1"]));
        let cache = FeedCache::new(&fetcher, &settings());

        let items = cache.get("astrology", false).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, "General");
        assert_eq!(fetcher.calls(), vec!["https://gen.test/feed".to_string()]);
    }

    #[tokio::test]
    async fn test_free_text_topics_share_the_default_entry() {
        let fetcher = MockFetcher::new().page("https://gen.test/feed", &rss("General", &["https://gen.test/1"]));
        let cache = FeedCache::new(&fetcher, &settings());

        let climate = cache.get("climate talks", false).await;
        let elections = cache.get("elections", false).await;
        let general = cache.get("general", false).await;

        assert_eq!(climate, elections);
        assert_eq!(elections, general);
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(cache.lock_entries().len(), 1);
        assert!(cache.lock_entries().contains_key("general"));
    }

    #[tokio::test]
    async fn test_fresh_entry_is_served_without_fetching() {
        let fetcher = MockFetcher::new().page("https://gen.test/feed", &rss("General", &["https://gen.test/1"]));
        let cache = FeedCache::new(&fetcher, &settings());

        let first = cache.get("general", false).await;
        let second = cache.get("general", false).await;
        let third = cache.get("general", false).await;

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched() {
        let fetcher = MockFetcher::new().page("https://gen.test/feed", &rss("General", &["https://gen.test/1"]));
        let cache = FeedCache::new(&fetcher, &settings());
        let start = Utc::now();

        cache.get_at("general", false, start).await;
        cache.get_at("general", false, start + Duration::minutes(59)).await;
        assert_eq!(fetcher.call_count(), 1);

        cache.get_at("general", false, start + Duration::minutes(61)).await;
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_fresh_entry() {
        let fetcher = MockFetcher::new().page("https://gen.test/feed", &rss("General", &["https://gen.test/1"]));
        let cache = FeedCache::new(&fetcher, &settings());

        cache.get("general", false).await;
        cache.get("general", true).await;
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_sources_capped_and_concatenated_in_order() {
        let many: Vec<String> = (1..=8).map(|i| format!("https://tech1.test/{i}")).collect();
        let many_refs: Vec<&str> = many.iter().map(String::as_str).collect();
        let fetcher = MockFetcher::new()
            .page("https://tech1.test/feed", &rss("One", &many_refs))
            .page("https://tech2.test/feed", &rss("Two", &["https://tech2.test/1"]));
        let cache = FeedCache::new(&fetcher, &settings());

        let items = cache.get("technology", false).await;
        assert_eq!(items.len(), 6);
        assert!(items[..5].iter().all(|i| i.source == "One"));
        assert_eq!(items[4].link, "https://tech1.test/5");
        assert_eq!(items[5].source, "Two");
        assert_eq!(items[5].published, "Unknown date");
        assert_eq!(items[5].summary, "No summary available");
    }

    #[tokio::test]
    async fn test_failing_source_contributes_nothing() {
        let fetcher = MockFetcher::new()
            .status("https://tech1.test/feed", 500)
            .page("https://tech2.test/feed", &rss("Two", &["https://tech2.test/1"]));
        let cache = FeedCache::new(&fetcher, &settings());

        let items = cache.get("technology", false).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://tech2.test/1");
    }

    #[tokio::test]
    async fn test_unparseable_feed_contributes_nothing() {
        let fetcher = MockFetcher::new()
            .page("https://tech1.test/feed", "<html>blocked</html>")
            .page("https://tech2.test/feed", &rss("", &["https://tech2.test/1"]));
        let cache = FeedCache::new(&fetcher, &settings());

        let items = cache.get("technology", false).await;
        assert_eq!(items.len(), 1);
        // untitled feed falls back to its host
        assert_eq!(items[0].source, "tech2.test");
    }

    #[tokio::test]
    async fn test_site_headlines_query_the_feed_surface() {
        let settings = settings();
        let search = settings.discovery.feed.search_url("site:cnn.com");
        let fetcher = MockFetcher::new().page(&search, &rss("CNN", &["https://cnn.com/1", "https://cnn.com/2"]));
        let cache = FeedCache::new(&fetcher, &settings);

        let items = cache.site_headlines("cnn.com").await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].link, "https://cnn.com/1");
        assert!(search.contains("site%3Acnn.com"));

        cache.site_headlines("cnn.com").await;
        assert_eq!(fetcher.call_count(), 2);
        assert!(cache.lock_entries().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_all_touches_every_category() {
        let fetcher = MockFetcher::new().page("https://gen.test/feed", &rss("General", &["https://gen.test/1"]));
        let cache = FeedCache::new(&fetcher, &settings());

        cache.refresh_all().await;
        assert_eq!(fetcher.call_count(), 3);
    }
}
