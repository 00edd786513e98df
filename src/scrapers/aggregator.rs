//! Fetch and extract a batch of candidate URLs into an [`ArticleBatch`].
//!
//! Pages are fetched with bounded concurrency and reassembled in input order.
//! A page that cannot be fetched becomes an empty extraction for its URL and
//! the batch carries on.

use crate::config::Settings;
use crate::error::PipelineError;
use crate::fetch::{Fetch, RequestKind};
use crate::models::{ArticleBatch, ExtractedArticle};
use crate::scrapers::extractor::ArticleExtractor;
use crate::utils::truncate_for_log;
use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

pub struct ContentAggregator<F> {
    fetcher: F,
    extractor: ArticleExtractor,
    min_valid_chars: usize,
    max_concurrent: usize,
}

impl<F: Fetch> ContentAggregator<F> {
    pub fn new(fetcher: F, settings: &Settings) -> Self {
        Self {
            fetcher,
            extractor: ArticleExtractor::new(settings.extraction.clone()),
            min_valid_chars: settings.extraction.min_valid_article_chars,
            max_concurrent: settings.max_concurrent_fetches.max(1),
        }
    }

    /// Fetch, extract and validate every URL in `urls`.
    ///
    /// Articles longer than the validity threshold are kept. When none are,
    /// every article with real extracted text is kept instead. Placeholders
    /// never count as content.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NoUrls`] for an empty input (nothing is fetched) and
    /// [`PipelineError::NoContent`] when every page was unreachable or came
    /// back as a placeholder.
    #[instrument(level = "info", skip_all, fields(urls = urls.len()))]
    pub async fn aggregate(&self, urls: &[String]) -> Result<ArticleBatch, PipelineError> {
        if urls.is_empty() {
            warn!("No URLs to aggregate");
            return Err(PipelineError::NoUrls);
        }

        let extracted: Vec<ExtractedArticle> = stream::iter(urls)
            .map(|url| self.fetch_one(url))
            .buffered(self.max_concurrent)
            .collect()
            .await;

        for (i, article) in extracted.iter().enumerate() {
            info!(
                index = i + 1,
                url = %article.url,
                length = article.length,
                preview = %truncate_for_log(&article.text, 100),
                "Extracted article"
            );
        }

        let usable: Vec<ExtractedArticle> = extracted
            .into_iter()
            .filter(|a| !a.is_empty() && !a.is_placeholder())
            .collect();

        let valid: Vec<ExtractedArticle> = usable
            .iter()
            .filter(|a| a.length > self.min_valid_chars)
            .cloned()
            .collect();

        let batch = if valid.is_empty() {
            if !usable.is_empty() {
                warn!(count = usable.len(), "No article passed validation; using short extractions");
            }
            ArticleBatch::new(usable)
        } else {
            ArticleBatch::new(valid)
        };

        match batch {
            Some(batch) => {
                info!(articles = batch.len(), "Aggregated articles");
                Ok(batch)
            }
            None => {
                warn!("No article content could be retrieved");
                Err(PipelineError::NoContent)
            }
        }
    }

    /// Fetch and extract a single page. Never fails.
    pub async fn fetch_one(&self, url: &str) -> ExtractedArticle {
        match self.fetcher.get_text(url, RequestKind::Article).await {
            Ok(html) => self.extractor.extract(&html, url),
            Err(e) => {
                warn!(%url, stage = "article_fetch", error = %e, "Article fetch failed");
                ExtractedArticle::unfetched(url)
            }
        }
    }
}
