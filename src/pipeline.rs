//! The topic digest: discover → fetch and extract → summarize.

use crate::config::Settings;
use crate::error::PipelineError;
use crate::fetch::Fetch;
use crate::llm::AskAsync;
use crate::models::{DigestReport, ReportedArticle};
use crate::scrapers::{ContentAggregator, UrlDiscovery};
use crate::summarizer::Summarizer;
use chrono::Utc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Wires discovery, aggregation and summarization over shared collaborators.
pub struct DigestPipeline<F, L> {
    discovery: UrlDiscovery<F>,
    aggregator: ContentAggregator<F>,
    summarizer: Summarizer<L>,
    source_hints: bool,
}

impl<F: Fetch + Clone, L: AskAsync> DigestPipeline<F, L> {
    pub fn new(fetcher: F, llm: L, settings: &Settings) -> Self {
        Self {
            discovery: UrlDiscovery::new(fetcher.clone(), settings),
            aggregator: ContentAggregator::new(fetcher, settings),
            summarizer: Summarizer::new(llm),
            source_hints: false,
        }
    }

    /// Ask the model for publisher names to search with when discovery finds
    /// nothing else.
    pub fn with_source_hints(mut self, enabled: bool) -> Self {
        self.source_hints = enabled;
        self
    }

    pub fn summarizer(&self) -> &Summarizer<L> {
        &self.summarizer
    }

    /// Run a full digest for `topic`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NoUrls`] when discovery finds nothing and
    /// [`PipelineError::NoContent`] when no page yields any text.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self, topic: &str) -> Result<DigestReport, PipelineError> {
        let t0 = Instant::now();
        info!("Starting news summary process");

        let hints = if self.source_hints {
            self.summarizer.suggest_sources(topic).await
        } else {
            Vec::new()
        };

        let urls = self.discovery.discover(topic, &hints).await;
        if urls.is_empty() {
            warn!("Discovery returned no URLs");
            return Err(PipelineError::NoUrls);
        }

        let batch = self.aggregator.aggregate(&urls).await?;
        let summary = self.summarizer.summarize_news(&batch).await;

        let articles = batch
            .articles()
            .iter()
            .map(|a| ReportedArticle {
                url: a.url.clone(),
                length: a.length,
                paywall_suspected: a.paywall_suspected,
            })
            .collect();

        info!(
            urls = urls.len(),
            articles = batch.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Digest complete"
        );

        Ok(DigestReport {
            topic: topic.to_string(),
            generated_at: Utc::now(),
            urls,
            articles,
            summary,
        })
    }

    /// Bullet-point summary of a single article URL, as user-facing text.
    #[instrument(level = "info", skip(self))]
    pub async fn summarize_url(&self, url: &str) -> String {
        let article = self.aggregator.fetch_one(url).await;
        if article.is_empty() {
            return format!("Error summarizing article: could not retrieve {url}");
        }
        match self.summarizer.summarize_article(&article).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(%url, error = %e, "Article summary failed");
                format!("Error summarizing article: {e}")
            }
        }
    }
}
