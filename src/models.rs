//! Data models passed between pipeline stages.
//!
//! - [`ArticleRef`]: one headline from a category feed, held by the feed cache
//! - [`ExtractedArticle`]: the cleaned body text scraped from one URL
//! - [`ArticleBatch`]: the validated texts handed to the summarizer
//! - [`ChatMessage`]: one turn of a conversation with the language model
//! - [`DigestReport`]: the record of a finished digest run, written as JSON

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A headline taken from a category feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub title: String,
    pub link: String,
    /// Publication date as written by the feed, or `"Unknown date"`.
    pub published: String,
    /// Feed title, or the feed's host when the feed has no title.
    pub source: String,
    pub summary: String,
}

/// Text extracted from a single article page.
///
/// `text` is plain, whitespace-normalized and bounded by the configured
/// maximum. It is empty only when the page could not be fetched at all. A page
/// that was fetched but yielded nothing carries a placeholder instead (see
/// [`ExtractedArticle::is_placeholder`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedArticle {
    pub url: String,
    pub text: String,
    pub length: usize,
    /// Paywall keywords were present in the raw page. Informational only.
    pub paywall_suspected: bool,
    placeholder: bool,
}

impl ExtractedArticle {
    pub fn new(url: &str, text: String, paywall_suspected: bool) -> Self {
        Self {
            url: url.to_string(),
            length: text.chars().count(),
            text,
            paywall_suspected,
            placeholder: false,
        }
    }

    /// The page was never retrieved.
    pub fn unfetched(url: &str) -> Self {
        Self::new(url, String::new(), false)
    }

    /// The page was retrieved but nothing could be extracted from it.
    pub fn placeholder(url: &str, domain: &str) -> Self {
        let mut article = Self::new(
            url,
            format!(
                "Article from {domain}. Unable to extract full content due to possible paywall or site restrictions."
            ),
            false,
        );
        article.placeholder = true;
        article
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

/// Validated article texts, in discovery order, ready for summarization.
///
/// Never empty: the aggregator reports a failure instead of building an empty
/// batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleBatch {
    articles: Vec<ExtractedArticle>,
}

impl ArticleBatch {
    pub(crate) fn new(articles: Vec<ExtractedArticle>) -> Option<Self> {
        if articles.is_empty() {
            None
        } else {
            Some(Self { articles })
        }
    }

    pub fn articles(&self) -> &[ExtractedArticle] {
        &self.articles
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.articles.iter().map(|a| a.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message sent to the language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Per-article line of a [`DigestReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedArticle {
    pub url: String,
    pub length: usize,
    pub paywall_suspected: bool,
}

/// Outcome of one digest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestReport {
    pub topic: String,
    pub generated_at: DateTime<Utc>,
    pub urls: Vec<String>,
    pub articles: Vec<ReportedArticle>,
    pub summary: String,
}
