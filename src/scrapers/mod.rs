//! Finding article URLs and turning their pages into clean text.
//!
//! A digest run moves through these modules in two phases:
//!
//! 1. **Discovery**: a topic is turned into a short list of candidate article
//!    URLs by walking an ordered chain of search surfaces
//! 2. **Aggregation**: each URL is fetched and its main text extracted, then
//!    the results are validated into an [`ArticleBatch`](crate::models::ArticleBatch)
//!
//! # Submodules
//!
//! | Module | Role |
//! |--------|------|
//! | [`discovery`] | [`UrlDiscovery`]: topic → unique, capped candidate URLs |
//! | [`extractor`] | [`ArticleExtractor`]: raw HTML → main body text |
//! | [`aggregator`] | [`ContentAggregator`]: URLs → validated article batch |
//!
//! # Common Patterns
//!
//! - Concurrent fetching with `futures::stream`, reassembled in input order
//! - Graceful error handling (failed fetches are logged and skipped)
//! - Static `scraper` selectors behind `once_cell::sync::Lazy`

pub mod aggregator;
pub mod discovery;
pub mod extractor;

pub use aggregator::ContentAggregator;
pub use discovery::UrlDiscovery;
pub use extractor::ArticleExtractor;
