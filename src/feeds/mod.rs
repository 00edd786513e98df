//! Category feeds and their time-bounded cache.
//!
//! - [`rss`]: RSS/Atom document reader
//! - [`cache`]: [`FeedCache`], category → headline list with a one hour TTL

pub mod cache;
pub mod rss;

pub use cache::FeedCache;
