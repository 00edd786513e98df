//! HTTP retrieval shared by discovery, feed refreshes and article scraping.
//!
//! Search surfaces and news sites routinely block obvious bots, so every
//! request goes out with browser-like headers. Article requests also carry a
//! `Referer`. Each request kind has its own timeout. A non-200 response is
//! reported as [`FetchError::Http`] and callers treat it as a soft failure.

use crate::config::TimeoutSettings;
use crate::error::FetchError;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const ARTICLE_REFERER: &str = "https://www.google.com/";

/// What a request is for; selects the timeout and extra headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Search,
    Article,
    Feed,
}

/// Capability to GET a URL and return its body as text.
///
/// Implemented by [`HttpFetcher`] for real traffic and by in-memory fakes in
/// tests.
pub trait Fetch {
    async fn get_text(&self, url: &str, kind: RequestKind) -> Result<String, FetchError>;
}

impl<T: Fetch> Fetch for &T {
    async fn get_text(&self, url: &str, kind: RequestKind) -> Result<String, FetchError> {
        (**self).get_text(url, kind).await
    }
}

/// [`Fetch`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeouts: TimeoutSettings,
}

impl HttpFetcher {
    pub fn new(timeouts: TimeoutSettings) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = ClientBuilder::new()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self { client, timeouts })
    }

    fn timeout_for(&self, kind: RequestKind) -> Duration {
        match kind {
            RequestKind::Search => self.timeouts.search(),
            RequestKind::Article => self.timeouts.article(),
            RequestKind::Feed => self.timeouts.feed(),
        }
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url, ?kind))]
    async fn get_text(&self, url: &str, kind: RequestKind) -> Result<String, FetchError> {
        let parsed = Url::parse(url)?;

        let mut request = self.client.get(parsed).timeout(self.timeout_for(kind));
        if kind == RequestKind::Article {
            request = request.header(REFERER, ARTICLE_REFERER);
        }

        let response = request
            .send()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!(%url, %status, "Non-200 response");
            return Err(FetchError::Http { status });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;
        debug!(%url, bytes = bytes.len(), "Fetched body");

        // Pages with broken or legacy encodings are still worth scraping.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
