//! Typed failures for each stage of the pipeline.
//!
//! Network, feed and LLM failures are recoverable: callers log them with the
//! offending URL and stage, then degrade to an empty contribution. Only
//! [`PipelineError`] ends a request, and it is rendered to the user as a plain
//! "try a different topic" message.

use thiserror::Error;

/// Failure while retrieving a page over HTTP.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request timed out")]
    Timeout,

    #[error("http status {status}")]
    Http { status: reqwest::StatusCode },

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed reading body: {0}")]
    Body(String),
}

impl FetchError {
    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Http { status }
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Failure while parsing an RSS/Atom document.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("malformed feed: {0}")]
    Parse(String),
}

impl From<quick_xml::Error> for FeedError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Failure reported by the language model collaborator.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Request(String),

    #[error("llm returned an empty response")]
    EmptyResponse,
}

/// Terminal failures of a digest run.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PipelineError {
    #[error("no article urls were discovered")]
    NoUrls,

    #[error("no article content could be retrieved")]
    NoContent,
}

impl PipelineError {
    /// Message shown to the end user in place of a result.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoUrls => {
                "Couldn't retrieve any news URLs. Try a different topic or check your internet connection."
            }
            Self::NoContent => "Couldn't retrieve any article content. Try a different topic.",
        }
    }
}
