//! Bot command parsing and dispatch.
//!
//! Messages whose first word is `news` are commands; anything else is a
//! question for the assistant. Each message produces exactly one text
//! response. Failures are rendered into that response rather than returned.

use crate::config::{DEFAULT_CATEGORY, Settings};
use crate::error::LlmError;
use crate::feeds::FeedCache;
use crate::fetch::Fetch;
use crate::llm::AskAsync;
use crate::outputs::text::{HELP, REFRESHED, format_digest, format_headlines};
use crate::pipeline::DigestPipeline;
use tracing::{info, instrument, warn};

const COMMAND_PREFIX: &str = "news";

/// A parsed `news ...` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List { category: String },
    Refresh,
    Summary { url: String },
    Brief,
    Top,
    Source { site: String },
    Summarize { category: String },
    Compare { topic: String },
    Bias { topic: String },
    Digest { topic: String },
    Help,
    Search { query: String },
}

impl Command {
    /// Parse `message`, or `None` when it is not a news command.
    ///
    /// Keywords are case-insensitive; arguments keep their case. A keyword
    /// missing its argument is treated as a headline search.
    pub fn parse(message: &str, is_category: impl Fn(&str) -> bool) -> Option<Self> {
        let mut words = message.split_whitespace();
        if !words.next()?.eq_ignore_ascii_case(COMMAND_PREFIX) {
            return None;
        }
        let rest: Vec<&str> = words.collect();

        let Some((first, args)) = rest.split_first() else {
            return Some(Self::List {
                category: DEFAULT_CATEGORY.to_string(),
            });
        };
        let keyword = first.to_lowercase();
        let arg = args.join(" ");

        let command = match keyword.as_str() {
            k if args.is_empty() && is_category(k) => Self::List {
                category: k.to_string(),
            },
            "refresh" if args.is_empty() => Self::Refresh,
            "brief" if args.is_empty() => Self::Brief,
            "top" if args.is_empty() => Self::Top,
            "summarize" if args.is_empty() => Self::Summarize {
                category: DEFAULT_CATEGORY.to_string(),
            },
            "summarize" => Self::Summarize {
                category: arg.to_lowercase(),
            },
            "source" if !args.is_empty() => Self::Source {
                site: args[0].to_lowercase(),
            },
            "help" if args.is_empty() => Self::Help,
            "summary" if !args.is_empty() => Self::Summary {
                url: args[0].to_string(),
            },
            "compare" if !args.is_empty() => Self::Compare { topic: arg },
            "bias" if !args.is_empty() => Self::Bias { topic: arg },
            "digest" if !args.is_empty() => Self::Digest { topic: arg },
            _ => Self::Search {
                query: rest.join(" "),
            },
        };
        Some(command)
    }
}

/// Answers chat messages using the feed cache, the digest pipeline and the model.
pub struct NewsAgent<F, L> {
    cache: FeedCache<F>,
    pipeline: DigestPipeline<F, L>,
}

impl<F: Fetch + Clone, L: AskAsync> NewsAgent<F, L> {
    pub fn new(fetcher: F, llm: L, settings: &Settings) -> Self {
        Self {
            cache: FeedCache::new(fetcher.clone(), settings),
            pipeline: DigestPipeline::new(fetcher, llm, settings),
        }
    }

    pub fn with_source_hints(mut self, enabled: bool) -> Self {
        self.pipeline = self.pipeline.with_source_hints(enabled);
        self
    }

    /// Respond to one chat message.
    #[instrument(level = "info", skip(self))]
    pub async fn handle(&self, message: &str) -> String {
        match Command::parse(message, |name| self.cache.categories().any(|c| c == name)) {
            Some(command) => {
                info!(?command, "Dispatching news command");
                self.execute(command).await
            }
            None => {
                let answer = self.pipeline.summarizer().answer(message.trim()).await;
                render_llm("answer", answer)
            }
        }
    }

    async fn execute(&self, command: Command) -> String {
        let summarizer = self.pipeline.summarizer();
        match command {
            Command::List { category } => {
                let items = self.cache.get(&category, false).await;
                format_headlines(&items, &category)
            }
            Command::Refresh => {
                let total = self.cache.refresh_all().await;
                info!(total, "Feeds refreshed on request");
                REFRESHED.to_string()
            }
            Command::Summary { url } => self.pipeline.summarize_url(&url).await,
            Command::Brief => {
                let items = self.cache.get(DEFAULT_CATEGORY, false).await;
                render_llm("brief", summarizer.brief(&items).await)
            }
            Command::Top => {
                let items = self.cache.get(DEFAULT_CATEGORY, false).await;
                render_llm("top", summarizer.top(&items).await)
            }
            Command::Source { site } => {
                let items = self.cache.site_headlines(&site).await;
                if items.is_empty() {
                    return format_headlines(&items, &site);
                }
                render_llm("source", summarizer.site_headlines(&site, &items).await)
            }
            Command::Summarize { category } => {
                let items = self.cache.get(&category, false).await;
                if items.is_empty() {
                    return format_headlines(&items, &category);
                }
                render_llm("summarize", summarizer.summarize_category(&category, &items).await)
            }
            Command::Compare { topic } => {
                let items = self.cache.get(&topic.to_lowercase(), false).await;
                render_llm("compare", summarizer.compare(&topic, &items).await)
            }
            Command::Bias { topic } => {
                let items = self.cache.get(&topic.to_lowercase(), false).await;
                render_llm("bias", summarizer.bias(&topic, &items).await)
            }
            Command::Digest { topic } => match self.pipeline.run(&topic).await {
                Ok(report) => format_digest(&report),
                Err(e) => {
                    warn!(%topic, error = %e, "Digest failed");
                    e.user_message().to_string()
                }
            },
            Command::Help => HELP.to_string(),
            Command::Search { query } => {
                let items = self.cache.get(DEFAULT_CATEGORY, false).await;
                render_llm("search", summarizer.search_headlines(&items, &query).await)
            }
        }
    }
}

fn render_llm(stage: &str, result: Result<String, LlmError>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => {
            warn!(stage, error = %e, "Model request failed");
            "Sorry, the news assistant is unavailable right now. Please try again later.".to_string()
        }
    }
}
