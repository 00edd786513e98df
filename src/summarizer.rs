//! LLM-backed summaries, briefs and headline analysis.
//!
//! [`Summarizer::summarize_news`] is the end of a digest run and never fails:
//! a model answer that claims the articles are missing gets one retry with a
//! prompt written for fragments, an answer without paragraph breaks is
//! regrouped into three paragraphs, and a failed model call falls back to an
//! extractive summary built from the article text itself.
//!
//! The remaining operations back the bot commands and report model failures
//! to the caller.

use crate::error::LlmError;
use crate::llm::AskAsync;
use crate::models::{ArticleBatch, ArticleRef, ChatMessage, ExtractedArticle};
use crate::utils::{truncate_chars, truncate_for_log};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument, warn};

/// Placed between articles when they are combined into one prompt.
pub const ARTICLE_SEPARATOR: &str = "\n\n---ARTICLE---\n\n";

/// Persona used for conversational requests.
pub const SYSTEM_PROMPT: &str = "You are a helpful news assistant. Your role is to:
1. Help users find the latest news on various topics
2. Summarize news articles
3. Provide trend analysis across news sources
4. Answer questions about current events
5. Organize news by category
Be concise and informative in your responses.";

pub const INSUFFICIENT_CONTENT: &str = "Insufficient content available to generate a summary.";

/// Phrases a model uses when it believes it was given nothing to summarize.
const MISSING_CONTENT_INDICATORS: [&str; 5] = [
    "missing",
    "no article",
    "couldn't find",
    "no content",
    "please provide",
];

const EXTRACTIVE_SENTENCES_PER_ARTICLE: usize = 5;
const ARTICLE_PROMPT_CHARS: usize = 4000;
const HEADLINE_SUMMARY_CHARS: usize = 100;

static LIST_MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s*").unwrap());

fn news_prompt(combined: &str) -> String {
    format!(
        "You are a professional news analyst. The following are excerpts from news articles about the same topic.
Please create a comprehensive summary that captures all key information from these articles.

Requirements for the summary:
1. Length: Between 250-500 words total
2. Structure: Divide the summary into exactly 3 paragraphs
   - First paragraph: Introduce the main news event and key facts
   - Second paragraph: Provide context, background details, and supporting information
   - Third paragraph: Include reactions, implications, or future perspectives
3. Style: Factual, objective, and journalistic
4. Content: Integrate all important details from the articles without redundancy

Articles:
{combined}

Begin your summary now:"
    )
}

fn fragments_prompt(combined: &str) -> String {
    format!(
        "You are a news writer tasked with creating a comprehensive summary based on limited information.
Using only the facts available in these partial article fragments, write a detailed news summary.

Requirements:
1. Length: Between 250-500 words total
2. Structure: Exactly 3 paragraphs with clear breaks between them
3. Style: Factual and journalistic
4. Content: Focus only on the information that is definitely available in the fragments

Article fragments:
{combined}

Write your 3-paragraph summary:"
    )
}

fn mentions_missing_content(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    MISSING_CONTENT_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

/// Make sure `summary` reads as three paragraphs.
///
/// Text with fewer than two blank-line breaks is split on `". "` and, when it
/// has at least three sentences, regrouped into three roughly equal
/// paragraphs. Shorter text is returned trimmed but otherwise unchanged.
pub fn ensure_paragraphs(summary: &str) -> String {
    let summary = summary.trim();
    if summary.matches("\n\n").count() >= 2 {
        return summary.to_string();
    }

    let sentences: Vec<&str> = summary
        .split(". ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.len() < 3 {
        return summary.to_string();
    }

    let third = sentences.len() / 3;
    let first = format!("{}.", sentences[..third].join(". "));
    let second = format!("{}.", sentences[third..2 * third].join(". "));
    let mut last = sentences[2 * third..].join(". ");
    if !last.ends_with('.') {
        last.push('.');
    }

    info!(sentences = sentences.len(), "Reformatted summary into 3 paragraphs");
    format!("{first}\n\n{second}\n\n{last}")
}

/// Summary assembled from the leading sentences of each article.
///
/// Used when the model cannot be reached. Takes up to five sentences per
/// article and lays them out as up to three paragraphs.
pub fn extractive_summary<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    let sentences: Vec<String> = texts
        .into_iter()
        .flat_map(|text| {
            text.split('.')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .take(EXTRACTIVE_SENTENCES_PER_ARTICLE)
                .map(|s| format!("{s}."))
        })
        .collect();

    if sentences.is_empty() {
        return INSUFFICIENT_CONTENT.to_string();
    }

    let n = sentences.len();
    let third = (n / 3).max(1);
    let (a, b) = (third.min(n), (2 * third).min(n));

    [&sentences[..a], &sentences[a..b], &sentences[b..]]
        .iter()
        .filter(|group| !group.is_empty())
        .map(|group| group.join(" "))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Numbered headline list used as prompt context.
fn headline_context(items: &[ArticleRef]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "{}. Title: {}\n   Source: {}\n   Summary: {}...\n   Link: {}\n",
                i + 1,
                item.title,
                item.source,
                truncate_chars(&item.summary, HEADLINE_SUMMARY_CHARS),
                item.link
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turns article text and cached headlines into prose through an [`AskAsync`] model.
pub struct Summarizer<L> {
    llm: L,
}

impl<L: AskAsync> Summarizer<L> {
    pub fn new(llm: L) -> Self {
        Self { llm }
    }

    /// Three-paragraph digest of every article in `batch`.
    #[instrument(level = "info", skip_all, fields(articles = batch.len()))]
    pub async fn summarize_news(&self, batch: &ArticleBatch) -> String {
        let combined = batch.texts().collect::<Vec<_>>().join(ARTICLE_SEPARATOR);

        let summary = match self.llm.ask(&[ChatMessage::user(news_prompt(&combined))]).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, stage = "summarize", "Summarization failed; using extractive summary");
                return extractive_summary(batch.texts());
            }
        };
        info!(words = summary.split_whitespace().count(), "Generated summary");

        let summary = if mentions_missing_content(&summary) {
            warn!(
                preview = %truncate_for_log(&summary, 200),
                "Summary indicates missing content, generating alternate summary"
            );
            match self
                .llm
                .ask(&[ChatMessage::user(fragments_prompt(&combined))])
                .await
            {
                Ok(alternate) => {
                    info!(words = alternate.split_whitespace().count(), "Generated alternate summary");
                    alternate
                }
                Err(e) => {
                    warn!(error = %e, stage = "summarize_retry", "Alternate summary failed; using extractive summary");
                    return extractive_summary(batch.texts());
                }
            }
        } else {
            summary
        };

        ensure_paragraphs(&summary)
    }

    /// Three or four bullet points for a single article.
    #[instrument(level = "info", skip_all, fields(url = %article.url))]
    pub async fn summarize_article(&self, article: &ExtractedArticle) -> Result<String, LlmError> {
        let messages = [
            ChatMessage::system("Summarize the following news article in 3-4 concise bullet points."),
            ChatMessage::user(format!(
                "Article URL: {}\n\nContent: {}",
                article.url,
                truncate_chars(&article.text, ARTICLE_PROMPT_CHARS)
            )),
        ];
        self.llm.ask(&messages).await
    }

    /// Ask the model for reputable publishers covering `query`.
    ///
    /// One suggestion per non-empty line, with list markers removed. A failed
    /// call yields no suggestions.
    #[instrument(level = "info", skip(self))]
    pub async fn suggest_sources(&self, query: &str) -> Vec<String> {
        let prompt = format!("List three reputable news sources for {query}.");
        match self.llm.ask(&[ChatMessage::user(prompt)]).await {
            Ok(answer) => {
                let sources: Vec<String> = answer
                    .lines()
                    .map(|line| LIST_MARKER_REGEX.replace(line, "").trim().to_string())
                    .filter(|line| !line.is_empty())
                    .collect();
                info!(?sources, "Sources suggested");
                sources
            }
            Err(e) => {
                warn!(error = %e, stage = "suggest_sources", "Source suggestion failed");
                Vec::new()
            }
        }
    }

    /// Pick the headlines in `items` most relevant to `query`.
    #[instrument(level = "info", skip(self, items), fields(items = items.len()))]
    pub async fn search_headlines(&self, items: &[ArticleRef], query: &str) -> Result<String, LlmError> {
        if items.is_empty() {
            return Ok("No news items available to search.".to_string());
        }
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "I'm looking for news about '{query}'. Here are the latest headlines:\n\n{}\n\nPlease find and list the most relevant articles to my query. Include the article numbers and links.",
                headline_context(items)
            )),
        ];
        self.llm.ask(&messages).await
    }

    /// One-paragraph brief of the top headlines.
    pub async fn brief(&self, items: &[ArticleRef]) -> Result<String, LlmError> {
        let prompt = format!(
            "Create a concise daily news brief from these articles. Format as '📰 NEWS BRIEF 📰' followed by a paragraph summary. Here is the content:\n{}",
            headline_context(items)
        );
        self.llm.ask(&[ChatMessage::user(prompt)]).await
    }

    /// Three to five key headlines with short summaries.
    pub async fn top(&self, items: &[ArticleRef]) -> Result<String, LlmError> {
        let prompt = format!(
            "Create a concise daily news brief from these articles. Format as '📰 TOP NEWS 📰' followed by 3-5 key headlines with 1-2 sentence summaries for each. Here is the content:\n{}",
            headline_context(items)
        );
        self.llm.ask(&[ChatMessage::user(prompt)]).await
    }

    /// Headlines from one publisher `site`, listed with short summaries.
    pub async fn site_headlines(&self, site: &str, items: &[ArticleRef]) -> Result<String, LlmError> {
        let prompt = format!(
            "Display these articles in a listed format. Format as '📰 {} NEWS 📰' followed by 3-5 key headlines with 1-2 sentence summaries for each. Here is the content:\n{}",
            site.to_uppercase(),
            headline_context(items)
        );
        self.llm.ask(&[ChatMessage::user(prompt)]).await
    }

    /// One short paragraph over the cached headlines of `category`.
    pub async fn summarize_category(&self, category: &str, items: &[ArticleRef]) -> Result<String, LlmError> {
        let prompt = format!(
            "Summarize the following articles in 1 small paragraph:\n\n{}\n\nFormat as '📰 {} NEWS SUMMARY 📰'. Begin your summary now:",
            headline_context(items),
            category.to_uppercase()
        );
        self.llm.ask(&[ChatMessage::user(prompt)]).await
    }

    /// How different publishers cover `topic`.
    pub async fn compare(&self, topic: &str, items: &[ArticleRef]) -> Result<String, LlmError> {
        let prompt = format!(
            "Compare the following news coverage for the topic '{topic}' by different publishers. Format as '📰 {} NEWS 📰' followed by any notable differences or similarities in the headlines with 1-2 sentence summaries for each. Here is the data:\n{}\nProvide a brief analysis.",
            topic.to_uppercase(),
            headline_context(items)
        );
        self.llm.ask(&[ChatMessage::user(prompt)]).await
    }

    /// Possible bias in the headlines about `topic`.
    pub async fn bias(&self, topic: &str, items: &[ArticleRef]) -> Result<String, LlmError> {
        let prompt = format!(
            "Analyze the potential bias in the following news headlines on the topic '{topic}'. Format as '📰 {} NEWS BIAS 📰'. Consider the choice of words, the sources, and any political or cultural leanings that may be inferred. Here are the headlines:\n{}\nProvide your analysis in a concise summary.",
            topic.to_uppercase(),
            headline_context(items)
        );
        self.llm.ask(&[ChatMessage::user(prompt)]).await
    }

    /// Free-form question answered in the news assistant persona.
    pub async fn answer(&self, question: &str) -> Result<String, LlmError> {
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(question)];
        self.llm.ask(&messages).await
    }
}
