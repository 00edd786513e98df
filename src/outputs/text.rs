//! Chat-facing text blocks.
//!
//! Every bot response is a single block of text: a headline list, a digest,
//! an LLM answer, or the help screen.

use crate::models::{ArticleRef, DigestReport};

/// Headlines shown per listing.
pub const MAX_LISTED: usize = 5;

pub const HELP: &str = "📰 **NEWS BOT HELP** 📰

Available commands:
- `news` or `news <category>`: latest headlines (technology, business, politics, science, general)
- `news refresh`: reload every category feed
- `news summary <url>`: bullet-point summary of one article
- `news brief`: short brief of the top headlines
- `news top`: three to five key headlines with short summaries
- `news source <site>`: latest headlines from one publisher, e.g. `news source cnn.com`
- `news summarize [category]`: one-paragraph summary of a category's headlines
- `news compare <topic>`: compare coverage of a topic across publishers
- `news bias <topic>`: analyze potential bias in coverage of a topic
- `news digest <topic>`: search the web and summarize the top articles
- `news help`: this message
- `news <anything else>`: find matching headlines

Any other message is answered by the news assistant.";

pub const REFRESHED: &str = "News sources refreshed!";

/// Numbered list of up to [`MAX_LISTED`] headlines for `category`.
///
/// # Examples
///
/// ```ignore
/// let text = format_headlines(&items, "technology");
/// assert!(text.starts_with("📰 **LATEST TECHNOLOGY NEWS** 📰"));
/// ```
pub fn format_headlines(items: &[ArticleRef], category: &str) -> String {
    if items.is_empty() {
        return format!("No recent news found for {category}.");
    }

    let mut response = format!("📰 **LATEST {} NEWS** 📰\n\n", category.to_uppercase());
    for (i, item) in items.iter().take(MAX_LISTED).enumerate() {
        response.push_str(&format!("{}. **{}**\n", i + 1, item.title));
        response.push_str(&format!("   Source: {} | {}\n", item.source, item.published));
        response.push_str(&format!("   Link: {}\n\n", item.link));
    }
    response.push_str("Use `news summary <url>` to get a summary of any article.");
    response
}

/// Digest summary under a topic header, followed by its sources.
pub fn format_digest(report: &DigestReport) -> String {
    let mut response = format!(
        "📰 **{} NEWS SUMMARY** 📰\n\n{}\n\nSources:\n",
        report.topic.to_uppercase(),
        report.summary
    );
    for (i, article) in report.articles.iter().enumerate() {
        response.push_str(&format!("{}. {}\n", i + 1, article.url));
    }
    response.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportedArticle;
    use chrono::Utc;

    fn item(i: usize) -> ArticleRef {
        ArticleRef {
            title: format!("Headline {i}"),
            link: format!("https://a.test/{i}"),
            published: "Mon, 05 May 2025".to_string(),
            source: "A Test".to_string(),
            summary: "No summary available".to_string(),
        }
    }

    #[test]
    fn test_headline_list_format() {
        let items: Vec<ArticleRef> = (1..=7).map(item).collect();
        let text = format_headlines(&items, "science");

        assert!(text.starts_with("📰 **LATEST SCIENCE NEWS** 📰\n\n1. **Headline 1**\n"));
        assert!(text.contains("   Source: A Test | Mon, 05 May 2025\n   Link: https://a.test/1\n"));
        assert!(text.contains("5. **Headline 5**"));
        assert!(!text.contains("Headline 6"));
        assert!(text.ends_with("to get a summary of any article."));
    }

    #[test]
    fn test_empty_headline_list() {
        assert_eq!(format_headlines(&[], "business"), "No recent news found for business.");
    }

    #[test]
    fn test_digest_format() {
        let report = DigestReport {
            topic: "comet".to_string(),
            generated_at: Utc::now(),
            urls: vec![],
            articles: vec![ReportedArticle {
                url: "https://a.test/1".to_string(),
                length: 10,
                paywall_suspected: false,
            }],
            summary: "A.\n\nB.\n\nC.".to_string(),
        };
        assert_eq!(
            format_digest(&report),
            "📰 **COMET NEWS SUMMARY** 📰\n\nA.\n\nB.\n\nC.\n\nSources:\n1. https://a.test/1"
        );
    }
}
