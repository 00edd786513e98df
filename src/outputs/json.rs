//! JSON record of finished digest runs.
//!
//! # Output Structure
//!
//! Files are organized by UTC date, one file per topic:
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── climate-talks.json
//!     └── local-elections.json
//! ```
//!
//! A second run for the same topic on the same day replaces the earlier file.

use crate::models::DigestReport;
use crate::utils::{ensure_writable_dir, slugify_title};
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// File name used when a topic has no usable characters.
const FALLBACK_SLUG: &str = "digest";

/// Write a [`DigestReport`] as pretty-printed JSON.
///
/// The file is written to `{json_output_dir}/{date}/{topic-slug}.json` and its
/// path returned.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or written to, or if
/// serialization fails.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, topic = %report.topic))]
pub async fn write_report(
    report: &DigestReport,
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;

    let date = report.generated_at.date_naive().to_string();
    let full_json_dir = format!("{}/{}", json_output_dir.trim_end_matches('/'), date);

    info!(%full_json_dir, "Ensuring JSON directory exists");
    if let Err(e) = ensure_writable_dir(&full_json_dir).await {
        error!(%full_json_dir, error = %e, "JSON directory is not writable");
        return Err(e);
    }

    let slug = slugify_title(&report.topic);
    let slug = if slug.is_empty() { FALLBACK_SLUG } else { slug.as_str() };
    let path = PathBuf::from(format!("{full_json_dir}/{slug}.json"));

    info!(path = %path.display(), "Writing JSON");
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote digest report");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportedArticle;
    use chrono::{TimeZone, Utc};

    fn report(topic: &str) -> DigestReport {
        DigestReport {
            topic: topic.to_string(),
            generated_at: Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap(),
            urls: vec!["https://a.test/1".to_string()],
            articles: vec![ReportedArticle {
                url: "https://a.test/1".to_string(),
                length: 240,
                paywall_suspected: true,
            }],
            summary: "One.\n\nTwo.\n\nThree.".to_string(),
        }
    }

    fn temp_dir(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("news_digest_{name}_{}", std::process::id()))
            .to_string_lossy()
            .into_owned()
    }

    #[tokio::test]
    async fn test_write_report_by_date_and_slug() {
        let dir = temp_dir("write");
        let path = write_report(&report("Climate Talks!"), &dir).await.unwrap();

        assert!(path.ends_with("2025-05-06/climate-talks.json"));
        let written = fs::read_to_string(&path).await.unwrap();
        let parsed: DigestReport = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.summary, "One.\n\nTwo.\n\nThree.");
        assert!(parsed.articles[0].paywall_suspected);

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_unsluggable_topic_uses_fallback_name() {
        let dir = temp_dir("fallback");
        let path = write_report(&report("???"), &dir).await.unwrap();
        assert!(path.ends_with("2025-05-06/digest.json"));
        let _ = fs::remove_dir_all(&dir).await;
    }
}
