//! # News Digest
//!
//! A news acquisition and summarization pipeline. Given a topic it finds
//! candidate article URLs through an ordered chain of search surfaces,
//! extracts the main text of each page, and asks an LLM for a
//! three-paragraph summary. A bot-style command layer serves cached category
//! headlines from RSS/Atom feeds alongside briefs, comparisons and bias
//! analysis.
//!
//! ## Features
//!
//! - URL discovery with fallback across news search, RSS search and hinted
//!   web search, capped and deduplicated
//! - Heuristic main-text extraction that never fails
//! - One-hour in-memory cache of category feeds
//! - Summaries through an OpenAI-compatible API via `awful_aj`, with an
//!   extractive fallback when the model is unavailable
//! - Optional JSON record of each digest
//!
//! ## Usage
//!
//! ```sh
//! news_digest digest --topic "solar power"
//! news_digest command news technology
//! ```
//!
//! Diagnostics go to the log file only; stdout carries the final result.
//!
//! ## Architecture
//!
//! 1. **Discovery**: topic → candidate URLs
//! 2. **Aggregation**: fetch and extract each page, validate the batch
//! 3. **Summarization**: LLM summary, regrouped into three paragraphs
//! 4. **Output**: print the result and optionally write a JSON report

use clap::Parser;
use std::error::Error;
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod commands;
mod config;
mod error;
mod feeds;
mod fetch;
mod llm;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod summarizer;
#[cfg(test)]
mod test_support;
mod utils;

use cli::{Cli, Mode};
use commands::NewsAgent;
use config::Settings;
use fetch::HttpFetcher;
use llm::AwfulAjClient;
use outputs::json;
use pipeline::DigestPipeline;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    // --- Tracing init ---
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(Mutex::new(log_file))
        .init();

    let start_time = std::time::Instant::now();
    info!("news_digest starting up");
    debug!(?args, "Parsed CLI arguments");

    let settings = Settings::load(args.settings.as_deref()).await?;
    let fetcher = HttpFetcher::new(settings.timeouts.clone())?;
    let llm = AwfulAjClient::load(args.config.as_deref(), &args.template).await?;

    let outcome = match args.mode {
        Mode::Digest { topic } => {
            let topic = match topic {
                Some(topic) => topic,
                None => prompt_topic()?,
            };
            let pipeline = DigestPipeline::new(&fetcher, &llm, &settings).with_source_hints(args.source_hints);
            run_digest(&pipeline, &topic, args.json_output_dir.as_deref()).await
        }
        Mode::Command { message } => {
            let agent = NewsAgent::new(&fetcher, &llm, &settings).with_source_hints(args.source_hints);
            let response = agent.handle(&message.join(" ")).await;
            println!("{response}");
            Ok(())
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    outcome
}

/// Read a topic from stdin. The prompt goes to stderr so stdout stays clean.
fn prompt_topic() -> Result<String, Box<dyn Error>> {
    eprint!("Enter a news topic: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let topic = line.trim().to_string();
    if topic.is_empty() {
        return Err("no topic given".into());
    }
    Ok(topic)
}

#[instrument(level = "info", skip(pipeline, json_output_dir))]
async fn run_digest(
    pipeline: &DigestPipeline<&HttpFetcher, &AwfulAjClient>,
    topic: &str,
    json_output_dir: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let report = match pipeline.run(topic).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Digest failed");
            println!("{}", e.user_message());
            return Ok(());
        }
    };

    println!("{}", report.summary);

    if let Some(dir) = json_output_dir
        && let Err(e) = json::write_report(&report, dir).await
    {
        error!(error = %e, "Failed to write JSON report");
    }

    Ok(())
}
