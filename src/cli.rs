//! Command-line interface definitions for News Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Global options can also be provided via environment variables.

use clap::{Parser, Subcommand};

/// Command-line arguments for the News Digest application.
///
/// # Examples
///
/// ```sh
/// # Summarize a topic (prompts on stdin when --topic is omitted)
/// news_digest digest --topic "solar power"
///
/// # Keep a JSON record of the run
/// news_digest -j ./json digest --topic "solar power"
///
/// # Answer one bot command
/// news_digest command news technology
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a settings YAML file (feeds, search surfaces, limits)
    #[arg(short, long, env = "NEWS_DIGEST_SETTINGS")]
    pub settings: Option<String>,

    /// Optional path to the awful_aj config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Name of the awful_aj chat template
    #[arg(short, long, default_value = "news_summary")]
    pub template: String,

    /// File that receives diagnostic logs
    #[arg(short, long, env = "NEWS_DIGEST_LOG", default_value = "news_digest.log")]
    pub log_file: String,

    /// Output directory for JSON digest reports
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Ask the model for publisher names to search when discovery finds nothing else
    #[arg(long, global = true)]
    pub source_hints: bool,

    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Search the web for a topic and print a three-paragraph summary
    Digest {
        /// Topic to summarize; read from stdin when omitted
        #[arg(long)]
        topic: Option<String>,
    },
    /// Answer a single bot message, e.g. `news technology`
    Command {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
}
