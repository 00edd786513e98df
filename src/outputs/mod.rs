//! Output generation for chat responses and JSON reports.
//!
//! # Submodules
//!
//! - [`text`]: Formats headline lists, digests and help for the bot and CLI
//! - [`json`]: Writes `DigestReport` data to dated JSON files
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     └── climate-talks.json
//! ```

pub mod json;
pub mod text;
