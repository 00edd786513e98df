//! Language model interaction.
//!
//! The pipeline only ever sees the [`AskAsync`] trait: an ordered list of
//! chat messages goes in, text comes out, and the call may fail. The concrete
//! backend, [`AwfulAjClient`], adapts `awful_aj::api::ask` and its YAML
//! configuration and chat template.
//!
//! Calls are made once. The summarizer decides whether a failed or unhelpful
//! answer warrants a second, differently-worded prompt; there is no automatic
//! retry or backoff at this layer.

use crate::error::LlmError;
use crate::models::{ChatMessage, Role};
use awful_aj::api::ask;
use awful_aj::{config, config_dir, config::AwfulJadeConfig, template, template::ChatTemplate};
use std::error::Error;
use std::fmt;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors receive the full conversation for one request and return the
/// model's reply.
pub trait AskAsync {
    /// Send `messages` to the model and return its answer.
    async fn ask(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

impl<T: AskAsync> AskAsync for &T {
    async fn ask(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        (**self).ask(messages).await
    }
}

/// [`AskAsync`] backed by `awful_aj`.
///
/// The model, endpoint and credentials come from the `awful_aj` config file;
/// the chat template supplies the base system prompt.
pub struct AwfulAjClient {
    config: AwfulJadeConfig,
    template: ChatTemplate,
}

impl fmt::Debug for AwfulAjClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwfulAjClient").finish_non_exhaustive()
    }
}

impl AwfulAjClient {
    /// Load the config (from `config_path`, or `config.yaml` in the
    /// `awful_aj` config directory) and the named chat template.
    #[instrument(level = "info")]
    pub async fn load(config_path: Option<&str>, template_name: &str) -> Result<Self, Box<dyn Error>> {
        let config_path = match config_path {
            Some(path) => path.to_string(),
            None => config_dir()?.join("config.yaml").to_string_lossy().into_owned(),
        };
        let config = config::load_config(&config_path)?;
        info!(%config_path, "Loaded LLM configuration");

        let template = template::load_template(template_name).await?;
        info!(template_name, "Loaded chat template");

        Ok(Self { config, template })
    }
}

impl AskAsync for AwfulAjClient {
    #[instrument(level = "info", skip_all, fields(messages = messages.len()))]
    async fn ask(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let t0 = Instant::now();
        let res = ask(&self.config, render_messages(messages), &self.template, None, None).await;
        let dt = t0.elapsed();

        match res {
            Ok(answer) if answer.trim().is_empty() => {
                warn!(elapsed_ms = dt.as_millis() as u64, "LLM returned an empty answer");
                Err(LlmError::EmptyResponse)
            }
            Ok(answer) => {
                info!(elapsed_ms = dt.as_millis() as u64, chars = answer.len(), "LLM call succeeded");
                Ok(answer)
            }
            Err(e) => {
                warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "LLM call failed");
                Err(LlmError::Request(e.to_string()))
            }
        }
    }
}

/// Flatten a conversation into the single prompt `awful_aj` expects.
///
/// System instructions come first, then the remaining turns in order.
fn render_messages(messages: &[ChatMessage]) -> String {
    let system = messages.iter().filter(|m| m.role == Role::System);
    let rest = messages.iter().filter(|m| m.role != Role::System);
    system
        .chain(rest)
        .map(|m| m.content.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
