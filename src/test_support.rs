//! In-memory fakes shared by unit tests.

use crate::error::{FetchError, LlmError};
use crate::fetch::{Fetch, RequestKind};
use crate::llm::AskAsync;
use crate::models::ChatMessage;
use std::collections::HashMap;
use std::sync::Mutex;

/// [`Fetch`] fake serving canned bodies or statuses per exact URL.
///
/// Unknown URLs answer 404. Every request is recorded.
#[derive(Debug, Default)]
pub struct MockFetcher {
    pages: HashMap<String, Result<String, u16>>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(url.to_string(), Err(status));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Fetch for MockFetcher {
    async fn get_text(&self, url: &str, _kind: RequestKind) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(code)) => Err(FetchError::Http {
                status: reqwest::StatusCode::from_u16(*code).unwrap(),
            }),
            None => Err(FetchError::Http {
                status: reqwest::StatusCode::NOT_FOUND,
            }),
        }
    }
}

/// [`AskAsync`] fake replaying scripted answers in order.
///
/// Once the script is exhausted every call fails.
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    answers: Mutex<Vec<Result<String, String>>>,
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    pub fn new(answers: Vec<Result<&str, &str>>) -> Self {
        let mut answers: Vec<Result<String, String>> = answers
            .into_iter()
            .map(|a| a.map(str::to_string).map_err(str::to_string))
            .collect();
        answers.reverse();
        Self {
            answers: Mutex::new(answers),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::new(vec![])
    }

    pub fn prompts(&self) -> Vec<Vec<ChatMessage>> {
        self.prompts.lock().unwrap().clone()
    }
}

impl AskAsync for ScriptedLlm {
    async fn ask(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        match self.answers.lock().unwrap().pop() {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(e)) => Err(LlmError::Request(e)),
            None => Err(LlmError::Request("quota exceeded".to_string())),
        }
    }
}

/// Echoes the last user message back, like a model that ignores instructions.
#[derive(Debug, Default)]
pub struct EchoLlm;

impl AskAsync for EchoLlm {
    async fn ask(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        messages
            .last()
            .map(|m| m.content.clone())
            .ok_or(LlmError::EmptyResponse)
    }
}
