use parking_lot::Mutex;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use super::error::AnalysisError;

pub const DEFAULT_ENDPOINT: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Text returned by the model, plus the token count when the API reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub total_tokens: Option<u64>,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            total_tokens: None,
        }
    }
}

pub trait LLMClient {
    /// Sends one prompt. Any failure to obtain text is reported as
    /// [`AnalysisError::Transport`].
    fn complete(&self, system: Option<&str>, prompt: &str) -> Result<Completion, AnalysisError>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            temperature: 0.1,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Blocking client for OpenAI-compatible `chat/completions` endpoints.
pub struct ChatCompletionClient {
    config: ClientConfig,
    http: HttpClient,
}

impl ChatCompletionClient {
    pub fn new(config: ClientConfig) -> Result<Self, AnalysisError> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| {
                AnalysisError::Transport(format!("cannot initialise HTTP client: {err}"))
            })?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl LLMClient for ChatCompletionClient {
    fn complete(&self, system: Option<&str>, prompt: &str) -> Result<Completion, AnalysisError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });
        let payload = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            stream: false,
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .map_err(|err| AnalysisError::Transport(format!("request failed: {err}")))?
            .error_for_status()
            .map_err(|err| AnalysisError::Transport(format!("error status: {err}")))?;

        let body: ChatResponse = response
            .json()
            .map_err(|err| AnalysisError::Transport(format!("unreadable response body: {err}")))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AnalysisError::Transport("response has no choices".to_string()))?;

        Ok(Completion {
            text,
            total_tokens: body.usage.and_then(|usage| usage.total_tokens),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: Option<u64>,
}

/// Scripted client; answers are returned in the order they were pushed.
#[derive(Clone, Default)]
pub struct MockLLMClient {
    responses: Arc<Mutex<VecDeque<Result<Completion, String>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockLLMClient {
    pub fn push_response(&self, text: impl Into<String>) {
        self.responses.lock().push_back(Ok(Completion::new(text)));
    }

    pub fn push_completion(&self, completion: Completion) {
        self.responses.lock().push_back(Ok(completion));
    }

    pub fn push_failure(&self, reason: impl Into<String>) {
        self.responses.lock().push_back(Err(reason.into()));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl LLMClient for MockLLMClient {
    fn complete(&self, _: Option<&str>, prompt: &str) -> Result<Completion, AnalysisError> {
        self.prompts.lock().push(prompt.to_string());
        match self.responses.lock().pop_front() {
            Some(Ok(completion)) => Ok(completion),
            Some(Err(reason)) => Err(AnalysisError::Transport(reason)),
            None => Err(AnalysisError::Transport(
                "no scripted response available".to_string(),
            )),
        }
    }
}
