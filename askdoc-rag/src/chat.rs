//! Generation providers speaking the OpenAI-compatible chat-completions API.
//!
//! Both OpenAI and the Hugging Face inference router expose
//! `/v1/chat/completions`, so one [`ChatCompletionsProvider`] covers both.
//!
//! This module is available when either the `huggingface` or the `openai`
//! feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;

#[cfg(feature = "openai")]
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

#[cfg(feature = "huggingface")]
const HUGGINGFACE_CHAT_URL: &str = "https://router.huggingface.co/v1/chat/completions";

#[cfg(feature = "huggingface")]
const HUGGINGFACE_CHAT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";

const DEFAULT_MAX_TOKENS: u32 = 500;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A [`GenerationProvider`] calling an OpenAI-compatible chat endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use askdoc_rag::chat::ChatCompletionsProvider;
///
/// let primary = ChatCompletionsProvider::huggingface(std::env::var("HF_API_KEY")?)?;
/// let fallback = ChatCompletionsProvider::openai(std::env::var("OPENAI_API_KEY")?)?;
/// ```
pub struct ChatCompletionsProvider {
    client: reqwest::Client,
    name: String,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    system_prompt: Option<String>,
}

impl ChatCompletionsProvider {
    /// Create a provider for any OpenAI-compatible endpoint.
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::GenerationError {
                provider: name,
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: Self::http_client(&name, DEFAULT_TIMEOUT)?,
            name,
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: None,
        })
    }

    /// `mistralai/Mistral-7B-Instruct-v0.2` through the Hugging Face router.
    #[cfg(feature = "huggingface")]
    pub fn huggingface(api_key: impl Into<String>) -> Result<Self> {
        Self::new("huggingface", HUGGINGFACE_CHAT_URL, api_key, HUGGINGFACE_CHAT_MODEL)
    }

    /// `gpt-3.5-turbo` on the OpenAI API.
    #[cfg(feature = "openai")]
    pub fn openai(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::new("openai", OPENAI_CHAT_URL, api_key, "gpt-3.5-turbo")?
            .with_system_prompt("You are a helpful assistant."))
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Send requests to a custom endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the completion token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Prepend a system message to every request.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the HTTP request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Self::http_client(&self.name, timeout)?;
        Ok(self)
    }

    fn http_client(name: &str, timeout: Duration) -> Result<reqwest::Client> {
        reqwest::Client::builder().timeout(timeout).build().map_err(|e| RagError::GenerationError {
            provider: name.to_string(),
            message: format!("failed to build HTTP client: {e}"),
        })
    }

    fn failure(&self, message: String) -> RagError {
        RagError::GenerationError { provider: self.name.clone(), message }
    }
}

// ── Chat-completions request/response types ────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI nests the message under `error.message`; the HF router may send a bare string.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Nested { error: ErrorDetail },
    Flat { error: String },
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn error_detail(body: String) -> String {
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody::Nested { error }) => error.message,
        Ok(ErrorBody::Flat { error }) => error,
        Err(_) => body,
    }
}

// ── GenerationProvider implementation ──────────────────────────────

#[async_trait]
impl GenerationProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            provider = %self.name,
            model = %self.model,
            prompt_len = prompt.len(),
            "chat completion"
        );

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage { role: "system", content: system });
        }
        messages.push(ChatMessage { role: "user", content: prompt });

        let request_body =
            ChatRequest { model: &self.model, messages, max_tokens: self.max_tokens };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = %self.name, error = %e, "request failed");
                self.failure(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = %self.name, %status, "API error");
            return Err(self.failure(format!("API returned {status}: {}", error_detail(body))));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = %self.name, error = %e, "failed to parse response");
            self.failure(format!("failed to parse response: {e}"))
        })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| self.failure("API returned no completion".into()))
    }
}
