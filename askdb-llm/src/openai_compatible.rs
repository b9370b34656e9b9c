//! Generic OpenAI-compatible client in JSON mode.
//!
//! Works with any provider that implements `/v1/chat/completions` with
//! `response_format: {"type": "json_object"}` (OpenAI, Azure proxies,
//! vLLM, LiteLLM, ...).

use std::time::Duration;

use askdb_core::{AskDbError, JsonLlm, LlmJsonRequest, LlmJsonResponse};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{parse_json_content, PricingTable};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Error)]
pub enum LlmClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http error {status}: {message}")]
    Http { status: StatusCode, message: String },
    #[error("response has no choices")]
    NoChoices,
    #[error("response message has no content")]
    NoContent,
}

impl From<LlmClientError> for AskDbError {
    fn from(err: LlmClientError) -> Self {
        AskDbError::LlmProvider(err.to_string())
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Serialize, Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// Request body for the chat completions endpoint.
#[derive(Serialize, Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub response_format: ResponseFormat,
}

impl ChatCompletionRequest {
    /// System message, then the optional context, then the prompt.
    pub fn from_json_request(request: &LlmJsonRequest) -> Self {
        let mut messages = vec![ChatMessage {
            role: Role::System,
            content: request.system_message.clone(),
        }];
        if let Some(context) = &request.context_message {
            messages.push(ChatMessage {
                role: Role::System,
                content: context.clone(),
            });
        }
        messages.push(ChatMessage {
            role: Role::User,
            content: request.prompt.clone(),
        });
        Self {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Deserialize, Debug, Clone)]
struct OpenAiError {
    error: ErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
struct ErrorDetail {
    message: String,
}

pub struct OpenAiCompatibleClient {
    http: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    pricing: PricingTable,
}

impl OpenAiCompatibleClient {
    pub fn builder() -> OpenAiCompatibleBuilder {
        OpenAiCompatibleBuilder::default()
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    fn cost(&self, request_model: &str, response_model: &str, usage: Usage) -> f64 {
        let pricing = self
            .pricing
            .get(request_model)
            .or_else(|| self.pricing.get(response_model));
        match pricing {
            Some(pricing) => pricing.cost(usage.prompt_tokens, usage.completion_tokens),
            None => {
                warn!(model = request_model, "no pricing configured for model; cost recorded as 0");
                0.0
            }
        }
    }

    async fn complete(
        &self,
        request: &LlmJsonRequest,
    ) -> Result<ChatCompletionResponse, LlmClientError> {
        let body = ChatCompletionRequest::from_json_request(request);
        let mut call = self.http.post(self.completions_url()).json(&body);
        if let Some(key) = &request.api_key {
            call = call.bearer_auth(key.expose());
        } else if let Some(key) = &self.api_key {
            call = call.bearer_auth(key.expose_secret());
        }

        let response = call.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&text)
                .map(|err| err.error.message)
                .unwrap_or(text);
            return Err(LlmClientError::Http { status, message });
        }
        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl JsonLlm for OpenAiCompatibleClient {
    async fn ask_json(&self, request: LlmJsonRequest) -> Result<LlmJsonResponse, AskDbError> {
        debug!(
            model = %request.model,
            temperature = request.temperature,
            prompt_chars = request.prompt.len(),
            "sending chat completion"
        );
        let response = self.complete(&request).await?;
        let content = response
            .choices
            .first()
            .ok_or(LlmClientError::NoChoices)?
            .message
            .content
            .as_deref()
            .ok_or(LlmClientError::NoContent)?;
        let answer = parse_json_content(content)?;
        let cost = self.cost(
            &request.model,
            &response.model,
            response.usage.unwrap_or_default(),
        );
        Ok(LlmJsonResponse::new(answer, cost))
    }
}

pub struct OpenAiCompatibleBuilder {
    base_url: Option<Url>,
    api_key: Option<SecretString>,
    timeout: Duration,
    pricing: PricingTable,
}

impl Default for OpenAiCompatibleBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout: Duration::from_secs(120),
            pricing: PricingTable::openai_defaults(),
        }
    }
}

impl OpenAiCompatibleBuilder {
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self, AskDbError> {
        let url = Url::parse(url.as_ref())
            .map_err(|err| AskDbError::InvalidConfig(format!("invalid base url: {err}")))?;
        self.base_url = Some(url);
        Ok(self)
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn build(self) -> Result<OpenAiCompatibleClient, AskDbError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)
                .map_err(|err| AskDbError::InvalidConfig(err.to_string()))?,
        };
        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| AskDbError::LlmProvider(err.to_string()))?;
        Ok(OpenAiCompatibleClient {
            http,
            base_url,
            api_key: self.api_key,
            pricing: self.pricing,
        })
    }
}
