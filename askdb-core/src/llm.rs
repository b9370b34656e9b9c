use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{AnswerFields, AskDbError, Value};

/// A model API key. `Debug` never prints it and it is never serialized.
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::new(key.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

impl PartialEq for ApiKey {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl<'de> Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// One JSON-mode round trip to the language model.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct LlmJsonRequest {
    pub prompt: String,
    pub system_message: String,
    pub model: String,
    pub temperature: f32,
    /// Auxiliary context (e.g. a conversation summary) sent as its own message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_message: Option<String>,
    /// Overrides the client's default key for this call only.
    #[serde(skip)]
    pub api_key: Option<ApiKey>,
}

impl LlmJsonRequest {
    pub fn new(
        prompt: impl Into<String>,
        system_message: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            system_message: system_message.into(),
            model: model.into(),
            temperature: 0.1,
            context_message: None,
            api_key: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Blank context is treated as no context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context_message = if context.trim().is_empty() {
            None
        } else {
            Some(context)
        };
        self
    }

    pub fn with_api_key(mut self, api_key: Option<ApiKey>) -> Self {
        self.api_key = api_key;
        self
    }
}

/// The parsed JSON answer plus the monetary cost of producing it.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct LlmJsonResponse {
    pub answer: Value,
    pub cost: f64,
}

impl LlmJsonResponse {
    pub fn new(answer: Value, cost: f64) -> Self {
        Self { answer, cost }
    }

    /// Field accessors that report errors against the given stage name.
    pub fn fields<'a>(&'a self, stage: &'a str) -> AnswerFields<'a> {
        AnswerFields::new(stage, &self.answer)
    }
}

/// Model, system message and sampling settings shared by every request a
/// component sends.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct LlmSettings {
    pub model: String,
    pub system_message: String,
    pub temperature: f32,
    #[serde(skip)]
    pub api_key: Option<ApiKey>,
}

impl LlmSettings {
    pub fn new(model: impl Into<String>, system_message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_message: system_message.into(),
            temperature: 0.1,
            api_key: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = system_message.into();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<ApiKey>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn request(&self, prompt: impl Into<String>) -> LlmJsonRequest {
        LlmJsonRequest::new(prompt, self.system_message.clone(), self.model.clone())
            .with_temperature(self.temperature)
            .with_api_key(self.api_key.clone())
    }
}

/// A value parsed from one model answer, with the prompt that produced it
/// and what the call cost.
#[derive(Clone, Debug, PartialEq)]
pub struct LlmOutput<T> {
    pub value: T,
    pub prompt: String,
    pub cost: f64,
}

impl<T> LlmOutput<T> {
    pub fn new(value: T, prompt: impl Into<String>, cost: f64) -> Self {
        Self {
            value,
            prompt: prompt.into(),
            cost,
        }
    }
}

#[async_trait::async_trait]
pub trait JsonLlm: Send + Sync {
    async fn ask_json(&self, request: LlmJsonRequest) -> Result<LlmJsonResponse, AskDbError>;
}

#[async_trait::async_trait]
impl<T> JsonLlm for Arc<T>
where
    T: JsonLlm + ?Sized,
{
    async fn ask_json(&self, request: LlmJsonRequest) -> Result<LlmJsonResponse, AskDbError> {
        (**self).ask_json(request).await
    }
}
