use thiserror::Error;

use crate::GuardrailCheck;

#[derive(Debug, Error)]
pub enum AskDbError {
    #[error("LLM provider failed: {0}")]
    LlmProvider(String),
    #[error("LLM answer for stage '{stage}' is missing required field '{field}'")]
    MissingField { stage: String, field: String },
    #[error("LLM answer for stage '{stage}' has field '{field}' of unexpected shape: {reason}")]
    InvalidField {
        stage: String,
        field: String,
        reason: String,
    },
    #[error(
        "LLM answer for stage '{stage}' has flag '{field}' = {value}, expected \"True\" or \"False\""
    )]
    InvalidFlag {
        stage: String,
        field: String,
        value: String,
    },
    #[error("Parsing failed on output '{output}': {reason}")]
    ParseFailed { output: String, reason: String },
    #[error("Database operation failed: {0}")]
    Database(String),
    #[error("guardrail '{check}' is not configured for this pipeline")]
    GuardrailNotConfigured { check: GuardrailCheck },
    #[error("guardrail '{check}' already resolved this turn")]
    GuardrailAlreadyResolved { check: GuardrailCheck },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl AskDbError {
    pub fn missing_field(stage: impl Into<String>, field: impl Into<String>) -> Self {
        AskDbError::MissingField {
            stage: stage.into(),
            field: field.into(),
        }
    }
}
