use serde::{Deserialize, Serialize};

use crate::Value;

/// One user turn.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Query {
    pub query_text: String,
    #[serde(default)]
    pub query_metadata: Value,
}

impl Query {
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            query_metadata: Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.query_metadata = metadata;
        self
    }

    /// Same metadata, different text. Used when a stage rewrites the question.
    pub fn with_text(&self, query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            query_metadata: self.query_metadata.clone(),
        }
    }

    /// Metadata as prompt text; empty when there is none.
    pub fn metadata_text(&self) -> String {
        match &self.query_metadata {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            Value::Object(map) if map.is_empty() => String::new(),
            other => other.to_string(),
        }
    }
}

/// How a multi-turn question relates to the conversation so far.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    NewQuestion,
    FollowUp,
    Clarification,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::NewQuestion => "new_question",
            QueryType::FollowUp => "follow_up",
            QueryType::Clarification => "clarification",
        }
    }

    /// Lenient parse of a model label ("Follow-up", "follow up", ...).
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "new" | "newquestion" => Some(QueryType::NewQuestion),
            "followup" | "followupquestion" => Some(QueryType::FollowUp),
            "clarification" | "clarify" | "clarificationquestion" => {
                Some(QueryType::Clarification)
            }
            _ => None,
        }
    }
}
