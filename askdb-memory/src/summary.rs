use std::sync::Arc;

use askdb_core::{AskDbError, JsonLlm, LlmOutput, LlmSettings, Query, Stage};
use askdb_prompt::context::conversation_summary_prompt;
use tracing::debug;

use crate::ContextWindow;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationSummary {
    pub summary: String,
    /// Set when the history already answers the new question.
    pub final_answer: Option<String>,
}

/// Digests the context window into a summary used by later prompts.
pub struct ConversationSummarizer {
    llm: Arc<dyn JsonLlm>,
    settings: LlmSettings,
}

impl ConversationSummarizer {
    pub fn new(llm: Arc<dyn JsonLlm>, settings: LlmSettings) -> Self {
        Self { llm, settings }
    }

    pub async fn summarize(
        &self,
        query: &Query,
        window: &ContextWindow,
        language: &str,
        script: &str,
    ) -> Result<LlmOutput<ConversationSummary>, AskDbError> {
        let prompt =
            conversation_summary_prompt(query, &window.render_recent_first(), language, script)?;
        debug!(turns = window.len(), "summarizing conversation");
        let response = self.llm.ask_json(self.settings.request(prompt.clone())).await?;

        let fields = response.fields(Stage::ConversationSummary.as_str());
        let summary = fields.text("conversation_summary")?;
        let final_answer = fields
            .optional_text("final_answer")?
            .filter(|answer| !answer.trim().is_empty());

        Ok(LlmOutput::new(
            ConversationSummary {
                summary,
                final_answer,
            },
            prompt,
            response.cost,
        ))
    }
}
