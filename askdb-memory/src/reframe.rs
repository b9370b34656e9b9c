use std::sync::Arc;

use askdb_core::{AskDbError, JsonLlm, LlmOutput, LlmSettings, QueryType, Stage};
use askdb_prompt::context::{
    answer_from_history_prompt, classify_prompt, reframe_prompt, REFRAME_SYSTEM_MESSAGE,
};

use crate::ContextWindow;

/// Rewrites follow-ups and clarifications against the conversation so far.
///
/// History is always passed most recent turn first.
pub struct QueryReframer {
    llm: Arc<dyn JsonLlm>,
    settings: LlmSettings,
}

impl QueryReframer {
    pub fn new(llm: Arc<dyn JsonLlm>, settings: LlmSettings) -> Self {
        Self { llm, settings }
    }

    pub async fn classify(
        &self,
        query_text: &str,
        window: &ContextWindow,
    ) -> Result<LlmOutput<QueryType>, AskDbError> {
        let prompt = classify_prompt(query_text, &window.render_recent_first())?;
        let response = self.llm.ask_json(self.settings.request(prompt.clone())).await?;

        let stage = Stage::ClassifyQuestion.as_str();
        let label = response.fields(stage).text("question_type")?;
        let question_type = QueryType::from_label(&label).ok_or_else(|| AskDbError::InvalidField {
            stage: stage.to_string(),
            field: "question_type".to_string(),
            reason: format!("unknown question type '{label}'"),
        })?;
        Ok(LlmOutput::new(question_type, prompt, response.cost))
    }

    pub async fn reframe(
        &self,
        query_text: &str,
        window: &ContextWindow,
    ) -> Result<LlmOutput<String>, AskDbError> {
        let prompt = reframe_prompt(query_text, &window.render_recent_first())?;
        let request = self
            .settings
            .clone()
            .with_system_message(REFRAME_SYSTEM_MESSAGE)
            .request(prompt.clone());
        let response = self.llm.ask_json(request).await?;

        let reframed = response.fields(Stage::Reframe.as_str()).text("reframed_query")?;
        Ok(LlmOutput::new(reframed, prompt, response.cost))
    }

    pub async fn answer_from_history(
        &self,
        query_text: &str,
        window: &ContextWindow,
        language: &str,
        script: &str,
    ) -> Result<LlmOutput<String>, AskDbError> {
        let prompt =
            answer_from_history_prompt(query_text, &window.render_recent_first(), language, script)?;
        let response = self.llm.ask_json(self.settings.request(prompt.clone())).await?;

        let answer = response
            .fields(Stage::AnswerFromHistory.as_str())
            .text("answer")?;
        Ok(LlmOutput::new(answer, prompt, response.cost))
    }
}
