#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use askdb_core::testing::ScriptedLlm;
    use askdb_core::{AskDbError, LlmSettings, Query};
    use serde_json::json;

    use crate::summary::ConversationSummarizer;
    use crate::window::{ContextEntry, ContextWindow};

    fn window() -> ContextWindow {
        let mut window = ContextWindow::new(3);
        window.push(ContextEntry::new(
            "How many beds are in Pune?",
            "There are 120 beds in Pune.",
            "SELECT SUM(beds) FROM hospitals WHERE district = 'Pune'",
        ));
        window
    }

    #[tokio::test]
    async fn test_summary_with_empty_final_answer_does_not_short_circuit() {
        let llm = Arc::new(ScriptedLlm::sequence([json!({
            "conversation_summary": "The user asked about beds in Pune.",
            "final_answer": ""
        })]));
        let summarizer =
            ConversationSummarizer::new(llm.clone(), LlmSettings::new("gpt-4o", "sys"));

        let output = summarizer
            .summarize(&Query::new("And in Satara?"), &window(), "English", "Latin")
            .await
            .unwrap();

        assert_eq!(output.value.summary, "The user asked about beds in Pune.");
        assert_eq!(output.value.final_answer, None);
        assert!(output.prompt.contains("There are 120 beds in Pune."));
        assert_eq!(llm.requests()[0].system_message, "sys");
    }

    #[tokio::test]
    async fn test_summary_final_answer_is_returned() {
        let llm = Arc::new(ScriptedLlm::sequence([json!({
            "conversation_summary": "Beds in Pune: 120.",
            "final_answer": "Pune has 120 beds."
        })]));
        let summarizer = ConversationSummarizer::new(llm, LlmSettings::new("gpt-4o", "sys"));

        let output = summarizer
            .summarize(
                &Query::new("Remind me, how many beds in Pune?"),
                &window(),
                "Marathi",
                "Devanagari",
            )
            .await
            .unwrap();

        assert_eq!(output.value.final_answer.as_deref(), Some("Pune has 120 beds."));
        assert!(output.prompt.contains("in Marathi, in the Devanagari script"));
    }

    #[tokio::test]
    async fn test_missing_summary_is_fatal() {
        let llm = Arc::new(ScriptedLlm::sequence([json!({"final_answer": ""})]));
        let summarizer = ConversationSummarizer::new(llm, LlmSettings::new("gpt-4o", "sys"));

        let err = summarizer
            .summarize(&Query::new("q"), &window(), "English", "Latin")
            .await
            .unwrap_err();
        assert!(
            matches!(err, AskDbError::MissingField { field, .. } if field == "conversation_summary")
        );
    }
}
