#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use askdb_core::testing::ScriptedLlm;
    use askdb_core::{AskDbError, LlmSettings, QueryType};
    use askdb_prompt::context::REFRAME_SYSTEM_MESSAGE;
    use serde_json::json;

    use crate::reframe::QueryReframer;
    use crate::window::{ContextEntry, ContextWindow};

    fn window() -> ContextWindow {
        let mut window = ContextWindow::new(2);
        window.push(ContextEntry::new("Beds in Pune?", "120 beds.", "SELECT 120"));
        window.push(ContextEntry::new("Beds in Satara?", "12 beds.", "SELECT 12"));
        window
    }

    fn reframer(llm: Arc<ScriptedLlm>) -> QueryReframer {
        QueryReframer::new(llm, LlmSettings::new("gpt-4o", "db system message"))
    }

    #[tokio::test]
    async fn test_classify_parses_labels_leniently() {
        let llm = Arc::new(ScriptedLlm::sequence([
            json!({"question_type": "follow_up"}),
            json!({"question_type": "Clarification"}),
            json!({"question_type": "New question"}),
        ]));
        let reframer = reframer(llm);

        let mut kinds = Vec::new();
        for _ in 0..3 {
            kinds.push(reframer.classify("and ICU beds?", &window()).await.unwrap().value);
        }
        assert_eq!(
            kinds,
            vec![QueryType::FollowUp, QueryType::Clarification, QueryType::NewQuestion]
        );
    }

    #[tokio::test]
    async fn test_unknown_label_is_fatal() {
        let llm = Arc::new(ScriptedLlm::sequence([json!({"question_type": "rant"})]));
        let err = reframer(llm).classify("q", &window()).await.unwrap_err();
        assert!(matches!(err, AskDbError::InvalidField { field, .. } if field == "question_type"));
    }

    #[tokio::test]
    async fn test_reframe_uses_its_own_system_message_and_recent_first_history() {
        let llm = Arc::new(ScriptedLlm::sequence([
            json!({"reframed_query": "How many ICU beds are in Satara?"}),
        ]));
        let output = reframer(llm.clone())
            .reframe("and ICU beds there?", &window())
            .await
            .unwrap();

        assert_eq!(output.value, "How many ICU beds are in Satara?");
        let request = &llm.requests()[0];
        assert_eq!(request.system_message, REFRAME_SYSTEM_MESSAGE);
        assert!(request.prompt.find("Satara").unwrap() < request.prompt.find("Pune").unwrap());
    }

    #[tokio::test]
    async fn test_answer_from_history_asks_for_language() {
        let llm = Arc::new(ScriptedLlm::sequence([json!({"answer": "बारा बेड."})]).with_cost(0.2));
        let output = reframer(llm)
            .answer_from_history("what was that number?", &window(), "Marathi", "Devanagari")
            .await
            .unwrap();

        assert_eq!(output.value, "बारा बेड.");
        assert_eq!(output.cost, 0.2);
        assert!(output.prompt.contains("Marathi"));
    }
}
