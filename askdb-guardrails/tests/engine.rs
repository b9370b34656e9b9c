use std::sync::Arc;

use askdb_core::testing::ScriptedLlm;
use askdb_core::{AskDbError, CostLedger, GuardrailCheck, GuardrailStatus, GuardrailStatusMap, Stage};
use askdb_guardrails::GuardrailEngine;
use serde_json::json;

fn single_turn() -> GuardrailStatusMap {
    GuardrailStatusMap::new(&GuardrailCheck::SINGLE_TURN)
}

#[tokio::test]
async fn code_is_rejected_with_the_model_message() {
    let llm = Arc::new(
        ScriptedLlm::sequence([json!({
            "contains_code": "True",
            "response": "Code is not allowed in questions."
        })])
        .with_cost(0.003),
    );
    let engine = GuardrailEngine::new(llm.clone(), "gpt-4o-mini");
    let mut status = single_turn();
    let mut ledger = CostLedger::new();

    let outcome = engine
        .check_code("DROP TABLE patients;", &mut status, &mut ledger)
        .await
        .unwrap();

    assert!(!outcome.passed());
    assert_eq!(outcome.response.as_deref(), Some("Code is not allowed in questions."));
    assert_eq!(status.get(GuardrailCheck::ContainsCode), Some(GuardrailStatus::ContainsCode));
    assert_eq!(status.get(GuardrailCheck::Safety), Some(GuardrailStatus::NotRun));
    assert_eq!(ledger.guardrails(), 0.003);
    assert_eq!(ledger.processing(), 0.0);
    assert!(ledger.timing(Stage::CodeCheck).is_some());

    let request = &llm.requests()[0];
    assert_eq!(request.temperature, 0.0);
    assert_eq!(request.model, "gpt-4o-mini");
    assert!(request.prompt.contains("DROP TABLE patients;"));
}

#[tokio::test]
async fn passing_checks_need_no_response() {
    let llm = Arc::new(ScriptedLlm::sequence([
        json!({"contains_code": "False"}),
        json!({"safe": "True"}),
        json!({"relevant": "True"}),
    ]));
    let engine = GuardrailEngine::new(llm, "gpt-4o-mini");
    let mut status = single_turn();
    let mut ledger = CostLedger::new();

    let q = "How many beds are in the hospital?";
    assert!(engine.check_code(q, &mut status, &mut ledger).await.unwrap().passed());
    assert!(engine
        .check_safety(q, "English", "Latin", "", &mut status, &mut ledger)
        .await
        .unwrap()
        .passed());
    let relevance = engine
        .check_relevance(q, "English", "Latin", "hospital beds", "", &mut status, &mut ledger)
        .await
        .unwrap();

    assert!(relevance.passed());
    assert_eq!(relevance.response, None);
    assert!(status.all_passed());
    assert!((ledger.guardrails() - 0.03).abs() < 1e-12);
}

#[tokio::test]
async fn irrelevant_query_is_rejected_in_the_users_language() {
    let llm = Arc::new(ScriptedLlm::sequence([json!({
        "relevant": "False",
        "response": "मैं केवल अस्पताल के आंकड़ों के बारे में बता सकता हूँ।"
    })]));
    let engine = GuardrailEngine::new(llm.clone(), "gpt-4o-mini");
    let mut status = single_turn();
    let mut ledger = CostLedger::new();

    let outcome = engine
        .check_relevance("क्रिकेट स्कोर?", "Hindi", "Devanagari", "hospital beds", "", &mut status, &mut ledger)
        .await
        .unwrap();

    assert_eq!(outcome.status, GuardrailStatus::Irrelevant);
    assert!(llm.requests()[0].prompt.contains("Hindi"));
}

#[tokio::test]
async fn boolean_flags_are_rejected_as_malformed() {
    let llm = Arc::new(ScriptedLlm::sequence([json!({"safe": true})]));
    let engine = GuardrailEngine::new(llm, "gpt-4o-mini");
    let mut status = single_turn();
    let mut ledger = CostLedger::new();

    let err = engine
        .check_safety("q", "English", "Latin", "", &mut status, &mut ledger)
        .await
        .unwrap_err();

    assert!(matches!(err, AskDbError::InvalidFlag { field, .. } if field == "safe"));
    assert_eq!(status.get(GuardrailCheck::Safety), Some(GuardrailStatus::NotRun));
}

#[tokio::test]
async fn rejection_without_response_is_fatal() {
    let llm = Arc::new(ScriptedLlm::sequence([json!({"safe": "False"})]));
    let engine = GuardrailEngine::new(llm, "gpt-4o-mini");
    let mut status = single_turn();
    let mut ledger = CostLedger::new();

    let err = engine
        .check_safety("q", "English", "Latin", "", &mut status, &mut ledger)
        .await
        .unwrap_err();
    assert!(matches!(err, AskDbError::MissingField { field, .. } if field == "response"));
}

#[tokio::test]
async fn consistency_requires_a_multi_turn_status_map() {
    let llm = Arc::new(ScriptedLlm::sequence([json!({"consistent": "True"})]));
    let engine = GuardrailEngine::new(llm.clone(), "gpt-4o-mini");
    let mut ledger = CostLedger::new();

    let mut single = single_turn();
    let err = engine
        .check_consistency("q", "English", "Latin", "", &mut single, &mut ledger)
        .await
        .unwrap_err();
    assert!(matches!(err, AskDbError::GuardrailNotConfigured { .. }));
    assert_eq!(llm.calls(), 0);

    let mut multi = GuardrailStatusMap::new(&GuardrailCheck::MULTI_TURN);
    let outcome = engine
        .check_consistency("and ICU?", "English", "Latin", "Q: beds\nA: 120", &mut multi, &mut ledger)
        .await
        .unwrap();
    assert!(outcome.passed());
}

#[tokio::test]
async fn a_check_resolves_once_per_turn() {
    let llm = Arc::new(ScriptedLlm::sequence([
        json!({"contains_code": "False"}),
        json!({"contains_code": "False"}),
    ]));
    let engine = GuardrailEngine::new(llm, "gpt-4o-mini");
    let mut status = single_turn();
    let mut ledger = CostLedger::new();

    engine.check_code("q", &mut status, &mut ledger).await.unwrap();
    let err = engine.check_code("q", &mut status, &mut ledger).await.unwrap_err();
    assert!(matches!(err, AskDbError::GuardrailAlreadyResolved { .. }));
}
