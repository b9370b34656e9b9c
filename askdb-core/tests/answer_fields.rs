use askdb_core::{AskDbError, LlmJsonResponse};
use serde_json::json;

fn response(answer: serde_json::Value) -> LlmJsonResponse {
    LlmJsonResponse::new(answer, 0.01)
}

#[test]
fn flag_accepts_only_literal_true_and_false_strings() {
    let resp = response(json!({"safe": "True", "relevant": "False"}));
    let fields = resp.fields("safety");

    assert!(fields.flag("safe").unwrap());
    assert!(!fields.flag("relevant").unwrap());
}

#[test]
fn flag_rejects_native_booleans_and_other_spellings() {
    for value in [json!(true), json!("true"), json!("yes"), json!(1)] {
        let resp = response(json!({ "safe": value }));
        let err = resp.fields("safety").flag("safe").unwrap_err();
        assert!(
            matches!(err, AskDbError::InvalidFlag { ref field, .. } if field == "safe"),
            "unexpected error {err:?}"
        );
    }
}

#[test]
fn missing_field_names_stage_and_field() {
    let resp = response(json!({"language": "English"}));
    let err = resp.fields("detect_language").text("script").unwrap_err();

    match err {
        AskDbError::MissingField { stage, field } => {
            assert_eq!(stage, "detect_language");
            assert_eq!(field, "script");
        }
        other => panic!("expected MissingField, got {other:?}"),
    }
}

#[test]
fn text_renders_numbers_and_treats_null_as_missing() {
    let resp = response(json!({"answer": 42, "sql": null}));
    let fields = resp.fields("final_answer");

    assert_eq!(fields.text("answer").unwrap(), "42");
    assert!(matches!(
        fields.text("sql"),
        Err(AskDbError::MissingField { .. })
    ));
    assert_eq!(fields.optional_text("sql").unwrap(), None);
    assert_eq!(fields.optional_text("absent").unwrap(), None);
}

#[test]
fn table_columns_reads_whole_answer() {
    let resp = response(json!({
        "beds": ["hospital_id", "bed_count"],
        "hospitals": ["name"]
    }));
    let columns = resp.fields("best_columns").table_columns().unwrap();

    assert_eq!(columns.len(), 2);
    assert_eq!(columns["beds"], vec!["hospital_id", "bed_count"]);
}

#[test]
fn table_columns_rejects_non_list_values() {
    let resp = response(json!({"beds": "bed_count"}));
    let err = resp.fields("best_columns").table_columns().unwrap_err();
    assert!(matches!(err, AskDbError::InvalidField { .. }));
}

#[test]
fn string_list_requires_text_items() {
    let ok = response(json!({"response_sources": ["beds", "hospitals"]}));
    assert_eq!(
        ok.fields("best_tables").string_list("response_sources").unwrap(),
        vec!["beds", "hospitals"]
    );

    let bad = response(json!({"response_sources": [1, 2]}));
    assert!(bad
        .fields("best_tables")
        .string_list("response_sources")
        .is_err());
}

#[test]
fn non_object_answer_is_invalid() {
    let resp = response(json!("just text"));
    assert!(matches!(
        resp.fields("translate").text("query_text"),
        Err(AskDbError::InvalidField { .. })
    ));
}

#[test]
fn settings_build_requests_with_their_model_and_temperature() {
    let settings = askdb_core::LlmSettings::new("gpt-4o", "You answer from a database.")
        .with_temperature(0.0)
        .with_api_key(Some("tenant".into()));
    let request = settings.request("How many beds?");

    assert_eq!(request.model, "gpt-4o");
    assert_eq!(request.system_message, "You answer from a database.");
    assert_eq!(request.temperature, 0.0);
    assert_eq!(request.api_key.as_ref().map(|key| key.expose()), Some("tenant"));
    assert!(!format!("{request:?}").contains("tenant"));
    assert_eq!(request.context_message, None);
}

#[test]
fn optional_value_passes_structured_answers_through() {
    let resp = response(json!({"query_metadata": {"district": "Pune"}, "empty": null}));
    let fields = resp.fields("translate");

    assert_eq!(
        fields.optional_value("query_metadata").unwrap(),
        Some(&json!({"district": "Pune"}))
    );
    assert_eq!(fields.optional_value("empty").unwrap(), None);
    assert_eq!(fields.optional_value("absent").unwrap(), None);
}
