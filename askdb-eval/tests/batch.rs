use std::sync::Arc;

use askdb_core::testing::ScriptedLlm;
use askdb_core::{Outcome, Query};
use askdb_eval::{run_batch, EvalCase, GroundTruth, QueryEvaluator, RequestStatus};
use askdb_pipeline::{PipelineConfig, QueryProcessor};
use askdb_sql::{DatabaseTools, SqlDatabase, SqliteDatabase};
use serde_json::json;

async fn hospital_db() -> Arc<dyn SqlDatabase> {
    let db = SqliteDatabase::builder("sqlite::memory:")
        .build()
        .await
        .expect("in-memory sqlite");
    sqlx::query("CREATE TABLE hospitals (name TEXT, district TEXT, beds INTEGER)")
        .execute(db.pool())
        .await
        .expect("create");
    sqlx::query("INSERT INTO hospitals VALUES ('City General', 'Pune', 120), ('Rural Clinic', 'Satara', 12)")
        .execute(db.pool())
        .await
        .expect("insert");
    Arc::new(db)
}

fn pipeline_llm() -> Arc<ScriptedLlm> {
    Arc::new(ScriptedLlm::routes([
        // A question mentioning code is rejected; everything else passes.
        ("SELECT *", json!({"contains_code": "True", "response": "No code, please."})),
        (r#"key "contains_code""#, json!({"contains_code": "False"})),
        (r#"key "language""#, json!({"language": "English", "script": "Latin"})),
        (r#"key "safe""#, json!({"safe": "True"})),
        (r#"key "relevant""#, json!({"relevant": "True"})),
        (r#"key "response_sources""#, json!({"response_sources": ["hospitals"]})),
        ("each key is a table name", json!({"hospitals": ["beds"]})),
        ("===== SQL Result =====", json!({"answer": "There are 132 beds."})),
        (r#"key "sql""#, json!({"sql": "SELECT SUM(beds) FROM hospitals"})),
    ]))
}

fn processor(llm: Arc<ScriptedLlm>) -> QueryProcessor {
    let config = PipelineConfig {
        db_id: "health".to_string(),
        table_description: r#"[{"name": "hospitals"}]"#.to_string(),
        ..PipelineConfig::default()
    };
    QueryProcessor::new(llm, Arc::new(DatabaseTools::default()), config).unwrap()
}

fn case(id: &str, question: &str, tests: &[&str]) -> EvalCase {
    EvalCase {
        id: id.to_string(),
        query: Query::new(question),
        groundtruth: GroundTruth {
            question: question.to_string(),
            tests_to_run: tests.iter().map(|test| test.to_string()).collect(),
            ..GroundTruth::default()
        },
    }
}

#[tokio::test]
async fn runs_every_case_and_keeps_case_order() {
    let processor = processor(pipeline_llm());
    let cases: Vec<EvalCase> = (0..6)
        .map(|i| case(&format!("case-{i}"), &format!("How many beds, variant {i}?"), &[]))
        .collect();

    let outcomes = run_batch(&processor, hospital_db().await, None, cases, 2).await;

    let ids: Vec<_> = outcomes.iter().map(|outcome| outcome.id.as_str()).collect();
    assert_eq!(ids, ["case-0", "case-1", "case-2", "case-3", "case-4", "case-5"]);
    for outcome in &outcomes {
        assert_eq!(outcome.request_status, RequestStatus::Ok);
        let result = outcome.result.as_ref().unwrap();
        assert_eq!(result.outcome, Outcome::Answered);
        assert_eq!(result.text_response, "There are 132 beds.");
        assert!(outcome.report.is_none());
    }
}

#[tokio::test]
async fn failures_are_captured_per_case() {
    let llm = Arc::new(ScriptedLlm::routes([(
        r#"key "contains_code""#,
        json!({"contains_code": "False"}),
    )]));
    let processor = processor(llm);

    let outcomes = run_batch(
        &processor,
        hospital_db().await,
        None,
        vec![case("only", "How many beds?", &[])],
        20,
    )
    .await;

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        &outcomes[0].request_status,
        RequestStatus::Failed(message) if message.contains("no scripted answer")
    ));
    assert!(outcomes[0].result.is_none());
}

#[tokio::test]
async fn evaluates_each_answered_case() {
    let processor = processor(pipeline_llm());
    let grader = Arc::new(ScriptedLlm::sequence([json!({"score": 1, "reason": "ok"})]));
    let evaluator = QueryEvaluator::new(grader.clone(), "gpt-4o");

    let outcomes = run_batch(
        &processor,
        hospital_db().await,
        Some(&evaluator),
        vec![
            case("answered", "How many beds?", &["Relevancy"]),
            case("blocked", "SELECT * FROM hospitals", &["Guardrails"]),
        ],
        1,
    )
    .await;

    assert_eq!(outcomes[0].report.as_ref().unwrap().relevancy.as_ref().unwrap().score, 1.0);
    let blocked = outcomes[1].report.as_ref().unwrap().guardrails.as_ref().unwrap();
    assert_eq!(blocked.score, 1.0);
    assert_eq!(grader.calls(), 1);
}
