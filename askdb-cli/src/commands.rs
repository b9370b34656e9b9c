use std::path::Path;

use anyhow::{Context, Result};
use askdb_core::{LlmSettings, Query, Value};
use askdb_eval::{run_batch, EvalCase, QueryEvaluator};
use askdb_pipeline::DatabaseDescriptor;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use crate::App;

pub async fn ask(app: &App, question: String, metadata: Option<String>) -> Result<()> {
    let metadata = match metadata {
        Some(raw) => serde_json::from_str(&raw).context("--metadata must be valid JSON")?,
        None => Value::Null,
    };
    let query = Query::new(question).with_metadata(metadata);

    let processor = app.processor()?;
    let mut session = processor.new_session(app.db.clone());
    let result = processor.process_query(&query, &mut session).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub async fn chat(app: &App) -> Result<()> {
    let processor = app.processor()?;
    let mut session = processor.new_session(app.db.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }

        match processor.process_query(&Query::new(question), &mut session).await {
            Ok(result) => {
                stdout
                    .write_all(format!("{}\n", result.text_response).as_bytes())
                    .await?;
                info!(
                    outcome = ?result.outcome,
                    sql = %result.sql_query,
                    cost = result.total_cost,
                    "turn finished"
                );
            }
            Err(error) => {
                stdout.write_all(format!("error: {error}\n").as_bytes()).await?;
            }
        }
    }
    Ok(())
}

pub async fn describe(app: &App, questions: usize) -> Result<()> {
    let config = &app.config;
    let settings = LlmSettings::new(config.llm.clone(), config.system_message.clone())
        .with_temperature(config.temperature)
        .with_api_key(config.api_key.clone());
    let descriptor = DatabaseDescriptor::new(app.llm.clone(), app.tools.clone(), settings)
        .with_question_count(questions);

    let description = descriptor
        .generate_db_description(
            app.db.as_ref(),
            &config.db_id,
            &config.system_message,
            &config.table_description,
            &config.column_description,
        )
        .await?;
    let suggested = descriptor
        .generate_suggested_questions(
            app.db.as_ref(),
            &config.db_id,
            &config.system_message,
            &config.table_description,
            &config.column_description,
        )
        .await?;

    let output = serde_json::json!({
        "db_description": description,
        "suggested_questions": suggested,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub async fn eval(app: &App, cases: &Path, grader: String, max_in_flight: usize) -> Result<()> {
    let raw = tokio::fs::read_to_string(cases)
        .await
        .with_context(|| format!("reading {}", cases.display()))?;
    let cases: Vec<EvalCase> =
        serde_json::from_str(&raw).context("cases file must be a JSON list of cases")?;

    let processor = app.processor()?;
    let evaluator =
        QueryEvaluator::new(app.llm.clone(), grader).with_api_key(app.config.api_key.clone());
    let outcomes = run_batch(
        &processor,
        app.db.clone(),
        Some(&evaluator),
        cases,
        max_in_flight,
    )
    .await;

    println!("{}", serde_json::to_string_pretty(&outcomes)?);
    Ok(())
}
