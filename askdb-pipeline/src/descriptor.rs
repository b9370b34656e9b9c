use std::sync::Arc;
use std::time::Duration;

use askdb_core::{AskDbError, JsonLlm, LlmSettings};
use askdb_prompt::descriptor::{
    description_prompt, suggested_questions_prompt, DescriptorInput,
    DESCRIPTION_SYSTEM_MESSAGE, SUGGESTED_QUESTIONS_SYSTEM_MESSAGE,
};
use askdb_sql::{DatabaseTools, SqlDatabase};
use moka::future::Cache;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_QUESTION_COUNT: usize = 5;

const CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);
const CACHE_CAPACITY: u64 = 100;

#[derive(Deserialize)]
struct TableEntry {
    name: String,
}

/// Table names listed in a JSON table description (`[{"name": ...}, ...]`).
pub fn table_names(table_description: &str) -> Result<Vec<String>, AskDbError> {
    let entries: Vec<TableEntry> = serde_json::from_str(table_description).map_err(|error| {
        AskDbError::InvalidConfig(format!(
            "table description must be a JSON list of {{\"name\": ...}} objects: {error}"
        ))
    })?;
    Ok(entries.into_iter().map(|entry| entry.name).collect())
}

/// Human-facing descriptions of a database and questions worth asking it.
///
/// Both are generated once per `db_id` and kept for a day.
pub struct DatabaseDescriptor {
    llm: Arc<dyn JsonLlm>,
    tools: Arc<DatabaseTools>,
    settings: LlmSettings,
    question_count: usize,
    descriptions: Cache<String, String>,
    questions: Cache<String, Vec<String>>,
}

impl DatabaseDescriptor {
    pub fn new(llm: Arc<dyn JsonLlm>, tools: Arc<DatabaseTools>, settings: LlmSettings) -> Self {
        Self {
            llm,
            tools,
            settings,
            question_count: DEFAULT_QUESTION_COUNT,
            descriptions: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
            questions: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    pub fn with_question_count(mut self, count: usize) -> Self {
        self.question_count = count;
        self
    }

    pub async fn generate_db_description(
        &self,
        db: &dyn SqlDatabase,
        db_id: &str,
        system_message: &str,
        table_description: &str,
        column_description: &str,
    ) -> Result<String, AskDbError> {
        if let Some(hit) = self.descriptions.get(db_id).await {
            return Ok(hit);
        }

        let db_schema = self.schema(db, db_id, table_description).await?;
        let prompt = description_prompt(DescriptorInput {
            system_prompt: system_message,
            tables_description: table_description,
            column_description,
            db_schema: &db_schema,
        })?;
        let request = self
            .settings
            .clone()
            .with_system_message(DESCRIPTION_SYSTEM_MESSAGE)
            .request(prompt);
        let response = self.llm.ask_json(request).await?;
        let description = response.fields("db_description").text("db_description")?;
        debug!(db_id, chars = description.len(), "generated database description");

        self.descriptions
            .insert(db_id.to_string(), description.clone())
            .await;
        Ok(description)
    }

    pub async fn generate_suggested_questions(
        &self,
        db: &dyn SqlDatabase,
        db_id: &str,
        system_message: &str,
        table_description: &str,
        column_description: &str,
    ) -> Result<Vec<String>, AskDbError> {
        if let Some(hit) = self.questions.get(db_id).await {
            return Ok(hit);
        }

        let db_schema = self.schema(db, db_id, table_description).await?;
        let prompt = suggested_questions_prompt(
            DescriptorInput {
                system_prompt: system_message,
                tables_description: table_description,
                column_description,
                db_schema: &db_schema,
            },
            self.question_count,
        )?;
        let request = self
            .settings
            .clone()
            .with_system_message(SUGGESTED_QUESTIONS_SYSTEM_MESSAGE)
            .request(prompt);
        let response = self.llm.ask_json(request).await?;
        let questions = response
            .fields("suggested_questions")
            .string_list("suggested_questions")?;
        debug!(db_id, count = questions.len(), "generated suggested questions");

        self.questions
            .insert(db_id.to_string(), questions.clone())
            .await;
        Ok(questions)
    }

    async fn schema(
        &self,
        db: &dyn SqlDatabase,
        db_id: &str,
        table_description: &str,
    ) -> Result<String, AskDbError> {
        let tables = table_names(table_description)?;
        let schema = self.tools.get_tables_schema(db, &tables, db_id).await?;
        Ok(schema.render()?)
    }
}
