use askdb_core::AskDbError;
use serde_json::json;

use crate::{vars, PromptTemplate};

pub const DESCRIPTION_SYSTEM_MESSAGE: &str = "You are an expert in semantics and \
contextualization. Describe the information available in a database without quoting \
specific numbers. Be clear and concise, and use bullet points for easier reading.";

pub const SUGGESTED_QUESTIONS_SYSTEM_MESSAGE: &str = "You help people discover what they \
can ask a database. Suggest short, concrete questions a non-technical user would ask.";

const DESCRIPTION: &str = r#"
===== User input description =====
{{system_prompt}}

===== Database tables =====
{{tables_description}}

===== Database columns (may be empty) =====
{{column_description}}

===== Database schema =====
{{db_schema}}

===== Database Description =====
Based on the description, tables, columns and schema above, write a summary
answering:
What type of information is in the database?
What information is NOT in the database?

===== Answer Format =====
A JSON object with key "db_description".
"#;

const SUGGESTED_QUESTIONS: &str = r#"
===== User input description =====
{{system_prompt}}

===== Database tables =====
{{tables_description}}

===== Database columns (may be empty) =====
{{column_description}}

===== Database schema =====
{{db_schema}}

===== Suggested Questions =====
Suggest {{count}} questions a user could ask that this database can answer.
Each question must be answerable with a single SQL query and must not
mention table or column names.

===== Answer Format =====
A JSON object with key "suggested_questions" whose value is a list of
questions.
"#;

/// Shared inputs of both descriptor prompts.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorInput<'a> {
    pub system_prompt: &'a str,
    pub tables_description: &'a str,
    pub column_description: &'a str,
    pub db_schema: &'a str,
}

pub fn description_prompt(input: DescriptorInput<'_>) -> Result<String, AskDbError> {
    PromptTemplate::new(DESCRIPTION).render_strict(&vars([
        ("system_prompt", json!(input.system_prompt)),
        ("tables_description", json!(input.tables_description)),
        ("column_description", json!(input.column_description)),
        ("db_schema", json!(input.db_schema)),
    ]))
}

pub fn suggested_questions_prompt(
    input: DescriptorInput<'_>,
    count: usize,
) -> Result<String, AskDbError> {
    PromptTemplate::new(SUGGESTED_QUESTIONS).render_strict(&vars([
        ("system_prompt", json!(input.system_prompt)),
        ("tables_description", json!(input.tables_description)),
        ("column_description", json!(input.column_description)),
        ("db_schema", json!(input.db_schema)),
        ("count", json!(count)),
    ]))
}
