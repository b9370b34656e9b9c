use askdb_core::{AskDbError, Query};
use serde_json::json;

use crate::{vars, PromptTemplate};

const BEST_TABLES: &str = r#"
===== Question =====
<<< {{query_text}} >>>

===== Metadata =====
Metadata that came with the question (may be empty):
<<< {{query_metadata}} >>>

===== Sources =====
Which of the following sources of information would you use to answer the
question? Select every source that is relevant:
{{table_description}}

===== Answer Format =====
A JSON object with key "response_sources" whose value is a list of table
names and nothing else.

===== Remember =====
The person asking does not know about internal codes or ids. Identify all
the information needed to answer them in plain names and numbers.
"#;

const BEST_COLUMNS: &str = r#"
The question below must be answered by analysing a database.

===== Question =====
<<< {{query_text}} >>>

===== Metadata =====
Metadata that came with the question (may be empty):
<<< {{query_metadata}} >>>

===== Relevant Tables =====
Schema and sample rows of the relevant tables:
<<< {{relevant_schemas}} >>>

===== Columns =====
Description of the columns (may be empty):
<<< {{columns_description}} >>>

===== Relevant Columns =====
Which columns should be used to answer the question? Prefer selecting too
many columns over too few; omissions are expensive.

===== Answer Format =====
A JSON object where each key is a table name and each value is a list of
column names from that table.
"#;

const SQL: &str = r#"
===== Question =====
<<< {{query_text}} >>>

===== Metadata =====
Metadata that came with the question (may be empty):
<<< {{query_metadata}} >>>

===== Relevant Tables =====
The query will run on a {{db_type}} database with this schema:
<<< {{relevant_schemas}} >>>

===== Columns =====
Description of the columns (may be empty):
<<< {{columns_description}} >>>

===== Most common values =====
The most common values of potentially relevant columns, at most
{{num_common_values}} per column. For the columns in this list the values
are exhaustive: {{indicator_vars}}
<<< {{common_values}} >>>

===== Instruction =====
Write one SQL query that answers the question. It must run on the schema
above on a {{db_type}} database. Use the question metadata to narrow the
query.

Add LIMIT 10 when the result would otherwise be unnecessarily large (100+
rows); otherwise make the query exhaustive. For "best" or "highest" style
questions, leave room for ties instead of LIMIT 1.

When combining ordered sub-results with UNION, wrap each ordered part in its
own sub-select, for example:
SELECT district_name, indicator_a FROM (
    SELECT district_name, indicator_a FROM table_name
    ORDER BY indicator_a DESC LIMIT 1
) AS top_districts
UNION ALL
SELECT district_name, indicator_a FROM (
    SELECT district_name, indicator_a FROM table_name
    ORDER BY indicator_a ASC LIMIT 1
) AS bottom_districts;

===== Answer Format =====
A JSON object with key "sql" whose value is the SQL query.
"#;

const FINAL_ANSWER: &str = r#"
A user asked the question below.

===== Question =====
<<< {{query_text}} >>>

===== Metadata =====
Metadata that came with the question (may be empty):
<<< {{query_metadata}} >>>

===== SQL =====
This SQL query was generated to answer it:
<<< {{sql_query}} >>>

===== SQL Result =====
The database returned:
<<< {{sql_result}} >>>

===== Instruction =====
Write the final response to the user. Make it as specific to them as
possible using the metadata. Use all of the result to answer accurately,
reproduce decimals and fractions exactly, and briefly explain how the
answer was obtained. If the SQL has a LIMIT clause, tell the user where it
matters. The user does not know SQL but roughly knows what data is
collected.

Answer in {{language}}, written in the {{script}} script, matching the
tone of the question.

===== Answer Format =====
A JSON object with exactly one key "answer".
"#;

pub fn best_tables_prompt(query: &Query, table_description: &str) -> Result<String, AskDbError> {
    PromptTemplate::new(BEST_TABLES).render_strict(&vars([
        ("query_text", json!(query.query_text)),
        ("query_metadata", json!(query.metadata_text())),
        ("table_description", json!(table_description)),
    ]))
}

pub fn best_columns_prompt(
    query: &Query,
    relevant_schemas: &str,
    columns_description: &str,
) -> Result<String, AskDbError> {
    PromptTemplate::new(BEST_COLUMNS).render_strict(&vars([
        ("query_text", json!(query.query_text)),
        ("query_metadata", json!(query.metadata_text())),
        ("relevant_schemas", json!(relevant_schemas)),
        ("columns_description", json!(columns_description)),
    ]))
}

/// Inputs of the SQL synthesis prompt.
#[derive(Debug, Clone, Copy)]
pub struct SqlPromptInput<'a> {
    pub query: &'a Query,
    pub db_type: &'a str,
    pub relevant_schemas: &'a str,
    pub common_values: &'a str,
    pub columns_description: &'a str,
    pub num_common_values: usize,
    pub indicator_vars: &'a [String],
}

pub fn sql_prompt(input: SqlPromptInput<'_>) -> Result<String, AskDbError> {
    PromptTemplate::new(SQL).render_strict(&vars([
        ("query_text", json!(input.query.query_text)),
        ("query_metadata", json!(input.query.metadata_text())),
        ("db_type", json!(input.db_type)),
        ("relevant_schemas", json!(input.relevant_schemas)),
        ("columns_description", json!(input.columns_description)),
        ("num_common_values", json!(input.num_common_values)),
        ("indicator_vars", json!(input.indicator_vars)),
        ("common_values", json!(input.common_values)),
    ]))
}

pub fn final_answer_prompt(
    query: &Query,
    sql_query: &str,
    sql_result: &str,
    language: &str,
    script: &str,
) -> Result<String, AskDbError> {
    PromptTemplate::new(FINAL_ANSWER).render_strict(&vars([
        ("query_text", json!(query.query_text)),
        ("query_metadata", json!(query.metadata_text())),
        ("sql_query", json!(sql_query)),
        ("sql_result", json!(sql_result)),
        ("language", json!(language)),
        ("script", json!(script)),
    ]))
}
