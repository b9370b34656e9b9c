use askdb_core::{AskDbError, Query};
use serde_json::json;

use crate::{vars, PromptTemplate};

pub const LANGUAGE_SYSTEM_MESSAGE: &str =
    "You are a highly-skilled linguist and polyglot. Identify the language of the user query.";

pub const TRANSLATION_SYSTEM_MESSAGE: &str =
    "You are a highly-skilled linguist and polyglot. Translate the user query into English.";

const DETECT_LANGUAGE: &str = r#"
What language is the question below written in, and in which script?

Examples:
1. "How many beds are there?" is language "English", script "Latin".
2. "vahaan kitane bistar hain?" is language "Hindi", script "Latin".
3. "वहाँ कितने बिस्तर हैं?" is language "Hindi", script "Devanagari".

===== Question =====
<<< {{query_text}} >>>

Work through the problem step by step.

Reply only with a JSON object with key "language" (the language) and
key "script" (the script).
"#;

const TRANSLATE: &str = r#"
A user asked the question below. Translate it into English.

===== Question =====
<<< {{query_text}} >>>

===== Metadata =====
Metadata that came with the question (may be empty):
<<< {{query_metadata}} >>>

===== Current language =====
<<< {{language}} >>>

===== Current script =====
<<< {{script}} >>>

Translate as accurately as possible, keeping names and numbers unchanged.

Reply only with a JSON object with key "query_text" (the question in
English) and key "query_metadata" (the metadata in English, or an empty
string if there is none).
"#;

pub fn detect_language_prompt(query_text: &str) -> Result<String, AskDbError> {
    PromptTemplate::new(DETECT_LANGUAGE).render_strict(&vars([("query_text", json!(query_text))]))
}

pub fn translation_prompt(query: &Query, language: &str, script: &str) -> Result<String, AskDbError> {
    PromptTemplate::new(TRANSLATE).render_strict(&vars([
        ("query_text", json!(query.query_text)),
        ("query_metadata", json!(query.metadata_text())),
        ("language", json!(language)),
        ("script", json!(script)),
    ]))
}
