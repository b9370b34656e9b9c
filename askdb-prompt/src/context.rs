//! Prompts that read the conversation so far.
//!
//! `chat_history` arguments are pre-rendered text, most recent turn first.

use askdb_core::{AskDbError, Query};
use serde_json::json;

use crate::{vars, PromptTemplate};

pub const REFRAME_SYSTEM_MESSAGE: &str = "You are a highly-skilled linguist. Use the chat \
history to infer the context needed to understand what the user is asking for in the \
current question.";

const CONVERSATION_SUMMARY: &str = r#"
===== Question =====
<<< {{query_text}} >>>

===== Metadata =====
Metadata that came with the question (may be empty):
<<< {{query_metadata}} >>>

===== Chat history (most recent first) =====
<<< {{chat_history}} >>>

===== Instruction =====
Summarise the conversation so far in a few sentences, keeping every number,
place and time period that could matter for the current question.

If the chat history already answers the current question completely, also
write that answer in {{language}}, in the {{script}} script. Otherwise leave
it empty.

===== Answer Format =====
A JSON object with key "conversation_summary" (the summary) and key
"final_answer" (the answer, or an empty string).
"#;

const CLASSIFY: &str = r#"
===== Question =====
<<< {{query_text}} >>>

===== Chat history (most recent first) =====
<<< {{chat_history}} >>>

===== Instruction =====
Classify the question relative to the chat history:
- "new_question": it can be understood and answered without the history.
- "follow_up": it builds on an earlier answer and needs new data, for
  example "and what about last year?".
- "clarification": it asks about an answer already given, for example
  "what does that number mean?", and can be answered from the history.

===== Answer Format =====
A JSON object with key "question_type" equal to one of "new_question",
"follow_up" or "clarification".
"#;

const REFRAME: &str = r#"
===== Question =====
<<< {{query_text}} >>>

===== Chat history (most recent first) =====
Here is the chat history (may be empty):
<<< {{chat_history}} >>>

===== Reframe question =====
Is the question clear and unambiguous on its own?
If yes, leave it as is.
If not, rewrite it using information from the chat history.
Remember:
- Keep the question as close to the original as possible.
- Recent turns matter more than older ones.
- Words such as "these", "here" or "it" refer to places or things in the
  chat history.

===== Answer Format =====
A JSON object with key "reframed_query".
"#;

const ANSWER_FROM_HISTORY: &str = r#"
A user asked for clarification about an earlier answer.

===== Question =====
<<< {{query_text}} >>>

===== Chat history (most recent first) =====
Earlier questions, the SQL used to answer them and the answers given:
<<< {{chat_history}} >>>

===== Instruction =====
Answer the question using only the chat history. Do not invent new numbers.
Answer in {{language}}, written in the {{script}} script.

===== Answer Format =====
A JSON object with exactly one key "answer".
"#;

/// `language` and `script` are the user's, so an answer taken straight from
/// the history reads the same as any other answer.
pub fn conversation_summary_prompt(
    query: &Query,
    chat_history: &str,
    language: &str,
    script: &str,
) -> Result<String, AskDbError> {
    PromptTemplate::new(CONVERSATION_SUMMARY).render_strict(&vars([
        ("query_text", json!(query.query_text)),
        ("query_metadata", json!(query.metadata_text())),
        ("chat_history", json!(chat_history)),
        ("language", json!(language)),
        ("script", json!(script)),
    ]))
}

pub fn classify_prompt(query_text: &str, chat_history: &str) -> Result<String, AskDbError> {
    PromptTemplate::new(CLASSIFY).render_strict(&vars([
        ("query_text", json!(query_text)),
        ("chat_history", json!(chat_history)),
    ]))
}

pub fn reframe_prompt(query_text: &str, chat_history: &str) -> Result<String, AskDbError> {
    PromptTemplate::new(REFRAME).render_strict(&vars([
        ("query_text", json!(query_text)),
        ("chat_history", json!(chat_history)),
    ]))
}

pub fn answer_from_history_prompt(
    query_text: &str,
    chat_history: &str,
    language: &str,
    script: &str,
) -> Result<String, AskDbError> {
    PromptTemplate::new(ANSWER_FROM_HISTORY).render_strict(&vars([
        ("query_text", json!(query_text)),
        ("chat_history", json!(chat_history)),
        ("language", json!(language)),
        ("script", json!(script)),
    ]))
}
