//! Grading-bot prompts. The bot answers `{"score": 0 | 1, "reason": ...}`.

use askdb_core::AskDbError;
use serde_json::json;

use crate::{vars, PromptTemplate};

pub const GRADING_BOT_SYSTEM_MESSAGE: &str = r#"You are a grading bot. You will evaluate
messages against given criteria. Give a grade of 1 if the message satisfies the criteria
and 0 if it does not.

Respond only in this JSON format:
{"score": your grade, "reason": reason for your grading}"#;

const RELEVANCY: &str = r#"
Here is the message to evaluate
---- Message Begins ----
Question: {{question}}
Answer: {{response}}
---- Message Ends ----

---- Evaluation Criteria ----
Does "Answer" address the key elements of "Question"?
"#;

const ACCURACY: &str = r#"
Here is the message to evaluate
---- Message Begins ----
Correct Answer: {{correct_answer}}
Answer: {{response}}
---- Message Ends ----

---- Evaluation Criteria ----
Is "Answer" similar in meaning to "Correct Answer"?
They only need to agree in general meaning, not in wording.
"#;

const INSTRUCTIONS: &str = r#"
Here is the message to evaluate
---- Message Begins ----
Question: {{question}}
Instructions: {{instructions}}
Answer: {{response}}
---- Message Ends ----

---- Evaluation Criteria ----
Given "Question", does "Answer" follow "Instructions"?
"#;

pub fn relevancy_prompt(question: &str, response: &str) -> Result<String, AskDbError> {
    PromptTemplate::new(RELEVANCY).render_strict(&vars([
        ("question", json!(question)),
        ("response", json!(response)),
    ]))
}

pub fn accuracy_prompt(correct_answer: &str, response: &str) -> Result<String, AskDbError> {
    PromptTemplate::new(ACCURACY).render_strict(&vars([
        ("correct_answer", json!(correct_answer)),
        ("response", json!(response)),
    ]))
}

pub fn instructions_prompt(
    question: &str,
    instructions: &str,
    response: &str,
) -> Result<String, AskDbError> {
    PromptTemplate::new(INSTRUCTIONS).render_strict(&vars([
        ("question", json!(question)),
        ("instructions", json!(instructions)),
        ("response", json!(response)),
    ]))
}
