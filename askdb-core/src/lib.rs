mod answer;
mod error;
mod guardrail;
pub mod ledger;
mod llm;
mod query;
mod result;
#[cfg(feature = "testing")]
pub mod testing;

pub use answer::{AnswerFields, TableColumns};
pub use error::AskDbError;
pub use guardrail::{GuardrailCheck, GuardrailStatus, GuardrailStatusMap};
pub use ledger::{CostLedger, Stage, StageTimer};
pub use llm::{ApiKey, JsonLlm, LlmJsonRequest, LlmJsonResponse, LlmOutput, LlmSettings};
pub use query::{Query, QueryType};
pub use result::{Outcome, PipelineResult};

pub type Value = serde_json::Value;
