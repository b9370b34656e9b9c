//! Ask questions of a relational database in any language.
//!
//! This crate re-exports the askdb workspace behind feature flags:
//!
//! | feature  | crate        | default |
//! |----------|--------------|---------|
//! | `openai` | `askdb-llm`  | yes     |
//! | `sqlite` | `askdb-sql`  | yes     |
//! | `eval`   | `askdb-eval` | no      |
//!
//! The core types, prompts, context window, guardrails and the pipeline are
//! always available.

pub use askdb_core as core;
pub use askdb_guardrails as guardrails;
pub use askdb_memory as memory;
pub use askdb_pipeline as pipeline;
pub use askdb_prompt as prompt;

#[cfg(feature = "eval")]
pub use askdb_eval as eval;
#[cfg(feature = "openai")]
pub use askdb_llm as llm;
#[cfg(feature = "sqlite")]
pub use askdb_sql as sql;

pub mod prelude {
    pub use askdb_core::{
        AskDbError, GuardrailCheck, GuardrailStatus, JsonLlm, LlmJsonRequest, LlmJsonResponse,
        Outcome, PipelineResult, Query, QueryType,
    };
    pub use askdb_pipeline::{DatabaseDescriptor, PipelineConfig, PipelineMode, QueryProcessor, Session};

    #[cfg(feature = "eval")]
    pub use askdb_eval::{run_batch, EvalCase, EvalTest, QueryEvaluator};
    #[cfg(feature = "openai")]
    pub use askdb_llm::{CachedLlm, OpenAiCompatibleClient};
    #[cfg(feature = "sqlite")]
    pub use askdb_sql::{DatabaseTools, DatabaseToolsConfig, SqlDatabase, SqliteDatabase};
}
