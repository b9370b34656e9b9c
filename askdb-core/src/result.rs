use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    CostLedger, GuardrailCheck, GuardrailStatusMap, Query, QueryType, Stage, TableColumns, Value,
};

/// How a pipeline run ended.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "check")]
pub enum Outcome {
    #[default]
    Pending,
    /// Full SQL path: tables, columns, SQL, execution, final answer.
    Answered,
    /// The conversation summary already contained the answer.
    AnsweredFromSummary,
    /// A clarification answered from chat history alone.
    AnsweredFromHistory,
    Rejected(GuardrailCheck),
}

/// Everything one `process_query` call produced.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PipelineResult {
    pub query: Query,
    pub text_response: String,
    pub query_language: String,
    pub query_script: String,
    pub eng_translation: String,
    /// Self-contained rewrite of a follow-up or clarification.
    pub updated_query_text: String,
    pub question_type: Option<QueryType>,
    pub best_tables: Vec<String>,
    pub best_columns: TableColumns,
    pub relevant_schemas: String,
    pub sql_query: String,
    pub sql_result: Option<Value>,
    pub prompts: BTreeMap<Stage, String>,
    pub processing_cost: f64,
    pub guardrails_cost: f64,
    pub total_cost: f64,
    pub guardrails_status: GuardrailStatusMap,
    pub conversation_summary: String,
    pub timings: BTreeMap<Stage, f64>,
    pub model_used: String,
    pub guardrails_model: String,
    pub outcome: Outcome,
}

impl PipelineResult {
    pub fn new(query: Query, checks: &[GuardrailCheck]) -> Self {
        Self {
            query,
            guardrails_status: GuardrailStatusMap::new(checks),
            ..Self::default()
        }
    }

    pub fn record_prompt(&mut self, stage: Stage, prompt: impl Into<String>) {
        self.prompts.insert(stage, prompt.into());
    }

    /// Copies the ledger's costs and timings into the result.
    pub fn settle(&mut self, ledger: &CostLedger) {
        self.processing_cost = ledger.processing();
        self.guardrails_cost = ledger.guardrails();
        self.total_cost = ledger.total();
        self.timings = ledger.timings_secs();
    }
}
