//! Policy checks that can end a pipeline run before any SQL is written.
//!
//! Every check is one JSON-mode round trip with the guardrails model at
//! temperature 0. The model answers with a `"True"`/`"False"` string flag
//! and, on rejection, a `"response"` addressed to the user in their own
//! language. Any other flag value is an error, never an implicit rejection.

use std::sync::Arc;

use askdb_core::{
    ApiKey, AskDbError, CostLedger, GuardrailCheck, GuardrailStatus, GuardrailStatusMap, JsonLlm,
    LlmSettings, Stage, StageTimer,
};
use askdb_prompt::guardrails::{
    code_check_prompt, consistency_prompt, relevance_prompt, safety_prompt,
    GUARDRAILS_SYSTEM_MESSAGE,
};
use tracing::{debug, info};

/// Result of one check.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckOutcome {
    pub check: GuardrailCheck,
    pub status: GuardrailStatus,
    /// User-facing message; set exactly when the check failed.
    pub response: Option<String>,
    pub prompt: String,
    pub cost: f64,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.status == GuardrailStatus::Passed
    }
}

/// Which answer key a check reads and what `"True"` means for it.
struct FlagSpec {
    check: GuardrailCheck,
    stage: Stage,
    field: &'static str,
    true_passes: bool,
}

const CODE: FlagSpec = FlagSpec {
    check: GuardrailCheck::ContainsCode,
    stage: Stage::CodeCheck,
    field: "contains_code",
    true_passes: false,
};
const SAFETY: FlagSpec = FlagSpec {
    check: GuardrailCheck::Safety,
    stage: Stage::SafetyCheck,
    field: "safe",
    true_passes: true,
};
const CONSISTENCY: FlagSpec = FlagSpec {
    check: GuardrailCheck::Consistency,
    stage: Stage::ConsistencyCheck,
    field: "consistent",
    true_passes: true,
};
const RELEVANCE: FlagSpec = FlagSpec {
    check: GuardrailCheck::Relevance,
    stage: Stage::RelevanceCheck,
    field: "relevant",
    true_passes: true,
};

pub struct GuardrailEngine {
    llm: Arc<dyn JsonLlm>,
    settings: LlmSettings,
}

impl GuardrailEngine {
    pub fn new(llm: Arc<dyn JsonLlm>, model: impl Into<String>) -> Self {
        Self::with_settings(
            llm,
            LlmSettings::new(model, GUARDRAILS_SYSTEM_MESSAGE).with_temperature(0.0),
        )
    }

    pub fn with_settings(llm: Arc<dyn JsonLlm>, settings: LlmSettings) -> Self {
        Self { llm, settings }
    }

    pub fn with_api_key(mut self, api_key: Option<ApiKey>) -> Self {
        self.settings = self.settings.with_api_key(api_key);
        self
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Rejects queries that contain SQL or other code. Runs on the raw text
    /// before language detection, so the prompt asks the model to reply in
    /// the query's own language.
    pub async fn check_code(
        &self,
        query_text: &str,
        status: &mut GuardrailStatusMap,
        ledger: &mut CostLedger,
    ) -> Result<CheckOutcome, AskDbError> {
        let prompt = code_check_prompt(query_text)?;
        self.run(&CODE, prompt, status, ledger).await
    }

    /// Prompt injection, SQL injection, PII and data-modification requests.
    pub async fn check_safety(
        &self,
        query_text: &str,
        language: &str,
        script: &str,
        context: &str,
        status: &mut GuardrailStatusMap,
        ledger: &mut CostLedger,
    ) -> Result<CheckOutcome, AskDbError> {
        let prompt = safety_prompt(query_text, language, script, context)?;
        self.run(&SAFETY, prompt, status, ledger).await
    }

    /// A follow-up must not contradict or hijack the conversation so far.
    pub async fn check_consistency(
        &self,
        query_text: &str,
        language: &str,
        script: &str,
        chat_history: &str,
        status: &mut GuardrailStatusMap,
        ledger: &mut CostLedger,
    ) -> Result<CheckOutcome, AskDbError> {
        let prompt = consistency_prompt(query_text, language, script, chat_history)?;
        self.run(&CONSISTENCY, prompt, status, ledger).await
    }

    /// Anything even partially related to the database passes; only
    /// entirely unrelated questions are rejected.
    pub async fn check_relevance(
        &self,
        query_text: &str,
        language: &str,
        script: &str,
        table_description: &str,
        context: &str,
        status: &mut GuardrailStatusMap,
        ledger: &mut CostLedger,
    ) -> Result<CheckOutcome, AskDbError> {
        let prompt = relevance_prompt(query_text, language, script, table_description, context)?;
        self.run(&RELEVANCE, prompt, status, ledger).await
    }

    async fn run(
        &self,
        spec: &FlagSpec,
        prompt: String,
        status: &mut GuardrailStatusMap,
        ledger: &mut CostLedger,
    ) -> Result<CheckOutcome, AskDbError> {
        if !status.is_configured(spec.check) {
            return Err(AskDbError::GuardrailNotConfigured { check: spec.check });
        }

        let timer = StageTimer::start(spec.stage);
        let response = self.llm.ask_json(self.settings.request(prompt.clone())).await;
        let elapsed = timer.finish(ledger);
        let response = response?;
        ledger.add_guardrails(response.cost);

        let fields = response.fields(spec.stage.as_str());
        let passed = fields.flag(spec.field)? == spec.true_passes;
        let message = if passed {
            None
        } else {
            Some(fields.text("response")?)
        };
        let recorded = status.record(spec.check, passed)?;

        if passed {
            debug!(check = %spec.check, ?elapsed, "guardrail passed");
        } else {
            info!(check = %spec.check, status = %recorded, "guardrail rejected query");
        }

        Ok(CheckOutcome {
            check: spec.check,
            status: recorded,
            response: message,
            prompt,
            cost: response.cost,
        })
    }
}
