//! Per-run cost and wall-clock accounting.
//!
//! A [`CostLedger`] is created at the start of every pipeline run and never
//! outlives it. Model costs are split into processing stages and guardrail
//! stages; durations are recorded per stage for observability only.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CodeCheck,
    DetectLanguage,
    Translate,
    ClassifyQuestion,
    Reframe,
    ConversationSummary,
    SafetyCheck,
    ConsistencyCheck,
    RelevanceCheck,
    AnswerFromHistory,
    BestTables,
    BestColumns,
    SqlSynthesis,
    ExecuteSql,
    FinalAnswer,
    UpdateContext,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CodeCheck => "code_check",
            Stage::DetectLanguage => "detect_language",
            Stage::Translate => "translate",
            Stage::ClassifyQuestion => "classify_question",
            Stage::Reframe => "reframe",
            Stage::ConversationSummary => "conversation_summary",
            Stage::SafetyCheck => "safety_check",
            Stage::ConsistencyCheck => "consistency_check",
            Stage::RelevanceCheck => "relevance_check",
            Stage::AnswerFromHistory => "answer_from_history",
            Stage::BestTables => "best_tables",
            Stage::BestColumns => "best_columns",
            Stage::SqlSynthesis => "sql_synthesis",
            Stage::ExecuteSql => "execute_sql",
            Stage::FinalAnswer => "final_answer",
            Stage::UpdateContext => "update_context",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct CostLedger {
    processing: f64,
    guardrails: f64,
    timings: BTreeMap<Stage, Duration>,
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_processing(&mut self, cost: f64) {
        self.processing += cost;
    }

    pub fn add_guardrails(&mut self, cost: f64) {
        self.guardrails += cost;
    }

    pub fn processing(&self) -> f64 {
        self.processing
    }

    pub fn guardrails(&self) -> f64 {
        self.guardrails
    }

    pub fn total(&self) -> f64 {
        self.processing + self.guardrails
    }

    /// A stage that runs twice in one turn accumulates.
    pub fn record_timing(&mut self, stage: Stage, elapsed: Duration) {
        *self.timings.entry(stage).or_default() += elapsed;
    }

    pub fn timing(&self, stage: Stage) -> Option<Duration> {
        self.timings.get(&stage).copied()
    }

    pub fn timings_secs(&self) -> BTreeMap<Stage, f64> {
        self.timings
            .iter()
            .map(|(stage, elapsed)| (*stage, elapsed.as_secs_f64()))
            .collect()
    }

    /// Awaits `future` and records its wall-clock duration under `stage`.
    pub async fn timed<F, T>(&mut self, stage: Stage, future: F) -> T
    where
        F: Future<Output = T>,
    {
        let timer = StageTimer::start(stage);
        let output = future.await;
        timer.finish(self);
        output
    }
}

/// Measures one stage when the timed work itself needs the ledger.
#[derive(Debug)]
#[must_use = "a timer records nothing until finished"]
pub struct StageTimer {
    stage: Stage,
    started: Instant,
}

impl StageTimer {
    pub fn start(stage: Stage) -> Self {
        Self {
            stage,
            started: Instant::now(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn finish(self, ledger: &mut CostLedger) -> Duration {
        let elapsed = self.started.elapsed();
        ledger.record_timing(self.stage, elapsed);
        elapsed
    }
}
