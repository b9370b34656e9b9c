use std::sync::Arc;

use askdb_core::{PipelineResult, Query};
use askdb_pipeline::QueryProcessor;
use askdb_sql::SqlDatabase;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{EvalReport, GroundTruth, QueryEvaluator, ResponseToEvaluate};

pub const DEFAULT_MAX_IN_FLIGHT: usize = 20;

/// One question to run, with what it should have produced.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct EvalCase {
    pub id: String,
    pub query: Query,
    #[serde(default)]
    pub groundtruth: GroundTruth,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "status", content = "error")]
pub enum RequestStatus {
    Ok,
    Failed(String),
}

#[derive(Clone, Debug, Serialize)]
pub struct CaseOutcome {
    pub id: String,
    pub request_status: RequestStatus,
    pub result: Option<PipelineResult>,
    pub report: Option<EvalReport>,
}

/// Runs every case through `processor`, at most `max_in_flight` at once.
///
/// Each case gets a fresh session on `db`, so cases never see each other's
/// history. A failing case is recorded in its `request_status` and does not
/// stop the batch. Outcomes come back in case order.
pub async fn run_batch(
    processor: &QueryProcessor,
    db: Arc<dyn SqlDatabase>,
    evaluator: Option<&QueryEvaluator>,
    cases: Vec<EvalCase>,
    max_in_flight: usize,
) -> Vec<CaseOutcome> {
    let total = cases.len();
    let mut outcomes: Vec<(usize, CaseOutcome)> = stream::iter(cases.into_iter().enumerate())
        .map(|(index, case)| {
            let db = db.clone();
            async move { (index, run_case(processor, db, evaluator, case).await) }
        })
        .buffer_unordered(max_in_flight.max(1))
        .collect()
        .await;
    outcomes.sort_by_key(|(index, _)| *index);

    let failed = outcomes
        .iter()
        .filter(|(_, outcome)| outcome.request_status != RequestStatus::Ok)
        .count();
    info!(total, failed, "batch finished");
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

async fn run_case(
    processor: &QueryProcessor,
    db: Arc<dyn SqlDatabase>,
    evaluator: Option<&QueryEvaluator>,
    case: EvalCase,
) -> CaseOutcome {
    let mut session = processor.new_session(db);
    let result = match processor.process_query(&case.query, &mut session).await {
        Ok(result) => result,
        Err(error) => {
            warn!(case = %case.id, %error, "case failed");
            return CaseOutcome {
                id: case.id,
                request_status: RequestStatus::Failed(error.to_string()),
                result: None,
                report: None,
            };
        }
    };

    let Some(evaluator) = evaluator else {
        return CaseOutcome {
            id: case.id,
            request_status: RequestStatus::Ok,
            result: Some(result),
            report: None,
        };
    };

    let response = ResponseToEvaluate::from(&result);
    match evaluator.evaluate(&case.groundtruth, &response).await {
        Ok(report) => CaseOutcome {
            id: case.id,
            request_status: RequestStatus::Ok,
            result: Some(result),
            report: Some(report),
        },
        Err(error) => {
            warn!(case = %case.id, %error, "evaluation failed");
            CaseOutcome {
                id: case.id,
                request_status: RequestStatus::Failed(format!("evaluation: {error}")),
                result: Some(result),
                report: None,
            }
        }
    }
}
