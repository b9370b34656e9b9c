//! Grading of pipeline answers against ground truth, one case or many.

pub mod batch;
pub mod eval_test;
pub mod evaluator;

pub use batch::{run_batch, CaseOutcome, EvalCase, RequestStatus, DEFAULT_MAX_IN_FLIGHT};
pub use eval_test::EvalTest;
pub use evaluator::{
    AccuracyReport, EvalReport, Grade, GroundTruth, QueryEvaluator, ResponseToEvaluate,
};
