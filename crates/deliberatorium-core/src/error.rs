//! Error types surfaced to callers of the deliberation core
//!
//! Per-item classification failures never show up here: they are absorbed
//! into [`Classification::Unavailable`](crate::classifier::Classification).

use crate::model::EvidenceId;

/// Errors returned by the orchestrator
#[derive(Debug, thiserror::Error)]
pub enum DeliberationError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),
    #[error("aggregation fault: {0}")]
    Aggregation(#[from] AggregationFault),
}

/// A creation or attachment request that is structurally invalid
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("statement is empty")]
    EmptyStatement,
    #[error("at least one criterion is required")]
    NoCriteria,
    #[error("criterion #{index} has an empty value")]
    BlankCriterion { index: usize },
    #[error("criterion {value:?} duplicates {existing:?} (values are compared case-insensitively)")]
    DuplicateCriterion { value: String, existing: String },
    #[error("evidence #{index} has no text")]
    BlankEvidence { index: usize },
    #[error("evidence #{index}: {field} must be a finite number in [0, 1], got {value}")]
    ScalarOutOfRange {
        index: usize,
        field: &'static str,
        value: f64,
    },
}

/// An internal inconsistency that prevents score recomputation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregationFault {
    #[error("proposition has no criteria")]
    NoCriteria,
    #[error("criterion {value:?} collides with {existing:?} after case folding")]
    DuplicateCriterion { value: String, existing: String },
    #[error("evidence {evidence_id} is labelled {value:?}, which is not a criterion of this proposition")]
    ForeignCriterion {
        evidence_id: EvidenceId,
        value: String,
    },
}
