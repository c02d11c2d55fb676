//! Deliberatorium Core: evidence classification and confidence aggregation
//!
//! A proposition ("Ethereum above $2,600 on October 4?") is judged against a
//! fixed set of mutually exclusive criteria ("yes", "no"). Free-text evidence
//! is attached, each item is classified by an external text classifier, and
//! the labels are aggregated into a score per criterion and a winner.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │                         DELIBERATION PIPELINE                          │
//! ├────────────────────────────────────────────────────────────────────────┤
//! │                                                                        │
//! │  CreatePropositionRequest ──► create ──► Proposition (no evidence)     │
//! │                                              │                         │
//! │  [EvidenceSubmission] ──────► attach ────────┤                         │
//! │                                              ▼                         │
//! │                                  ┌───────── assess ─────────┐          │
//! │                                  │                          │          │
//! │                          ┌───────▼──────┐  ×N       ┌───────┴───────┐  │
//! │                          │  Classifier  │ ────────► │  join (all    │  │
//! │                          │  (LLM, fake) │ concurrent│  settle)      │  │
//! │                          └──────────────┘           └───────┬───────┘  │
//! │                                                             ▼          │
//! │                                                   ┌─────────────────┐  │
//! │                                                   │   Aggregation   │  │
//! │                                                   │ scores + winner │  │
//! │                                                   └─────────────────┘  │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - A failed classification only affects its own evidence item
//! - Aggregation runs once, after every classification has settled
//! - Aggregation is all-or-nothing: a fault leaves the proposition untouched
//! - Ties go to the criterion listed first

pub mod aggregation;
pub mod classifier;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod request;

pub use aggregation::{leftmost_max, round_share, tally, Tally};
pub use classifier::{
    classify_evidence, Classification, Classifier, ClassifierError, ScriptedClassifier,
    ScriptedReply, UnavailableReason,
};
pub use config::{ConfigError, DeliberationConfig};
pub use error::{AggregationFault, DeliberationError, RequestError};
pub use model::{
    criterion_key, Channel, ChannelId, Criterion, Evidence, EvidenceId, JudgingModel, Participant,
    ParticipantId, Proposition, PropositionId, EVIDENCE_PLACEHOLDER,
};
pub use orchestrator::{
    AssessmentReport, DeliberationEvent, DeliberationEventHandler, Deliberatorium,
};
pub use request::{CreatePropositionRequest, CriterionSpec, EvidenceSubmission};
