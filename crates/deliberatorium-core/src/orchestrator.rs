//! Deliberation orchestrator: create, attach, assess
//!
//! An assessment runs in three strictly separated phases:
//!
//! 1. **Fan-out**: one tokio task per evidence item, each rendering its
//!    prompt and calling the classifier (optionally bounded by a semaphore)
//! 2. **Join**: wait for every task, whatever its outcome; failed or
//!    panicked tasks become [`Classification::Unavailable`]
//! 3. **Aggregate**: apply labels and recompute scores on a staged copy,
//!    then commit it in a single assignment
//!
//! Tasks never write to the proposition. Labels are applied after the join,
//! so there is exactly one writer per phase and no locking.

use crate::aggregation::round_share;
use crate::classifier::{classify_evidence, Classification, Classifier, UnavailableReason};
use crate::config::DeliberationConfig;
use crate::error::DeliberationError;
use crate::model::{Criterion, EvidenceId, Proposition, PropositionId};
use crate::request::{CreatePropositionRequest, EvidenceSubmission};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

// ============================================================================
// Events for Observability
// ============================================================================

/// Events emitted while deliberating
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeliberationEvent {
    PropositionCreated {
        proposition_id: PropositionId,
        criteria: usize,
    },
    EvidenceAttached {
        proposition_id: PropositionId,
        count: usize,
    },
    EvidenceClassified {
        proposition_id: PropositionId,
        evidence_id: EvidenceId,
        label: String,
    },
    ClassificationUnavailable {
        proposition_id: PropositionId,
        evidence_id: EvidenceId,
        reason: String,
    },
    Assessed {
        proposition_id: PropositionId,
        total_classified: usize,
        winning_criterion: String,
    },
    AssessmentFailed {
        proposition_id: PropositionId,
        fault: String,
    },
}

/// Callback for deliberation events
pub type DeliberationEventHandler = Box<dyn Fn(DeliberationEvent) + Send + Sync>;

/// Summary of one `assess` call
#[derive(Debug, Clone)]
pub struct AssessmentReport {
    /// Classification calls dispatched (one per evidence item)
    pub dispatched: usize,
    /// Items labelled in this pass
    pub labelled: usize,
    /// Items left without a new label in this pass, with the reason
    pub unavailable: Vec<(EvidenceId, UnavailableReason)>,
    /// Evidence carrying a winning criterion after aggregation, including
    /// labels kept from earlier passes
    pub total_classified: usize,
    pub winning_criterion: Criterion,
}

impl AssessmentReport {
    /// Share of dispatched items that got a label in this pass
    pub fn coverage(&self) -> f64 {
        round_share(self.labelled, self.dispatched)
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Deliberatorium {
    classifier: Arc<dyn Classifier>,
    config: DeliberationConfig,
    event_handlers: Vec<DeliberationEventHandler>,
}

impl Deliberatorium {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self::with_config(classifier, DeliberationConfig::default())
    }

    pub fn with_config(classifier: Arc<dyn Classifier>, config: DeliberationConfig) -> Self {
        Self {
            classifier,
            config,
            event_handlers: Vec::new(),
        }
    }

    pub fn config(&self) -> &DeliberationConfig {
        &self.config
    }

    /// Add an event handler
    pub fn on_event(&mut self, handler: DeliberationEventHandler) {
        self.event_handlers.push(handler);
    }

    fn emit(&self, event: DeliberationEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Open a proposition judged by this orchestrator's classifier
    pub fn create(
        &self,
        request: CreatePropositionRequest,
    ) -> Result<Proposition, DeliberationError> {
        let proposition = request.into_proposition(vec![self.classifier.model_info()])?;

        info!(
            proposition = %proposition.id,
            criteria = proposition.criteria().len(),
            "proposition created"
        );
        self.emit(DeliberationEvent::PropositionCreated {
            proposition_id: proposition.id,
            criteria: proposition.criteria().len(),
        });
        Ok(proposition)
    }

    /// Append evidence without classifying it
    pub fn attach_evidence(
        &self,
        proposition: &mut Proposition,
        items: Vec<EvidenceSubmission>,
    ) -> Result<Vec<EvidenceId>, DeliberationError> {
        let ids = proposition.attach_evidence(items)?;

        debug!(proposition = %proposition.id, count = ids.len(), "evidence attached");
        self.emit(DeliberationEvent::EvidenceAttached {
            proposition_id: proposition.id,
            count: ids.len(),
        });
        Ok(ids)
    }

    /// Classify every evidence item concurrently, then aggregate once.
    ///
    /// On an aggregation fault the proposition is left exactly as it was,
    /// including labels produced during this call.
    pub async fn assess(
        &self,
        proposition: &mut Proposition,
    ) -> Result<AssessmentReport, DeliberationError> {
        let proposition_id = proposition.id;
        let outcomes = self.classify_all(proposition).await;
        let dispatched = outcomes.len();

        let mut staged = proposition.clone();
        let mut labelled = 0;
        let mut unavailable = Vec::new();

        for (evidence_id, outcome) in outcomes {
            match outcome {
                Classification::Labelled(label) => {
                    if staged.record_classification(evidence_id, &label) {
                        labelled += 1;
                        self.emit(DeliberationEvent::EvidenceClassified {
                            proposition_id,
                            evidence_id,
                            label,
                        });
                    } else {
                        let reason = UnavailableReason::AmbiguousResponse { response: label };
                        self.note_unavailable(proposition_id, evidence_id, &reason);
                        unavailable.push((evidence_id, reason));
                    }
                }
                Classification::Unavailable(reason) => {
                    self.note_unavailable(proposition_id, evidence_id, &reason);
                    unavailable.push((evidence_id, reason));
                }
            }
        }

        let winning_criterion = match staged.aggregate() {
            Ok(winner) => winner,
            Err(fault) => {
                self.emit(DeliberationEvent::AssessmentFailed {
                    proposition_id,
                    fault: fault.to_string(),
                });
                return Err(fault.into());
            }
        };

        let total_classified = staged.classified_count();
        *proposition = staged;

        info!(
            proposition = %proposition_id,
            dispatched,
            labelled,
            unavailable = unavailable.len(),
            winner = %winning_criterion.value,
            "proposition assessed"
        );
        self.emit(DeliberationEvent::Assessed {
            proposition_id,
            total_classified,
            winning_criterion: winning_criterion.value.clone(),
        });

        Ok(AssessmentReport {
            dispatched,
            labelled,
            unavailable,
            total_classified,
            winning_criterion,
        })
    }

    /// Fan out one task per evidence item and join them all.
    async fn classify_all(&self, proposition: &Proposition) -> Vec<(EvidenceId, Classification)> {
        let criteria: Arc<[Criterion]> = Arc::from(proposition.criteria());
        let instruction: Arc<str> = Arc::from(proposition.instruction.as_str());
        let limiter = match self.config.max_concurrent_classifications {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };

        let (ids, handles): (Vec<_>, Vec<_>) = proposition
            .evidence()
            .iter()
            .map(|item| {
                let classifier = Arc::clone(&self.classifier);
                let criteria = Arc::clone(&criteria);
                let instruction = Arc::clone(&instruction);
                let limiter = limiter.clone();
                let text = item.text.clone();

                let handle = tokio::spawn(async move {
                    let _permit = match limiter {
                        Some(limiter) => match limiter.acquire_owned().await {
                            Ok(permit) => Some(permit),
                            Err(_) => {
                                return Classification::Unavailable(UnavailableReason::TaskFailed(
                                    "concurrency limiter closed".to_string(),
                                ))
                            }
                        },
                        None => None,
                    };
                    classify_evidence(classifier.as_ref(), &instruction, &criteria, &text).await
                });
                (item.id, handle)
            })
            .unzip();

        ids.into_iter()
            .zip(join_all(handles).await)
            .map(|(evidence_id, joined)| {
                let outcome = joined.unwrap_or_else(|err| {
                    Classification::Unavailable(UnavailableReason::TaskFailed(err.to_string()))
                });
                (evidence_id, outcome)
            })
            .collect()
    }

    fn note_unavailable(
        &self,
        proposition_id: PropositionId,
        evidence_id: EvidenceId,
        reason: &UnavailableReason,
    ) {
        warn!(
            proposition = %proposition_id,
            evidence = %evidence_id,
            %reason,
            "classification unavailable"
        );
        self.emit(DeliberationEvent::ClassificationUnavailable {
            proposition_id,
            evidence_id,
            reason: reason.to_string(),
        });
    }
}
