//! Classifier port: the single seam to the external text-classification service
//!
//! The core owns both ends of the exchange:
//!
//! 1. **Prompt construction**: the proposition's instruction template with
//!    the evidence text substituted for [`EVIDENCE_PLACEHOLDER`]
//! 2. **Response interpretation**: the raw reply, trimmed, compared
//!    case-insensitively against the criterion values
//!
//! Provider failures stop here. [`classify_evidence`] always yields a
//! [`Classification`], never an error, so one bad item cannot abort a batch.

pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;

use crate::model::{Criterion, JudgingModel, EVIDENCE_PLACEHOLDER};
use async_trait::async_trait;

pub use mock::{ScriptedClassifier, ScriptedReply};
#[cfg(feature = "openai")]
pub use openai::{OpenAiClassifier, OpenAiConfig};

// ============================================================================
// Provider Interface
// ============================================================================

/// External text-classification capability
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Send a fully rendered prompt, return the raw textual response
    async fn classify(&self, prompt: &str) -> Result<String, ClassifierError>;

    /// Descriptor recorded on propositions judged by this classifier
    fn model_info(&self) -> JudgingModel;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
}

// ============================================================================
// Classification Outcome
// ============================================================================

/// Result of classifying one evidence item
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Canonical value of the matched criterion
    Labelled(String),
    Unavailable(UnavailableReason),
}

impl Classification {
    pub fn label(&self) -> Option<&str> {
        match self {
            Classification::Labelled(value) => Some(value),
            Classification::Unavailable(_) => None,
        }
    }
}

/// Why no label could be produced
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnavailableReason {
    #[error("instruction template has no evidence placeholder")]
    MissingPlaceholder,
    #[error("classifier failed: {0}")]
    Provider(ClassifierError),
    #[error("response {response:?} matches no criterion")]
    NoMatchingCriterion { response: String },
    #[error("response {response:?} matches more than one criterion")]
    AmbiguousResponse { response: String },
    #[error("classification task failed: {0}")]
    TaskFailed(String),
}

// ============================================================================
// Classification Step
// ============================================================================

/// Substitute the evidence text into an instruction template.
///
/// Only the first placeholder is replaced. Returns `None` when the template
/// has no placeholder at all.
pub fn render_prompt(template: &str, text: &str) -> Option<String> {
    if !template.contains(EVIDENCE_PLACEHOLDER) {
        return None;
    }
    Some(template.replacen(EVIDENCE_PLACEHOLDER, text, 1))
}

/// Interpret a raw response against the criteria
pub fn interpret_response(criteria: &[Criterion], response: &str) -> Classification {
    let response = response.trim();
    let mut matching = criteria.iter().filter(|c| c.matches(response));

    match (matching.next(), matching.next()) {
        (Some(criterion), None) => Classification::Labelled(criterion.value.clone()),
        (Some(_), Some(_)) => Classification::Unavailable(UnavailableReason::AmbiguousResponse {
            response: response.to_string(),
        }),
        (None, _) => Classification::Unavailable(UnavailableReason::NoMatchingCriterion {
            response: response.to_string(),
        }),
    }
}

/// Classify a single evidence text: render, call, interpret.
pub async fn classify_evidence(
    classifier: &dyn Classifier,
    instruction: &str,
    criteria: &[Criterion],
    text: &str,
) -> Classification {
    let prompt = match render_prompt(instruction, text) {
        Some(prompt) => prompt,
        None => return Classification::Unavailable(UnavailableReason::MissingPlaceholder),
    };

    match classifier.classify(&prompt).await {
        Ok(response) => interpret_response(criteria, &response),
        Err(err) => Classification::Unavailable(UnavailableReason::Provider(err)),
    }
}
