//! Entity model: propositions, criteria, evidence and the parties around them
//!
//! A [`Proposition`] owns its criteria and its evidence. The derived parts of
//! its state (criterion scores, per-evidence winning criteria and the
//! proposition's winning criterion) are only written through two entry
//! points:
//!
//! 1. [`Proposition::record_classification`] (one evidence item at a time)
//! 2. [`Proposition::aggregate`](crate::aggregation) (full recomputation)
//!
//! Everything else is plain data and is serialized as-is for presentation
//! and persistence collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a proposition
pub type PropositionId = Uuid;

/// Unique identifier for an evidence item
pub type EvidenceId = Uuid;

/// Reference to a participant, owned by an external directory
pub type ParticipantId = String;

/// Reference to a source channel, owned by an external directory
pub type ChannelId = String;

/// Placeholder substituted with the evidence text when rendering a prompt.
pub const EVIDENCE_PLACEHOLDER: &str = "{{evidence.text}}";

/// Case-folded key used for every criterion comparison.
pub fn criterion_key(value: &str) -> String {
    value.to_lowercase()
}

// ============================================================================
// Parties
// ============================================================================

/// A contributor or proposer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
}

impl Participant {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// The medium an evidence item arrived through (e.g. a forum or a feed)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    /// eg. Reddit
    pub name: String,
    /// eg. r/swarmnetwork
    pub slug: String,
}

impl Channel {
    pub fn new(id: &str, name: &str, slug: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            slug: slug.to_string(),
        }
    }
}

/// Judging model declared on a proposition. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgingModel {
    /// eg. openai
    pub provider: String,
    /// eg. gpt-4o
    pub version: String,
}

impl JudgingModel {
    pub fn new(provider: &str, version: &str) -> Self {
        Self {
            provider: provider.to_string(),
            version: version.to_string(),
        }
    }
}

// ============================================================================
// Criterion
// ============================================================================

/// One mutually exclusive outcome label with a derived score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    /// Canonical label, compared case-insensitively (eg. "yes")
    pub value: String,
    /// What makes a piece of evidence lean towards this value
    #[serde(default)]
    pub description: String,
    /// Extra guidance for the classifier on how to read this value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    /// Share of classified evidence in [0, 1], rounded to hundredths
    #[serde(default)]
    pub(crate) score: f64,
}

impl Criterion {
    pub fn new(value: &str, description: &str) -> Self {
        Self {
            value: value.to_string(),
            description: description.to_string(),
            instruction: None,
            score: 0.0,
        }
    }

    pub fn with_instruction(mut self, instruction: &str) -> Self {
        self.instruction = Some(instruction.to_string());
        self
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Case-insensitive comparison against a label
    pub fn matches(&self, label: &str) -> bool {
        criterion_key(&self.value) == criterion_key(label)
    }

    pub(crate) fn key(&self) -> String {
        criterion_key(&self.value)
    }
}

// ============================================================================
// Evidence
// ============================================================================

/// One opinion contributed about a proposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: EvidenceId,
    /// Owning proposition
    pub proposition_id: PropositionId,
    /// eg. any opinion about why yes or no
    pub text: String,
    pub participant: ParticipantId,
    pub channel: ChannelId,
    /// Canonical criterion this item was classified as, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) winning_criterion: Option<Criterion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truthfulness_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supportive_information: Option<f64>,
}

impl Evidence {
    pub fn winning_criterion(&self) -> Option<&Criterion> {
        self.winning_criterion.as_ref()
    }

    pub fn is_classified(&self) -> bool {
        self.winning_criterion.is_some()
    }
}

// ============================================================================
// Proposition
// ============================================================================

/// The question or claim under deliberation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposition {
    pub id: PropositionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposer: Option<ParticipantId>,
    /// eg. Will something happen in the future?
    pub statement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Insertion order is display order and tie-break order
    pub(crate) criteria: Vec<Criterion>,
    /// Prompt template containing [`EVIDENCE_PLACEHOLDER`]
    pub instruction: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub judging_models: Vec<JudgingModel>,
    #[serde(default)]
    pub(crate) evidence: Vec<Evidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) winning_criterion: Option<Criterion>,
}

impl Proposition {
    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn evidence(&self) -> &[Evidence] {
        &self.evidence
    }

    pub fn winning_criterion(&self) -> Option<&Criterion> {
        self.winning_criterion.as_ref()
    }

    /// Look up a criterion by label, case-insensitively
    pub fn criterion(&self, label: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.matches(label))
    }

    pub fn evidence_item(&self, id: EvidenceId) -> Option<&Evidence> {
        self.evidence.iter().find(|e| e.id == id)
    }

    /// Number of evidence items carrying a winning criterion
    pub fn classified_count(&self) -> usize {
        self.evidence.iter().filter(|e| e.is_classified()).count()
    }

    /// Assign `label` to one evidence item.
    ///
    /// The label must match exactly one criterion (case-insensitively); the
    /// evidence then holds a copy of that canonical criterion. Returns
    /// `false` and leaves the item untouched otherwise.
    pub fn record_classification(&mut self, evidence_id: EvidenceId, label: &str) -> bool {
        let mut matching = self.criteria.iter().filter(|c| c.matches(label));
        let criterion = match (matching.next(), matching.next()) {
            (Some(c), None) => c.clone(),
            _ => return false,
        };

        match self.evidence.iter_mut().find(|e| e.id == evidence_id) {
            Some(item) => {
                item.winning_criterion = Some(criterion);
                true
            }
            None => false,
        }
    }

    /// Plain structured record for presentation and persistence
    pub fn snapshot(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Render the canonical instruction template for a statement and its criteria.
///
/// Every criterion value is quoted and listed as an allowed answer; criteria
/// with a description or instruction contribute a guidance line.
pub fn instruction_template(statement: &str, criteria: &[Criterion]) -> String {
    let options = criteria
        .iter()
        .map(|c| format!("\"{}\"", c.value))
        .collect::<Vec<_>>()
        .join(" or ");

    let guidance: Vec<String> = criteria
        .iter()
        .filter_map(|c| {
            let mut parts = Vec::new();
            if !c.description.trim().is_empty() {
                parts.push(c.description.trim());
            }
            if let Some(instruction) = c.instruction.as_deref().map(str::trim) {
                if !instruction.is_empty() {
                    parts.push(instruction);
                }
            }
            if parts.is_empty() {
                None
            } else {
                Some(format!("- \"{}\": {}", c.value, parts.join(" ")))
            }
        })
        .collect();

    let mut template = format!(
        "For the given question: {statement}\n\n\
         Determine if \"{EVIDENCE_PLACEHOLDER}\" leans more towards {options}.\n\n"
    );
    if !guidance.is_empty() {
        template.push_str("Guidance:\n");
        template.push_str(&guidance.join("\n"));
        template.push_str("\n\n");
    }
    template.push_str(&format!(
        "Respond strictly with {options} only. Avoid adding any symbols or characters other than literally {options}."
    ));
    template
}
