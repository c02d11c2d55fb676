//! Requests accepted from the API layer
//!
//! Requests are validated as a whole before anything is built, so a rejected
//! request never leaves a half-constructed proposition or a partially
//! appended evidence list behind.

use crate::error::RequestError;
use crate::model::{
    criterion_key, instruction_template, ChannelId, Criterion, Evidence, JudgingModel,
    ParticipantId, Proposition, PropositionId,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Request to open a new proposition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePropositionRequest {
    pub statement: String,
    pub criteria: Vec<CriterionSpec>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub proposer: Option<ParticipantId>,
}

/// One requested outcome label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionSpec {
    pub value: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
}

impl CriterionSpec {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            description: None,
            instruction: None,
        }
    }

    pub fn described(value: &str, description: &str) -> Self {
        Self {
            value: value.to_string(),
            description: Some(description.to_string()),
            instruction: None,
        }
    }
}

impl CreatePropositionRequest {
    pub fn new(statement: &str, criteria: &[&str]) -> Self {
        Self {
            statement: statement.to_string(),
            criteria: criteria.iter().map(|v| CriterionSpec::new(v)).collect(),
            category: None,
            proposer: None,
        }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.statement.trim().is_empty() {
            return Err(RequestError::EmptyStatement);
        }
        if self.criteria.is_empty() {
            return Err(RequestError::NoCriteria);
        }

        let mut seen: HashMap<String, &str> = HashMap::new();
        for (index, spec) in self.criteria.iter().enumerate() {
            let value = spec.value.trim();
            if value.is_empty() {
                return Err(RequestError::BlankCriterion { index });
            }
            if let Some(existing) = seen.insert(criterion_key(value), value) {
                return Err(RequestError::DuplicateCriterion {
                    value: value.to_string(),
                    existing: existing.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Validate and build a proposition with zero scores and no evidence.
    ///
    /// Both ends of the validity window are set to the creation instant.
    pub fn into_proposition(
        self,
        judging_models: Vec<JudgingModel>,
    ) -> Result<Proposition, RequestError> {
        self.validate()?;

        let criteria: Vec<Criterion> = self
            .criteria
            .into_iter()
            .map(|spec| Criterion {
                value: spec.value.trim().to_string(),
                description: spec.description.unwrap_or_default(),
                instruction: spec.instruction,
                score: 0.0,
            })
            .collect();

        let statement = self.statement.trim().to_string();
        let now = Utc::now();

        Ok(Proposition {
            id: Uuid::new_v4(),
            proposer: self.proposer,
            instruction: instruction_template(&statement, &criteria),
            statement,
            category: self.category,
            criteria,
            starts_at: now,
            ends_at: now,
            judging_models,
            evidence: Vec::new(),
            winning_criterion: None,
        })
    }
}

/// One evidence item submitted for attachment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSubmission {
    pub text: String,
    pub participant: ParticipantId,
    pub channel: ChannelId,
    #[serde(default)]
    pub confidence_level: Option<f64>,
    #[serde(default)]
    pub truthfulness_level: Option<f64>,
    #[serde(default)]
    pub supportive_information: Option<f64>,
}

impl EvidenceSubmission {
    pub fn new(text: &str, participant: &str, channel: &str) -> Self {
        Self {
            text: text.to_string(),
            participant: participant.to_string(),
            channel: channel.to_string(),
            confidence_level: None,
            truthfulness_level: None,
            supportive_information: None,
        }
    }

    fn validate(&self, index: usize) -> Result<(), RequestError> {
        if self.text.trim().is_empty() {
            return Err(RequestError::BlankEvidence { index });
        }
        let scalars = [
            ("confidence_level", self.confidence_level),
            ("truthfulness_level", self.truthfulness_level),
            ("supportive_information", self.supportive_information),
        ];
        for (field, value) in scalars {
            if let Some(value) = value {
                if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                    return Err(RequestError::ScalarOutOfRange {
                        index,
                        field,
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    fn into_evidence(self, proposition_id: PropositionId) -> Evidence {
        Evidence {
            id: Uuid::new_v4(),
            proposition_id,
            text: self.text,
            participant: self.participant,
            channel: self.channel,
            winning_criterion: None,
            confidence_level: self.confidence_level,
            truthfulness_level: self.truthfulness_level,
            supportive_information: self.supportive_information,
        }
    }
}

impl Proposition {
    /// Append evidence items, all or nothing. Nothing is classified here.
    pub fn attach_evidence(
        &mut self,
        items: Vec<EvidenceSubmission>,
    ) -> Result<Vec<crate::model::EvidenceId>, RequestError> {
        for (index, item) in items.iter().enumerate() {
            item.validate(index)?;
        }

        let proposition_id = self.id;
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let evidence = item.into_evidence(proposition_id);
            ids.push(evidence.id);
            self.evidence.push(evidence);
        }
        Ok(ids)
    }
}
