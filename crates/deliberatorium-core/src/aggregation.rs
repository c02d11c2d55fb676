//! Score aggregation over classified evidence
//!
//! ```text
//!  criteria ──► index by case-folded value ──┐
//!                                            ├──► instances per criterion
//!  evidence ──► winning criterion (if any) ──┘            │
//!                                                         ▼
//!                      score = round₂(instances / total_classified)
//!                                                         │
//!                      leftmost maximum ◄─────────────────┘
//! ```
//!
//! [`tally`] is pure: it reads criteria and evidence and produces a
//! [`Tally`] without touching either. [`Proposition::aggregate`] commits a
//! tally in one step, so a fault leaves the proposition exactly as it was.
//!
//! ## Rounding
//!
//! Scores are rounded half-up to hundredths using integer arithmetic on the
//! counts: `hundredths = (200·n + t) / (2·t)`. `1/8` becomes `0.13`, `2/3`
//! becomes `0.67`, and no binary floating-point residue can tip a tie.

use crate::error::AggregationFault;
use crate::model::{Criterion, Evidence, Proposition};
use std::collections::HashMap;

/// Outcome of one aggregation pass, not yet applied
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    /// Evidence items carrying a winning criterion
    pub total_classified: usize,
    /// Instances per criterion, parallel to `criteria`
    pub instances: Vec<usize>,
    /// Criteria with recomputed scores, original order
    pub criteria: Vec<Criterion>,
    /// Index of the winning criterion in `criteria`
    pub winner: usize,
    /// Per evidence item, the index of its criterion in `criteria`
    assignments: Vec<Option<usize>>,
}

impl Tally {
    pub fn winning_criterion(&self) -> &Criterion {
        &self.criteria[self.winner]
    }

    /// Score for a label, case-insensitively
    pub fn score_of(&self, label: &str) -> Option<f64> {
        self.criteria
            .iter()
            .find(|c| c.matches(label))
            .map(|c| c.score)
    }
}

/// Share of `instances` in `total`, rounded half-up to two decimals.
/// A zero total yields `0.0`.
pub fn round_share(instances: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let hundredths = (200 * instances + total) / (2 * total);
    hundredths as f64 / 100.0
}

/// Index of the first criterion holding the maximum score.
///
/// A later criterion only takes over when its score is strictly greater.
pub fn leftmost_max(criteria: &[Criterion]) -> Option<usize> {
    criteria
        .iter()
        .enumerate()
        .fold(None, |best, (i, c)| match best {
            Some(b) if criteria[b].score >= c.score => Some(b),
            _ => Some(i),
        })
}

fn index_criteria(criteria: &[Criterion]) -> Result<HashMap<String, usize>, AggregationFault> {
    let mut index = HashMap::with_capacity(criteria.len());
    for (i, criterion) in criteria.iter().enumerate() {
        if let Some(previous) = index.insert(criterion.key(), i) {
            return Err(AggregationFault::DuplicateCriterion {
                value: criterion.value.clone(),
                existing: criteria[previous].value.clone(),
            });
        }
    }
    Ok(index)
}

/// Recompute scores and the winner from the current criteria and evidence.
pub fn tally(criteria: &[Criterion], evidence: &[Evidence]) -> Result<Tally, AggregationFault> {
    if criteria.is_empty() {
        return Err(AggregationFault::NoCriteria);
    }
    let index = index_criteria(criteria)?;

    let mut instances = vec![0usize; criteria.len()];
    let mut assignments = Vec::with_capacity(evidence.len());
    for item in evidence {
        let slot = match item.winning_criterion() {
            None => None,
            Some(label) => {
                let i = *index.get(&label.key()).ok_or_else(|| {
                    AggregationFault::ForeignCriterion {
                        evidence_id: item.id,
                        value: label.value.clone(),
                    }
                })?;
                instances[i] += 1;
                Some(i)
            }
        };
        assignments.push(slot);
    }

    let total_classified: usize = instances.iter().sum();

    let updated: Vec<Criterion> = criteria
        .iter()
        .zip(&instances)
        .map(|(criterion, &n)| Criterion {
            score: round_share(n, total_classified),
            ..criterion.clone()
        })
        .collect();

    let winner = leftmost_max(&updated).ok_or(AggregationFault::NoCriteria)?;

    Ok(Tally {
        total_classified,
        instances,
        criteria: updated,
        winner,
        assignments,
    })
}

impl Proposition {
    /// Recompute every score, re-canonicalize evidence labels and select the
    /// winning criterion. All or nothing.
    pub fn aggregate(&mut self) -> Result<Criterion, AggregationFault> {
        let tally = tally(&self.criteria, &self.evidence).map_err(|fault| {
            tracing::warn!(proposition = %self.id, %fault, "aggregation rejected");
            fault
        })?;

        tracing::debug!(
            proposition = %self.id,
            total_classified = tally.total_classified,
            winner = %tally.winning_criterion().value,
            "aggregated evidence"
        );

        Ok(self.apply_tally(tally))
    }

    fn apply_tally(&mut self, tally: Tally) -> Criterion {
        let Tally {
            criteria,
            winner,
            assignments,
            ..
        } = tally;

        for (item, slot) in self.evidence.iter_mut().zip(assignments) {
            item.winning_criterion = slot.map(|i| criteria[i].clone());
        }

        let winning = criteria[winner].clone();
        self.criteria = criteria;
        self.winning_criterion = Some(winning.clone());
        winning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{CreatePropositionRequest, EvidenceSubmission};

    fn scored(value: &str, score: f64) -> Criterion {
        Criterion {
            score,
            ..Criterion::new(value, "")
        }
    }

    fn labelled(criteria: &[&str], labels: &[Option<&str>]) -> Proposition {
        let mut proposition = CreatePropositionRequest::new("Will it ship on time?", criteria)
            .into_proposition(vec![])
            .unwrap();
        let ids = proposition
            .attach_evidence(
                labels
                    .iter()
                    .enumerate()
                    .map(|(i, _)| EvidenceSubmission::new(&format!("opinion {i}"), "p", "forum"))
                    .collect(),
            )
            .unwrap();
        for (id, label) in ids.into_iter().zip(labels) {
            if let Some(label) = label {
                assert!(proposition.record_classification(id, label));
            }
        }
        proposition
    }

    #[test]
    fn test_round_share_half_up() {
        assert_eq!(round_share(2, 3), 0.67);
        assert_eq!(round_share(1, 3), 0.33);
        assert_eq!(round_share(1, 8), 0.13);
        assert_eq!(round_share(1, 200), 0.01);
        assert_eq!(round_share(1, 201), 0.0);
        assert_eq!(round_share(5, 5), 1.0);
        assert_eq!(round_share(0, 0), 0.0);
    }

    #[test]
    fn test_leftmost_max_prefers_first_on_tie() {
        let criteria = vec![scored("a", 0.5), scored("b", 0.5)];
        assert_eq!(leftmost_max(&criteria), Some(0));

        let criteria = vec![scored("a", 0.2), scored("b", 0.4), scored("c", 0.4)];
        assert_eq!(leftmost_max(&criteria), Some(1));

        assert_eq!(leftmost_max(&[]), None);
    }

    #[test]
    fn test_tally_counts_only_classified() {
        let proposition = labelled(&["yes", "no"], &[Some("yes"), Some("YES"), Some("no"), None]);
        let tally = tally(proposition.criteria(), proposition.evidence()).unwrap();

        assert_eq!(tally.total_classified, 3);
        assert_eq!(tally.instances, vec![2, 1]);
        assert_eq!(tally.score_of("yes"), Some(0.67));
        assert_eq!(tally.score_of("No"), Some(0.33));
        assert_eq!(tally.winning_criterion().value, "yes");
    }

    #[test]
    fn test_foreign_label_faults_without_mutation() {
        let mut proposition = labelled(&["yes", "no"], &[Some("yes"), Some("no")]);
        proposition.aggregate().unwrap();
        proposition.evidence[1].winning_criterion = Some(Criterion::new("maybe", ""));
        let before = proposition.clone();

        let fault = proposition.aggregate().unwrap_err();

        assert!(matches!(fault, AggregationFault::ForeignCriterion { ref value, .. } if value == "maybe"));
        assert_eq!(proposition, before);
    }

    #[test]
    fn test_duplicate_criteria_fault() {
        let mut proposition = labelled(&["yes", "no"], &[Some("yes")]);
        proposition.criteria.push(Criterion::new("Yes", ""));
        let before = proposition.clone();

        assert_eq!(
            proposition.aggregate().unwrap_err(),
            AggregationFault::DuplicateCriterion {
                value: "Yes".to_string(),
                existing: "yes".to_string(),
            }
        );
        assert_eq!(proposition, before);
    }

    #[test]
    fn test_no_criteria_fault() {
        let mut proposition = labelled(&["yes"], &[]);
        proposition.criteria.clear();
        assert_eq!(proposition.aggregate().unwrap_err(), AggregationFault::NoCriteria);
    }
}
