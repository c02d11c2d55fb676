//! Integration tests for the complete Deliberatorium pipeline
//!
//! These tests verify end-to-end functionality across the API surface:
//! - JSON requests → Proposition → snapshot file
//! - Snapshot reload → evidence → assessment → snapshot
//! - Several propositions assessed concurrently by one orchestrator
//!
//! Run with: cargo test --test integration_tests

use deliberatorium_core::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn write_snapshot(path: &Path, proposition: &Proposition) {
    let json = serde_json::to_string_pretty(&proposition.snapshot().unwrap()).unwrap();
    fs::write(path, json).unwrap();
}

fn read_snapshot(path: &Path) -> Proposition {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ============================================================================
// Wire Formats
// ============================================================================

#[test]
fn test_creation_request_from_json() {
    let request: CreatePropositionRequest = serde_json::from_str(
        r#"{
            "statement": "Ethereum above $2,600 on October 4?",
            "criteria": [
                { "value": "yes", "description": "Closes above $2,600" },
                { "value": "no", "instruction": "Includes closing exactly at $2,600" }
            ],
            "category": "Economic trends and business news"
        }"#,
    )
    .unwrap();

    let proposition = request
        .into_proposition(vec![JudgingModel::new("openai", "gpt-4o")])
        .unwrap();

    assert_eq!(proposition.criteria().len(), 2);
    assert_eq!(proposition.criteria()[0].description, "Closes above $2,600");
    assert!(proposition.proposer.is_none());
    assert!(proposition.instruction.contains(EVIDENCE_PLACEHOLDER));
    assert!(proposition.instruction.contains("Includes closing exactly at $2,600"));
}

#[test]
fn test_evidence_submissions_from_json() {
    let items: Vec<EvidenceSubmission> = serde_json::from_str(
        r#"[
            { "text": "Bullish", "participant": "u1", "channel": "reddit" },
            { "text": "Bearish", "participant": "u2", "channel": "twitter",
              "confidence_level": 0.8, "truthfulness_level": 0.4 }
        ]"#,
    )
    .unwrap();

    let mut proposition = CreatePropositionRequest::new("Q?", &["yes", "no"])
        .into_proposition(Vec::new())
        .unwrap();
    proposition.attach_evidence(items).unwrap();

    let second = &proposition.evidence()[1];
    assert_eq!(second.confidence_level, Some(0.8));
    assert_eq!(second.supportive_information, None);
    assert_eq!(second.proposition_id, proposition.id);
}

#[test]
fn test_out_of_range_scalar_rejected_from_json() {
    let items: Vec<EvidenceSubmission> = serde_json::from_str(
        r#"[
            { "text": "fine", "participant": "u1", "channel": "reddit" },
            { "text": "bad", "participant": "u2", "channel": "reddit", "confidence_level": 1.5 }
        ]"#,
    )
    .unwrap();
    let mut proposition = CreatePropositionRequest::new("Q?", &["yes", "no"])
        .into_proposition(Vec::new())
        .unwrap();

    let err = proposition.attach_evidence(items).unwrap_err();

    assert!(matches!(err, RequestError::ScalarOutOfRange { index: 1, .. }));
    assert!(proposition.evidence().is_empty());
}

// ============================================================================
// Snapshot Persistence
// ============================================================================

#[tokio::test]
async fn test_assessment_across_snapshot_reloads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("eth.json");
    let deliberatorium = Deliberatorium::new(Arc::new(
        ScriptedClassifier::always("no").respond_when("moon", "Yes"),
    ));

    let mut proposition = deliberatorium
        .create(CreatePropositionRequest::new("Ethereum above $2,600?", &["yes", "no"]))
        .unwrap();
    deliberatorium
        .attach_evidence(
            &mut proposition,
            vec![
                EvidenceSubmission::new("to the moon", "u1", "reddit"),
                EvidenceSubmission::new("flat all week", "u2", "telegram"),
            ],
        )
        .unwrap();
    write_snapshot(&path, &proposition);

    let mut reloaded = read_snapshot(&path);
    assert_eq!(reloaded, proposition);
    deliberatorium.assess(&mut reloaded).await.unwrap();
    write_snapshot(&path, &reloaded);

    let mut again = read_snapshot(&path);
    assert_eq!(again.criterion("yes").unwrap().score(), 0.5);
    assert_eq!(again.evidence()[0].winning_criterion().unwrap().value, "yes");
    assert_eq!(again.winning_criterion().unwrap().value, "yes");

    deliberatorium
        .attach_evidence(
            &mut again,
            vec![EvidenceSubmission::new("sideways", "u3", "twitter")],
        )
        .unwrap();
    let report = deliberatorium.assess(&mut again).await.unwrap();

    assert_eq!(report.total_classified, 3);
    assert_eq!(again.criterion("no").unwrap().score(), 0.67);
    assert_eq!(report.winning_criterion.value, "no");
}

#[test]
fn test_unclassified_fields_are_omitted_from_snapshot() {
    let mut proposition = CreatePropositionRequest::new("Q?", &["yes", "no"])
        .into_proposition(Vec::new())
        .unwrap();
    proposition
        .attach_evidence(vec![EvidenceSubmission::new("hmm", "u1", "reddit")])
        .unwrap();

    let snapshot = proposition.snapshot().unwrap();

    assert!(snapshot.get("winning_criterion").is_none());
    assert!(snapshot["evidence"][0].get("winning_criterion").is_none());
    assert!(snapshot["evidence"][0].get("confidence_level").is_none());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_assessments() {
    use tokio::task::JoinSet;

    let classifier = Arc::new(
        ScriptedClassifier::always("no")
            .respond_when("bull", "yes")
            .with_delay(std::time::Duration::from_millis(10)),
    );
    let deliberatorium = Arc::new(Deliberatorium::with_config(
        classifier.clone(),
        DeliberationConfig::default().with_max_concurrency(4),
    ));

    // Spawn one assessment per proposition
    let mut set = JoinSet::new();

    for i in 0..8 {
        let deliberatorium = Arc::clone(&deliberatorium);
        set.spawn(async move {
            let mut proposition = deliberatorium
                .create(CreatePropositionRequest::new(
                    &format!("Market {i} up?"),
                    &["yes", "no"],
                ))
                .unwrap();
            let items = (0..=i)
                .map(|j| {
                    let text = if j % 2 == 0 { "bull case" } else { "bear case" };
                    EvidenceSubmission::new(text, &format!("u{j}"), "reddit")
                })
                .collect();
            deliberatorium
                .attach_evidence(&mut proposition, items)
                .unwrap();
            deliberatorium.assess(&mut proposition).await.unwrap();
            (i, proposition)
        });
    }

    // Wait for all
    let mut done = 0;
    while let Some(result) = set.join_next().await {
        let (i, proposition) = result.unwrap();
        let bulls = i / 2 + 1;
        assert_eq!(proposition.classified_count(), i + 1);
        assert_eq!(
            proposition.criterion("yes").unwrap().score(),
            round_share(bulls, i + 1)
        );
        done += 1;
    }

    assert_eq!(done, 8);
    assert_eq!(classifier.call_count(), (1..=8).sum::<usize>());
}
