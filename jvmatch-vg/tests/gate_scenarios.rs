//! End-to-end gate scenarios
//!
//! Layers 1 and 2 through the public API, plus the caller-side write contract.

mod helpers;

use helpers::*;
use jvmatch_vg::pipeline::{apply_verdict, BatchRunner, InMemoryProfileStore, ProfileStore, WriteDecision};
use jvmatch_vg::{
    EnrichmentInput, ExtractedField, FieldName, FieldStatus, GateConfig, GateStatus, GateVerdict,
    VerificationGate, VerificationLayer,
};
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Scenarios A-E
// ============================================================================

#[test]
fn scenario_a_malformed_email_without_source_is_quarantined() {
    let gate = VerificationGate::default();
    let verdict = gate.evaluate(&malformed_input("a"));

    assert_eq!(verdict.status(), GateStatus::Quarantined);
    assert_eq!(gate.stats().quarantined, 1);
    assert_eq!(gate.stats().evaluated, 1);

    let email = verdict.field_verdict(&FieldName::Email).unwrap();
    assert_eq!(email.status, FieldStatus::Fail);
    assert_eq!(email.layer, VerificationLayer::Deterministic);
    assert_eq!(email.auto_fix.as_deref(), Some(""));
}

#[tokio::test]
async fn scenario_b_clean_email_written_at_base_confidence() {
    let gate = VerificationGate::default();
    let store = InMemoryProfileStore::new();
    let input = EnrichmentInput::new("b")
        .with_value("email", "real@company.com")
        .with_base_confidence(0.80);

    let verdict = gate.evaluate(&input);
    assert_eq!(verdict.status(), GateStatus::Verified);

    let WriteDecision::Write(record) = apply_verdict(&input, &verdict) else {
        panic!("verified profile must be written");
    };
    store.write(&record).await.unwrap();

    let stored = store.get("b").await.unwrap();
    assert_eq!(stored.confidence, 0.80);
    assert_eq!(stored.fields[&FieldName::Email], "real@company.com");
}

#[test]
fn scenario_c_unverified_confidence_is_multiplicative() {
    let input = EnrichmentInput::new("c").with_base_confidence(0.80);
    let verdict = GateVerdict::from_parts(GateStatus::Unverified, BTreeMap::new(), 0.6, BTreeMap::new());

    let record = apply_verdict(&input, &verdict).as_write().cloned().unwrap();
    assert!((record.confidence - 0.48).abs() < 1e-9);
}

#[test]
fn scenario_d_auto_fix_is_what_gets_persisted() {
    let input = EnrichmentInput::new("d")
        .with_value("email", "FIXED@company.com")
        .with_base_confidence(0.9);
    let mut fixes = BTreeMap::new();
    fixes.insert(FieldName::Email, "fixed@company.com".to_string());
    let verdict = GateVerdict::from_parts(GateStatus::Verified, BTreeMap::new(), 1.0, fixes);

    let record = apply_verdict(&input, &verdict).as_write().cloned().unwrap();
    assert_eq!(record.fields[&FieldName::Email], "fixed@company.com");
    assert_eq!(record.confidence, 0.9);
}

#[tokio::test]
async fn scenario_e_mixed_batch_counts_sum_to_input() {
    let config = GateConfig::default();
    let gate = Arc::new(VerificationGate::new(&config).unwrap());
    let store = Arc::new(InMemoryProfileStore::new());
    let runner = BatchRunner::new(Arc::clone(&gate), store.clone(), &config);

    let inputs = vec![clean_input("e1"), clean_input("e2"), malformed_input("e3")];
    let summary = runner.run(inputs).await;

    assert_eq!(summary.gate_verified + summary.gate_unverified + summary.gate_quarantined, 3);
    assert!(summary.gate_quarantined >= 1);
    assert_eq!(summary.written, 2);
    assert_eq!(store.len().await, 2);
    assert!(store.get("e3").await.is_none());

    let stats = gate.stats();
    assert_eq!(stats.evaluated, 3);
    assert_eq!(stats.verified + stats.unverified + stats.quarantined, 3);
}

// ============================================================================
// Layer 2 interaction
// ============================================================================

#[test]
fn grounded_bio_passes_both_layers() {
    let verdict = VerificationGate::default().evaluate(&grounded_bio_input("g1"));
    assert_eq!(verdict.status(), GateStatus::Verified);

    let bio = verdict.field_verdict(&FieldName::Bio).unwrap();
    assert_eq!(bio.status, FieldStatus::Pass);
    assert!((bio.confidence - 1.0).abs() < 1e-9);
}

#[test]
fn ungrounded_claim_degrades_but_never_quarantines() {
    let input = EnrichmentInput::new("g2")
        .with_value("email", "jane@acmegrowth.io")
        .with_field(
            "bio",
            ExtractedField::new("Former CEO of Microsoft Azure who ran the Seattle office for twenty years.")
                .with_quote("Led Microsoft Azure strategy for two decades")
                .with_source_url("https://acmegrowth.io"),
        )
        .with_source(Some("https://acmegrowth.io"), ACME_PAGE);

    let verdict = VerificationGate::default().evaluate(&input);
    assert_eq!(verdict.status(), GateStatus::Unverified);

    let bio = verdict.field_verdict(&FieldName::Bio).unwrap();
    assert_eq!(bio.status, FieldStatus::Suspicious);
    assert_eq!(bio.layer, VerificationLayer::SourceQuote);
    assert!(bio.reason.starts_with("ungrounded"));
    assert!(verdict.overall_confidence() < 1.0);
}

#[test]
fn missing_quote_leaves_layer_two_unchecked() {
    let input = EnrichmentInput::new("g3")
        .with_value("company", "Acme Growth Labs")
        .with_source(Some("https://acmegrowth.io"), ACME_PAGE);
    let verdict = VerificationGate::default().evaluate(&input);

    let company = verdict.field_verdict(&FieldName::Company).unwrap();
    assert_eq!(company.layer, VerificationLayer::Deterministic);
    assert_eq!(company.status, FieldStatus::Pass);
}

// ============================================================================
// Decision-rule properties
// ============================================================================

#[test]
fn evaluation_is_idempotent() {
    let gate = VerificationGate::default();
    let input = grounded_bio_input("i1")
        .with_value("phone", "+1 (415) 555-0132")
        .with_value("booking_link", "http://calendly.com/jane")
        .with_value("list_size", "12,500")
        .with_value("seeking", "N/A");

    let first = gate.evaluate(&input);
    let second = gate.evaluate(&input);

    assert_eq!(first.status(), second.status());
    assert_eq!(first.overall_confidence(), second.overall_confidence());
    assert_eq!(first.auto_fixed_data(), second.auto_fixed_data());
    assert_eq!(first, second);
}

#[test]
fn adding_critical_failure_to_verified_set_quarantines() {
    let gate = VerificationGate::default();
    let base = clean_input("m1");
    assert_eq!(gate.evaluate(&base).status(), GateStatus::Verified);

    let broken = base.with_value("linkedin", "https://facebook.com/jane");
    assert_eq!(gate.evaluate(&broken).status(), GateStatus::Quarantined);
}

#[test]
fn non_critical_failure_is_cleared_not_quarantined() {
    let input = clean_input("n1").with_value("seeking", "lorem ipsum dolor sit amet");
    let verdict = VerificationGate::default().evaluate(&input);

    assert_eq!(verdict.status(), GateStatus::Unverified);
    assert_eq!(verdict.auto_fixed_data()[&FieldName::Seeking], "");

    let record = apply_verdict(&input, &verdict).as_write().cloned().unwrap();
    assert!(!record.fields.contains_key(&FieldName::Seeking));
}

#[test]
fn critical_override_promotes_booking_link() {
    let input = clean_input("o1").with_value("booking_link", "https://calendly.example.com/jane");
    assert_eq!(VerificationGate::default().evaluate(&input).status(), GateStatus::Unverified);

    let strict = input.with_critical_override("booking_link", true);
    assert_eq!(VerificationGate::default().evaluate(&strict).status(), GateStatus::Quarantined);
}

#[test]
fn reserved_domain_email_degrades_but_is_kept() {
    let input = clean_input("r1").with_value("email", "jane@example.com");
    let verdict = VerificationGate::default().evaluate(&input);

    assert_eq!(verdict.status(), GateStatus::Unverified);
    let email = verdict.field_verdict(&FieldName::Email).unwrap();
    assert_eq!(email.status, FieldStatus::Suspicious);
    assert!(!verdict.auto_fixed_data().contains_key(&FieldName::Email));

    let record = apply_verdict(&input, &verdict).as_write().cloned().unwrap();
    assert_eq!(record.fields[&FieldName::Email], "jane@example.com");
}

#[test]
fn empty_profile_is_verified_with_full_confidence() {
    let input = EnrichmentInput::new("empty")
        .with_value("email", serde_json::Value::Null)
        .with_value("bio", "   ");
    let verdict = VerificationGate::default().evaluate(&input);

    assert_eq!(verdict.status(), GateStatus::Verified);
    assert_eq!(verdict.overall_confidence(), 1.0);
    assert!(verdict
        .field_verdicts()
        .values()
        .all(|v| v.status == FieldStatus::Unchecked));
}

#[test]
fn input_deserializes_from_json() {
    let json = r#"{
        "profile_id": "json-1",
        "fields": {
            "email": {"value": "jane@acmegrowth.io"},
            "list_size": {"value": 12000},
            "custom_note": {"value": "met at summit"}
        },
        "sources": [{"url": "https://acmegrowth.io", "content": "Jane Doe"}],
        "base_confidence": 0.7
    }"#;
    let input: EnrichmentInput = serde_json::from_str(json).unwrap();
    assert_eq!(input.base_confidence, 0.7);

    let verdict = VerificationGate::default().evaluate(&input);
    assert_eq!(verdict.status(), GateStatus::Verified);
    let note = verdict
        .field_verdict(&FieldName::Other("custom_note".to_string()))
        .unwrap();
    assert_eq!(note.status, FieldStatus::Unchecked);
}
