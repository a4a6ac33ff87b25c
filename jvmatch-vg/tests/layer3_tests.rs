//! Layer 3 integration tests against a scripted verifier
//!
//! Covers:
//! - disabled Layer 3 never calls the verifier
//! - confirm / refute / inconclusive outcomes
//! - timeout and error leave the Layer 1/2 verdict in place
//! - circuit breaker and budget skip calls
//! - a cancelled half-open trial does not block later trials

mod helpers;

use helpers::*;
use jvmatch_vg::gate::layer3::{BreakerState, CircuitBreaker, CostGuard};
use jvmatch_vg::{FieldName, FieldStatus, GateConfig, GateStatus, VerificationGate, VerificationLayer};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn disabled_layer_three_never_calls_verifier() {
    let verifier = ScriptedVerifier::new(Script::Confirm(0.95));
    let gate = ai_gate(&GateConfig::default(), verifier.clone());
    assert!(!gate.ai_enabled());

    let verdict = gate.evaluate_with_ai(&suspicious_input("d1")).await;

    assert_eq!(verifier.calls(), 0);
    assert_eq!(verdict.status(), GateStatus::Unverified);
    assert_eq!(gate.stats().ai_calls, 0);
}

#[tokio::test]
async fn synchronous_evaluate_never_calls_verifier() {
    let verifier = ScriptedVerifier::new(Script::Confirm(0.95));
    let gate = ai_gate(&ai_config(1000, 3), verifier.clone());

    let verdict = gate.evaluate(&suspicious_input("s1"));

    assert_eq!(verifier.calls(), 0);
    assert_eq!(verdict.status(), GateStatus::Unverified);
}

#[test]
fn enabling_layer_three_without_verifier_is_a_config_error() {
    assert!(VerificationGate::new(&ai_config(1000, 3)).is_err());

    let mut zero_timeout = ai_config(0, 3);
    zero_timeout.layer3.timeout_ms = 0;
    let verifier = ScriptedVerifier::new(Script::Confirm(0.9));
    let result = VerificationGate::with_ai_verifier(
        &zero_timeout,
        verifier,
        Arc::new(CostGuard::new(1.0, 0.002)),
        Arc::new(CircuitBreaker::new(3, Duration::from_secs(60))),
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn confirmation_upgrades_suspicious_field() {
    let verifier = ScriptedVerifier::new(Script::Confirm(0.92));
    let gate = ai_gate(&ai_config(1000, 3), verifier.clone());

    let verdict = gate.evaluate_with_ai(&suspicious_input("c1")).await;

    assert_eq!(verifier.calls(), 1);
    assert_eq!(verdict.status(), GateStatus::Verified);
    let email = verdict.field_verdict(&FieldName::Email).unwrap();
    assert_eq!(email.status, FieldStatus::Pass);
    assert_eq!(email.layer, VerificationLayer::Ai);
    assert!((email.confidence - 0.92).abs() < 1e-9);
    assert_eq!(gate.stats().ai_upgrades, 1);

    let request = &verifier.requests()[0];
    assert_eq!(request.profile_id, "c1");
    assert_eq!(request.value, "info@acmegrowth.io");
    assert!(request.source_excerpt.contains("Acme Growth Labs"));
    assert!(!request.concern.is_empty());
}

#[tokio::test]
async fn refutation_of_critical_field_quarantines() {
    let verifier = ScriptedVerifier::new(Script::Refute);
    let gate = ai_gate(&ai_config(1000, 3), verifier.clone());

    let verdict = gate.evaluate_with_ai(&suspicious_input("r1")).await;

    assert_eq!(verdict.status(), GateStatus::Quarantined);
    let email = verdict.field_verdict(&FieldName::Email).unwrap();
    assert_eq!(email.status, FieldStatus::Fail);
    assert_eq!(email.layer, VerificationLayer::Ai);
    assert_eq!(email.auto_fix.as_deref(), Some(""));
    assert_eq!(gate.stats().ai_refutations, 1);
}

#[tokio::test]
async fn inconclusive_keeps_prior_verdict() {
    let verifier = ScriptedVerifier::new(Script::Inconclusive);
    let gate = ai_gate(&ai_config(1000, 3), verifier.clone());
    let input = suspicious_input("i1");

    let with_ai = gate.evaluate_with_ai(&input).await;
    let without = gate.evaluate(&input);

    assert_eq!(verifier.calls(), 1);
    assert_eq!(with_ai.status(), without.status());
    assert_eq!(with_ai.field_verdicts(), without.field_verdicts());
}

#[tokio::test]
async fn timeout_leaves_verdict_unchanged() {
    let verifier = ScriptedVerifier::new(Script::Hang);
    let gate = ai_gate(&ai_config(50, 3), verifier.clone());
    let input = suspicious_input("t1");

    let started = Instant::now();
    let verdict = gate.evaluate_with_ai(&input).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(verifier.calls(), 1);
    assert_eq!(verdict, gate.evaluate(&input));
    assert_eq!(gate.stats().ai_failures, 1);
}

#[tokio::test]
async fn verifier_error_leaves_verdict_unchanged() {
    let verifier = ScriptedVerifier::new(Script::Fail);
    let gate = ai_gate(&ai_config(1000, 3), verifier.clone());
    let input = suspicious_input("e1");

    let verdict = gate.evaluate_with_ai(&input).await;

    assert_eq!(verdict.status(), GateStatus::Unverified);
    assert_eq!(verdict, gate.evaluate(&input));
    assert_eq!(gate.stats().ai_failures, 1);
}

#[tokio::test]
async fn verified_and_quarantined_profiles_skip_layer_three() {
    let verifier = ScriptedVerifier::new(Script::Confirm(0.99));
    let gate = ai_gate(&ai_config(1000, 3), verifier.clone());

    let clean = gate.evaluate_with_ai(&clean_input("v1")).await;
    let broken = gate
        .evaluate_with_ai(&malformed_input("q1").with_value("company", "?"))
        .await;

    assert_eq!(clean.status(), GateStatus::Verified);
    assert_eq!(broken.status(), GateStatus::Quarantined);
    assert_eq!(verifier.calls(), 0);
}

#[tokio::test]
async fn breaker_opens_after_threshold_failures() {
    let config = ai_config(1000, 2);
    let verifier = ScriptedVerifier::new(Script::Fail);
    let breaker = Arc::new(CircuitBreaker::new(2, Duration::from_secs(3600)));
    let gate = VerificationGate::with_ai_verifier(
        &config,
        verifier.clone(),
        Arc::new(CostGuard::new(10.0, 0.002)),
        breaker.clone(),
    )
    .unwrap();

    for id in ["b1", "b2", "b3", "b4"] {
        let verdict = gate.evaluate_with_ai(&suspicious_input(id)).await;
        assert_eq!(verdict.status(), GateStatus::Unverified);
    }

    assert_eq!(verifier.calls(), 2);
    assert_eq!(breaker.state(), BreakerState::Open);
    let stats = gate.stats();
    assert_eq!(stats.ai_failures, 2);
    assert_eq!(stats.ai_skipped, 2);
}

#[tokio::test]
async fn budget_exhaustion_skips_calls() {
    let verifier = ScriptedVerifier::new(Script::Inconclusive);
    let gate = ai_gate_with(&ai_config(1000, 3), verifier.clone(), CostGuard::new(0.004, 0.002));

    for id in ["k1", "k2", "k3"] {
        gate.evaluate_with_ai(&suspicious_input(id)).await;
    }

    assert_eq!(verifier.calls(), 2);
    assert_eq!(gate.stats().ai_skipped, 1);
    assert_eq!(gate.stats().ai_calls, 2);
    assert_eq!(gate.stats().ai_failures, 0);
}

#[tokio::test]
async fn shared_budget_is_never_overspent_across_tasks() {
    let verifier = ScriptedVerifier::new(Script::Inconclusive);
    let gate = Arc::new(ai_gate_with(
        &ai_config(1000, 100),
        verifier.clone(),
        CostGuard::new(0.02, 0.002),
    ));

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..40 {
        let gate = Arc::clone(&gate);
        tasks.spawn(async move { gate.evaluate_with_ai(&suspicious_input(&format!("p{}", i))).await });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    assert_eq!(verifier.calls(), 10);
    assert_eq!(gate.stats().ai_skipped, 30);
}

#[tokio::test]
async fn cancelled_trial_call_does_not_wedge_breaker() {
    let config = ai_config(10_000, 1);
    let verifier = ScriptedVerifier::new(Script::Hang);
    let breaker = Arc::new(CircuitBreaker::new(1, Duration::ZERO).with_trial_timeout(Duration::from_millis(250)));
    let gate = VerificationGate::with_ai_verifier(
        &config,
        verifier.clone(),
        Arc::new(CostGuard::new(10.0, 0.002)),
        breaker.clone(),
    )
    .unwrap();

    breaker.record_failure();
    assert_eq!(breaker.state(), BreakerState::Open);

    // The trial call hangs and its caller gives up, dropping the future
    let input = suspicious_input("h1");
    let dropped = tokio::time::timeout(Duration::from_millis(20), gate.evaluate_with_ai(&input)).await;
    assert!(dropped.is_err());
    assert_eq!(verifier.calls(), 1);
    assert_eq!(breaker.state(), BreakerState::HalfOpen);
    assert!(!breaker.allow_request());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(breaker.allow_request());
}
