//! Shared fixtures for jvmatch-vg integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use jvmatch_vg::gate::layer3::{
    AiJudgement, AiVerdict, AiVerificationRequest, AiVerifier, AiVerifierError, CircuitBreaker, CostGuard,
};
use jvmatch_vg::{EnrichmentInput, ExtractedField, GateConfig, VerificationGate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Page text used by grounded fixtures
pub const ACME_PAGE: &str = "Acme Growth Labs\n\
    Jane Doe helps Shopify founders scale to 10k per month with retention email flows. \
    She works with DTC brands doing 1M to 5M in revenue. Contact jane@acmegrowth.io.";

/// Profile with only clean contact data
pub fn clean_input(id: &str) -> EnrichmentInput {
    EnrichmentInput::new(id)
        .with_value("email", format!("{}@acmegrowth.io", id.replace(' ', "")))
        .with_value("website", "https://acmegrowth.io")
        .with_base_confidence(0.80)
}

/// Profile whose critical email is malformed
pub fn malformed_input(id: &str) -> EnrichmentInput {
    EnrichmentInput::new(id).with_value("email", "not-an-email")
}

/// Profile with one SUSPICIOUS field (role mailbox) and nothing failing
pub fn suspicious_input(id: &str) -> EnrichmentInput {
    EnrichmentInput::new(id)
        .with_value("email", "info@acmegrowth.io")
        .with_source(Some("https://acmegrowth.io"), ACME_PAGE)
}

/// Profile with a bio grounded verbatim in its source page
pub fn grounded_bio_input(id: &str) -> EnrichmentInput {
    EnrichmentInput::new(id)
        .with_value("email", "jane@acmegrowth.io")
        .with_field(
            "bio",
            ExtractedField::new("Jane helps Shopify founders scale with retention email flows.")
                .with_quote("Jane Doe helps Shopify founders scale to 10k per month")
                .with_source_url("https://acmegrowth.io"),
        )
        .with_source(Some("https://acmegrowth.io"), ACME_PAGE)
}

/// Config with Layer 3 switched on
pub fn ai_config(timeout_ms: u64, breaker_threshold: u32) -> GateConfig {
    let mut config = GateConfig::default();
    config.layer3.enabled = true;
    config.layer3.timeout_ms = timeout_ms;
    config.layer3.breaker_failure_threshold = breaker_threshold;
    config.layer3.breaker_cooldown_secs = 3600;
    config
}

/// What the scripted verifier answers
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Confirm(f64),
    Refute,
    Inconclusive,
    Fail,
    /// Never answers within any test timeout
    Hang,
}

/// AiVerifier test double that counts calls and remembers requests
pub struct ScriptedVerifier {
    script: Script,
    calls: AtomicUsize,
    requests: Mutex<Vec<AiVerificationRequest>>,
}

impl ScriptedVerifier {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<AiVerificationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiVerifier for ScriptedVerifier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn verify(&self, request: &AiVerificationRequest) -> Result<AiJudgement, AiVerifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let judgement = |verdict, confidence| AiJudgement {
            verdict,
            confidence,
            rationale: "scripted".to_string(),
        };

        match self.script {
            Script::Confirm(confidence) => Ok(judgement(AiVerdict::Confirmed, confidence)),
            Script::Refute => Ok(judgement(AiVerdict::Refuted, 0.9)),
            Script::Inconclusive => Ok(judgement(AiVerdict::Inconclusive, 0.5)),
            Script::Fail => Err(AiVerifierError::Http("503 Service Unavailable".to_string())),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(judgement(AiVerdict::Confirmed, 1.0))
            }
        }
    }
}

/// Gate wired to a scripted verifier with a generous budget
pub fn ai_gate(config: &GateConfig, verifier: Arc<ScriptedVerifier>) -> VerificationGate {
    ai_gate_with(config, verifier, CostGuard::new(10.0, 0.002))
}

pub fn ai_gate_with(config: &GateConfig, verifier: Arc<ScriptedVerifier>, cost_guard: CostGuard) -> VerificationGate {
    let breaker = CircuitBreaker::new(
        config.layer3.breaker_failure_threshold,
        Duration::from_secs(config.layer3.breaker_cooldown_secs),
    );
    VerificationGate::with_ai_verifier(config, verifier, Arc::new(cost_guard), Arc::new(breaker))
        .expect("test config is valid")
}
