// Verification Gate Orchestrator
//
// Concept: Run every extracted field through Layer 1, ground it with Layer 2,
// optionally consult Layer 3, then reduce the field verdicts to one GateVerdict
// Synchronization: Accepts &EnrichmentInput, outputs GateVerdict (never errors)
//
// Decision rule (first match wins):
// 1. FAIL on a critical field      -> QUARANTINED
// 2. FAIL on a non-critical field  -> UNVERIFIED (field auto-fixed to "")
// 3. Any SUSPICIOUS                -> UNVERIFIED
// 4. Otherwise                     -> VERIFIED
//
// overall_confidence = geometric mean of non-UNCHECKED field confidences, each
// floored at gate.confidence_floor; 1.0 when every field is UNCHECKED.

use super::layer1::DeterministicChecker;
use super::layer2::SourceQuoteVerifier;
use super::layer3::{
    AiVerdict, AiVerificationRequest, AiVerifier, CircuitBreaker, CostGuard, OpenRouterVerifier,
};
use super::reasons;
use super::stats::{GateCounters, GateStats};
use crate::config::GateConfig;
use crate::error::{GateError, GateResult};
use crate::types::{
    EnrichmentInput, ExtractedField, FieldName, FieldStatus, FieldVerdict, GateStatus, GateVerdict,
    VerificationLayer,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Layer 3 collaborators, injected by whoever owns the run
struct AiLayer {
    verifier: Arc<dyn AiVerifier>,
    cost_guard: Arc<CostGuard>,
    breaker: Arc<CircuitBreaker>,
}

/// Three-layer verification gate
///
/// Stateless per evaluation apart from the outcome counters, so one gate can
/// be shared by every worker of a batch (`Arc<VerificationGate>`).
pub struct VerificationGate {
    config: GateConfig,
    layer1: DeterministicChecker,
    layer2: SourceQuoteVerifier,
    ai: Option<AiLayer>,
    counters: GateCounters,
}

impl Default for VerificationGate {
    fn default() -> Self {
        Self::build(GateConfig::default(), None)
    }
}

impl VerificationGate {
    /// Gate without an AI verifier
    ///
    /// # Errors
    /// `GateError::Config` if the configuration is invalid or enables Layer 3
    /// (use `with_ai_verifier` or `from_config` for that).
    pub fn new(config: &GateConfig) -> GateResult<Self> {
        config.validate()?;
        if config.layer3.enabled {
            return Err(GateError::Config(
                "layer3.enabled is set but no AI verifier was supplied".to_string(),
            ));
        }
        Ok(Self::build(config.clone(), None))
    }

    /// Gate with injected Layer 3 collaborators
    ///
    /// The verifier is only called when `layer3.enabled` is set.
    pub fn with_ai_verifier(
        config: &GateConfig,
        verifier: Arc<dyn AiVerifier>,
        cost_guard: Arc<CostGuard>,
        breaker: Arc<CircuitBreaker>,
    ) -> GateResult<Self> {
        config.validate()?;
        let ai = AiLayer {
            verifier,
            cost_guard,
            breaker,
        };
        Ok(Self::build(config.clone(), Some(ai)))
    }

    /// Gate wired from configuration alone
    ///
    /// With Layer 3 enabled this builds the OpenRouter verifier and a fresh cost
    /// guard and circuit breaker for this run.
    pub fn from_config(config: &GateConfig) -> GateResult<Self> {
        if !config.layer3.enabled {
            return Self::new(config);
        }
        config.validate()?;

        let layer3 = &config.layer3;
        let verifier = OpenRouterVerifier::from_config(layer3)?;
        let cost_guard = CostGuard::new(layer3.budget_usd, layer3.cost_per_call_usd);
        let breaker = CircuitBreaker::new(
            layer3.breaker_failure_threshold,
            Duration::from_secs(layer3.breaker_cooldown_secs),
        );

        tracing::info!(
            model = %layer3.model,
            budget_usd = layer3.budget_usd,
            timeout_ms = layer3.timeout_ms,
            "Layer 3 AI verification enabled"
        );

        Self::with_ai_verifier(config, Arc::new(verifier), Arc::new(cost_guard), Arc::new(breaker))
    }

    fn build(config: GateConfig, ai: Option<AiLayer>) -> Self {
        Self {
            layer1: DeterministicChecker::new(config.layer1.clone()),
            layer2: SourceQuoteVerifier::new(config.layer2.clone()),
            config,
            ai,
            counters: GateCounters::default(),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Whether `evaluate_with_ai` may call a verifier
    pub fn ai_enabled(&self) -> bool {
        self.config.layer3.enabled && self.ai.is_some()
    }

    pub fn stats(&self) -> GateStats {
        self.counters.snapshot()
    }

    /// Layers 1 and 2 only; never performs I/O
    pub fn evaluate(&self, input: &EnrichmentInput) -> GateVerdict {
        let fields = self.layered_field_verdicts(input);
        self.finish(input, fields)
    }

    /// Layers 1 and 2, then Layer 3 for SUSPICIOUS fields of an UNVERIFIED profile
    ///
    /// Layer 3 timeouts and errors leave the affected field at its Layer 1/2
    /// verdict; the result is never worse-informed than `evaluate`.
    pub async fn evaluate_with_ai(&self, input: &EnrichmentInput) -> GateVerdict {
        let fields = self.layered_field_verdicts(input);
        self.finish_with_ai(input, fields).await
    }

    /// Layer 3 and the decision rule over precomputed Layer 1/2 verdicts
    pub(crate) async fn finish_with_ai(
        &self,
        input: &EnrichmentInput,
        mut fields: BTreeMap<FieldName, FieldVerdict>,
    ) -> GateVerdict {
        if let Some(ai) = self.ai.as_ref().filter(|_| self.config.layer3.enabled) {
            let pre_status = decide_status(input, &fields);
            if pre_status == GateStatus::Unverified {
                let suspicious: Vec<FieldName> = fields
                    .values()
                    .filter(|v| v.status == FieldStatus::Suspicious)
                    .map(|v| v.field.clone())
                    .collect();

                for name in suspicious {
                    let Some(current) = fields.get(&name) else {
                        continue;
                    };
                    if let Some(updated) = self.consult_ai(ai, input, current).await {
                        fields.insert(name, updated);
                    }
                }
            }
        }

        self.finish(input, fields)
    }

    /// Layer 1 for every field, combined with Layer 2 where Layer 1 allows
    ///
    /// CPU-bound on long sources; async callers run it on the blocking pool.
    pub(crate) fn layered_field_verdicts(&self, input: &EnrichmentInput) -> BTreeMap<FieldName, FieldVerdict> {
        let layer1 = self.layer1.check(input);
        layer1
            .into_iter()
            .map(|(name, l1)| {
                let combined = match input.fields.get(&name) {
                    Some(extracted) => self.combine(&name, extracted, input, l1),
                    None => l1,
                };
                (name, combined)
            })
            .collect()
    }

    /// Combine a Layer 1 verdict with Layer 2 grounding
    ///
    /// - no value or Layer 1 FAIL: Layer 1 stands, Layer 2 skipped
    /// - Layer 2 PASS c: Layer 1 status kept (no-rule UNCHECKED becomes PASS), confidence l1 x c
    /// - Layer 2 UNCHECKED: Layer 1 stands
    /// - Layer 2 FAIL: SUSPICIOUS at l1 x ungrounded_confidence
    fn combine(
        &self,
        name: &FieldName,
        extracted: &ExtractedField,
        input: &EnrichmentInput,
        l1: FieldVerdict,
    ) -> FieldVerdict {
        let no_value = l1.status == FieldStatus::Unchecked && l1.reason == reasons::NO_VALUE;
        if no_value || l1.status == FieldStatus::Fail {
            return l1;
        }

        let l2 = self.layer2.verify(name, extracted, &input.sources);
        match l2.status {
            FieldStatus::Unchecked => l1,
            FieldStatus::Pass => {
                let (status, layer) = if l1.status == FieldStatus::Unchecked {
                    (FieldStatus::Pass, VerificationLayer::SourceQuote)
                } else {
                    (l1.status, l1.layer)
                };
                let reason = if l1.status == FieldStatus::Unchecked {
                    l2.reason
                } else {
                    format!("{}; {}", l1.reason, l2.reason)
                };
                FieldVerdict {
                    status,
                    layer,
                    confidence: l1.confidence * l2.confidence,
                    reason,
                    ..l1
                }
            }
            FieldStatus::Fail | FieldStatus::Suspicious => FieldVerdict {
                status: FieldStatus::Suspicious,
                layer: VerificationLayer::SourceQuote,
                confidence: l1.confidence * self.config.layer2.ungrounded_confidence,
                reason: l2.reason,
                ..l1
            },
        }
    }

    /// One Layer 3 consultation; `None` keeps the current verdict
    async fn consult_ai(
        &self,
        ai: &AiLayer,
        input: &EnrichmentInput,
        current: &FieldVerdict,
    ) -> Option<FieldVerdict> {
        let field = &current.field;

        if !ai.cost_guard.try_reserve() {
            self.counters.record_ai_skipped();
            tracing::debug!(profile_id = %input.profile_id, field = %field, "Layer 3 budget exhausted; skipping");
            return None;
        }
        if !ai.breaker.allow_request() {
            ai.cost_guard.release();
            self.counters.record_ai_skipped();
            tracing::debug!(profile_id = %input.profile_id, field = %field, "Circuit open; skipping Layer 3");
            return None;
        }

        let request = AiVerificationRequest {
            profile_id: input.profile_id.clone(),
            field: field.clone(),
            value: input
                .fields
                .get(field)
                .and_then(ExtractedField::value_text)
                .unwrap_or_default(),
            concern: current.reason.clone(),
            source_excerpt: source_excerpt(input, field),
        };

        self.counters.record_ai_call();
        let timeout = Duration::from_millis(self.config.layer3.timeout_ms);
        let outcome = tokio::time::timeout(timeout, ai.verifier.verify(&request)).await;

        let judgement = match outcome {
            Ok(Ok(judgement)) => {
                ai.breaker.record_success();
                judgement
            }
            Ok(Err(e)) => {
                ai.breaker.record_failure();
                self.counters.record_ai_failure();
                tracing::warn!(
                    profile_id = %input.profile_id,
                    field = %field,
                    verifier = ai.verifier.name(),
                    error = %e,
                    "Layer 3 verification failed; keeping Layer 1/2 verdict"
                );
                return None;
            }
            Err(_) => {
                ai.breaker.record_failure();
                self.counters.record_ai_failure();
                tracing::warn!(
                    profile_id = %input.profile_id,
                    field = %field,
                    verifier = ai.verifier.name(),
                    timeout_ms = self.config.layer3.timeout_ms,
                    "Layer 3 verification timed out; keeping Layer 1/2 verdict"
                );
                return None;
            }
        };

        let rationale = if judgement.rationale.is_empty() {
            String::new()
        } else {
            format!(": {}", judgement.rationale)
        };

        match judgement.verdict {
            AiVerdict::Confirmed => {
                self.counters.record_ai_upgrade();
                Some(FieldVerdict {
                    status: FieldStatus::Pass,
                    layer: VerificationLayer::Ai,
                    confidence: crate::types::clamp_unit(judgement.confidence),
                    reason: format!("{}{}", reasons::AI_CONFIRMED, rationale),
                    ..current.clone()
                })
            }
            AiVerdict::Refuted => {
                self.counters.record_ai_refutation();
                Some(
                    FieldVerdict::fail(
                        field.clone(),
                        VerificationLayer::Ai,
                        format!("{}{}", reasons::AI_REFUTED, rationale),
                    )
                    .clearing(),
                )
            }
            AiVerdict::Inconclusive => {
                tracing::debug!(profile_id = %input.profile_id, field = %field, "Layer 3 inconclusive");
                None
            }
        }
    }

    /// Apply the auto-fix rule and decision rule, count, log
    pub(crate) fn finish(&self, input: &EnrichmentInput, mut fields: BTreeMap<FieldName, FieldVerdict>) -> GateVerdict {
        for verdict in fields.values_mut() {
            if verdict.status == FieldStatus::Fail
                && verdict.auto_fix.is_none()
                && !input.is_critical(&verdict.field)
            {
                verdict.auto_fix = Some(String::new());
            }
        }

        let status = decide_status(input, &fields);
        let overall = overall_confidence(&fields, self.config.gate.confidence_floor);
        let auto_fixed: BTreeMap<FieldName, String> = fields
            .iter()
            .filter_map(|(name, v)| v.auto_fix.clone().map(|fix| (name.clone(), fix)))
            .collect();

        self.counters.record_status(status);

        let failed: Vec<&str> = fields
            .values()
            .filter(|v| v.status == FieldStatus::Fail)
            .map(|v| v.field.as_str())
            .collect();
        tracing::info!(
            profile_id = %input.profile_id,
            status = %status,
            overall_confidence = overall,
            fields = fields.len(),
            failed = ?failed,
            auto_fixes = auto_fixed.len(),
            "Gate verdict"
        );

        GateVerdict::from_parts(status, fields, overall, auto_fixed)
    }
}

/// Decision rule over combined field verdicts
fn decide_status(input: &EnrichmentInput, fields: &BTreeMap<FieldName, FieldVerdict>) -> GateStatus {
    let critical_fail = fields
        .values()
        .any(|v| v.status == FieldStatus::Fail && input.is_critical(&v.field));
    if critical_fail {
        return GateStatus::Quarantined;
    }

    let degraded = fields
        .values()
        .any(|v| matches!(v.status, FieldStatus::Fail | FieldStatus::Suspicious));
    if degraded {
        GateStatus::Unverified
    } else {
        GateStatus::Verified
    }
}

/// Geometric mean of floored confidences of non-UNCHECKED fields
pub fn overall_confidence(fields: &BTreeMap<FieldName, FieldVerdict>, floor: f64) -> f64 {
    let floor = floor.max(f64::MIN_POSITIVE);
    let logs: Vec<f64> = fields
        .values()
        .filter(|v| v.status != FieldStatus::Unchecked)
        .map(|v| v.confidence.max(floor).ln())
        .collect();

    if logs.is_empty() {
        return 1.0;
    }
    (logs.iter().sum::<f64>() / logs.len() as f64).exp()
}

/// Source text for a Layer 3 prompt, the field's own source page first
///
/// Not truncated here; the verifier owns the prompt budget and its marker.
fn source_excerpt(input: &EnrichmentInput, field: &FieldName) -> String {
    let wanted = input
        .fields
        .get(field)
        .and_then(|f| f.source_url.as_deref());

    let mut sources: Vec<_> = input.sources.iter().collect();
    if let Some(wanted) = wanted {
        sources.sort_by_key(|s| s.url.as_deref() != Some(wanted));
    }

    sources
        .iter()
        .map(|s| s.content.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
