// Pipeline: Batch Runner
//
// Concept: Evaluate many enrichment results with a bounded worker pool, write
// what the gate accepts and plan retries for what it quarantines.
// Synchronization: Accepts Vec<EnrichmentInput>, outputs BatchSummary
//
// Per-profile error isolation: a failed store write is counted and logged,
// it never aborts the batch. Results are reported in input order regardless
// of completion order.

use super::persist::{apply_verdict, ProfileStore, WriteDecision};
use crate::config::GateConfig;
use crate::gate::VerificationGate;
use crate::retry::{FailureClassifier, RetryContext, RetryPlan, RetryStrategySelector};
use crate::types::{EnrichmentInput, GateStatus, GateVerdict};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One profile's outcome within a batch
#[derive(Debug, Clone, Serialize)]
pub struct ProfileOutcome {
    pub profile_id: String,
    pub verdict: GateVerdict,
    pub written: bool,
    /// Empty unless the profile was quarantined
    pub retry_plans: Vec<RetryPlan>,
}

/// Totals and per-profile outcomes for one batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub gate_verified: usize,
    pub gate_unverified: usize,
    pub gate_quarantined: usize,
    pub written: usize,
    pub write_failures: usize,
    /// Number of retry plans across all quarantined profiles
    pub retry_plans: usize,
    /// In input order
    pub verdicts: Vec<ProfileOutcome>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.gate_verified + self.gate_unverified + self.gate_quarantined
    }

    fn record(&mut self, outcome: ProfileOutcome, write_failed: bool) {
        match outcome.verdict.status() {
            GateStatus::Verified => self.gate_verified += 1,
            GateStatus::Unverified => self.gate_unverified += 1,
            GateStatus::Quarantined => self.gate_quarantined += 1,
        }
        if outcome.written {
            self.written += 1;
        }
        if write_failed {
            self.write_failures += 1;
        }
        self.retry_plans += outcome.retry_plans.len();
        self.verdicts.push(outcome);
    }
}

/// Bounded-concurrency driver for the gate
pub struct BatchRunner {
    gate: Arc<VerificationGate>,
    store: Arc<dyn ProfileStore>,
    classifier: Arc<FailureClassifier>,
    selector: Arc<RetryStrategySelector>,
    worker_count: usize,
}

impl BatchRunner {
    pub fn new(gate: Arc<VerificationGate>, store: Arc<dyn ProfileStore>, config: &GateConfig) -> Self {
        Self {
            gate,
            store,
            classifier: Arc::new(FailureClassifier::new()),
            selector: Arc::new(RetryStrategySelector::new(&config.retry)),
            worker_count: config.batch.worker_count.max(1),
        }
    }

    pub fn gate(&self) -> &VerificationGate {
        &self.gate
    }

    /// Evaluate, persist and plan for every input
    ///
    /// Same verdicts as `evaluate_with_ai` when the gate has Layer 3 enabled,
    /// otherwise as `evaluate`; Layers 1 and 2 run on the blocking pool.
    pub async fn run(&self, inputs: Vec<EnrichmentInput>) -> BatchSummary {
        let total = inputs.len();
        let processed = Arc::new(AtomicUsize::new(0));

        tracing::info!(profiles = total, workers = self.worker_count, ai = self.gate.ai_enabled(), "Batch started");

        let mut results: Vec<(usize, ProfileOutcome, bool)> = stream::iter(inputs.into_iter().enumerate())
            .map(|(index, input)| {
                let gate = Arc::clone(&self.gate);
                let store = Arc::clone(&self.store);
                let classifier = Arc::clone(&self.classifier);
                let selector = Arc::clone(&self.selector);
                let processed = Arc::clone(&processed);

                async move {
                    let verdict = evaluate_off_runtime(&gate, &input).await;

                    let (written, write_failed) = match apply_verdict(&input, &verdict) {
                        WriteDecision::Write(record) => match store.write(&record).await {
                            Ok(()) => (true, false),
                            Err(e) => {
                                tracing::error!(
                                    profile_id = %input.profile_id,
                                    error = %e,
                                    "Profile write failed"
                                );
                                (false, true)
                            }
                        },
                        WriteDecision::Skip { .. } => (false, false),
                    };

                    let retry_plans = if verdict.status() == GateStatus::Quarantined {
                        let failures = classifier.classify(&verdict);
                        let context = RetryContext::from_input(&input, &verdict);
                        selector.plan_for(&failures, &context)
                    } else {
                        Vec::new()
                    };

                    let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    if current % 100 == 0 || current == total {
                        tracing::info!(progress = format!("{}/{}", current, total), "Batch progress update");
                    }

                    let outcome = ProfileOutcome {
                        profile_id: input.profile_id,
                        verdict,
                        written,
                        retry_plans,
                    };
                    (index, outcome, write_failed)
                }
            })
            .buffer_unordered(self.worker_count)
            .collect()
            .await;

        results.sort_by_key(|(index, _, _)| *index);

        let mut summary = BatchSummary::default();
        for (_, outcome, write_failed) in results {
            summary.record(outcome, write_failed);
        }

        tracing::info!(
            verified = summary.gate_verified,
            unverified = summary.gate_unverified,
            quarantined = summary.gate_quarantined,
            written = summary.written,
            write_failures = summary.write_failures,
            retry_plans = summary.retry_plans,
            "Batch completed"
        );

        summary
    }
}

/// Layers 1 and 2 on the blocking pool, then Layer 3 and the decision rule here
///
/// Fuzzy quote matching over long sources is CPU-bound and must not stall the
/// runtime thread driving the other workers. A panic inside the gate
/// quarantines that profile only.
async fn evaluate_off_runtime(gate: &Arc<VerificationGate>, input: &EnrichmentInput) -> GateVerdict {
    let layered = {
        let gate = Arc::clone(gate);
        let input = input.clone();
        tokio::task::spawn_blocking(move || gate.layered_field_verdicts(&input)).await
    };

    match layered {
        Ok(fields) if gate.ai_enabled() => gate.finish_with_ai(input, fields).await,
        Ok(fields) => gate.finish(input, fields),
        Err(e) => {
            tracing::error!(
                profile_id = %input.profile_id,
                error = %e,
                "Gate evaluation aborted; quarantining profile"
            );
            GateVerdict::from_parts(GateStatus::Quarantined, BTreeMap::new(), 0.0, BTreeMap::new())
        }
    }
}
