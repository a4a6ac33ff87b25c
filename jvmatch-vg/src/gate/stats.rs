//! Gate outcome counters
//!
//! **Design:** Lock-free; every counter is an independent `AtomicU64` so workers
//! never contend. Counters are observational only and never influence a verdict.

use crate::types::GateStatus;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by a `VerificationGate`
#[derive(Debug, Default)]
pub(crate) struct GateCounters {
    /// Profiles evaluated (sync or async)
    evaluated: AtomicU64,
    verified: AtomicU64,
    unverified: AtomicU64,
    quarantined: AtomicU64,

    /// Layer 3 calls actually sent
    ai_calls: AtomicU64,
    /// SUSPICIOUS fields the verifier confirmed
    ai_upgrades: AtomicU64,
    /// SUSPICIOUS fields the verifier refuted
    ai_refutations: AtomicU64,
    /// Timeouts and verifier errors
    ai_failures: AtomicU64,
    /// Calls not sent because of the breaker or budget
    ai_skipped: AtomicU64,
}

impl GateCounters {
    pub(crate) fn record_status(&self, status: GateStatus) {
        self.evaluated.fetch_add(1, Ordering::Relaxed);
        let counter = match status {
            GateStatus::Verified => &self.verified,
            GateStatus::Unverified => &self.unverified,
            GateStatus::Quarantined => &self.quarantined,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ai_call(&self) {
        self.ai_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ai_upgrade(&self) {
        self.ai_upgrades.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ai_refutation(&self) {
        self.ai_refutations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ai_failure(&self) {
        self.ai_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ai_skipped(&self) {
        self.ai_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> GateStats {
        GateStats {
            evaluated: self.evaluated.load(Ordering::Relaxed),
            verified: self.verified.load(Ordering::Relaxed),
            unverified: self.unverified.load(Ordering::Relaxed),
            quarantined: self.quarantined.load(Ordering::Relaxed),
            ai_calls: self.ai_calls.load(Ordering::Relaxed),
            ai_upgrades: self.ai_upgrades.load(Ordering::Relaxed),
            ai_refutations: self.ai_refutations.load(Ordering::Relaxed),
            ai_failures: self.ai_failures.load(Ordering::Relaxed),
            ai_skipped: self.ai_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the gate counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateStats {
    pub evaluated: u64,
    pub verified: u64,
    pub unverified: u64,
    pub quarantined: u64,
    pub ai_calls: u64,
    pub ai_upgrades: u64,
    pub ai_refutations: u64,
    pub ai_failures: u64,
    pub ai_skipped: u64,
}

impl GateStats {
    /// Share of evaluated profiles that were quarantined
    pub fn quarantine_rate(&self) -> f64 {
        if self.evaluated == 0 {
            0.0
        } else {
            self.quarantined as f64 / self.evaluated as f64
        }
    }
}
