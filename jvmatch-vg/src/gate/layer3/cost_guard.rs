// Layer 3: Cost Guard
//
// Per-run spend cap for AI verification. Owned by whoever runs the batch and
// injected into the gate; there is no process-wide instance.

use std::sync::atomic::{AtomicU64, Ordering};

const MICROS_PER_USD: f64 = 1_000_000.0;

/// Budget in micro-dollars with lock-free reservation
///
/// `try_reserve` either takes the full cost of one call or nothing, so
/// concurrent workers can never overspend.
#[derive(Debug)]
pub struct CostGuard {
    budget_micros: u64,
    cost_per_call_micros: u64,
    spent_micros: AtomicU64,
}

impl CostGuard {
    pub fn new(budget_usd: f64, cost_per_call_usd: f64) -> Self {
        Self {
            budget_micros: to_micros(budget_usd),
            cost_per_call_micros: to_micros(cost_per_call_usd),
            spent_micros: AtomicU64::new(0),
        }
    }

    /// Reserve the cost of one call; false once the budget cannot cover it
    pub fn try_reserve(&self) -> bool {
        let cost = self.cost_per_call_micros;
        self.spent_micros
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |spent| {
                let next = spent.checked_add(cost)?;
                (next <= self.budget_micros).then_some(next)
            })
            .is_ok()
    }

    /// Return one reservation that was never spent
    pub fn release(&self) {
        let cost = self.cost_per_call_micros;
        let _ = self
            .spent_micros
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |spent| {
                Some(spent.saturating_sub(cost))
            });
    }

    pub fn spent_usd(&self) -> f64 {
        self.spent_micros.load(Ordering::Acquire) as f64 / MICROS_PER_USD
    }

    pub fn remaining_usd(&self) -> f64 {
        let spent = self.spent_micros.load(Ordering::Acquire);
        self.budget_micros.saturating_sub(spent) as f64 / MICROS_PER_USD
    }

    pub fn is_exhausted(&self) -> bool {
        let spent = self.spent_micros.load(Ordering::Acquire);
        spent.saturating_add(self.cost_per_call_micros) > self.budget_micros
    }
}

fn to_micros(usd: f64) -> u64 {
    if usd.is_finite() && usd > 0.0 {
        (usd * MICROS_PER_USD).round() as u64
    } else {
        0
    }
}
