// Layer 3: Circuit Breaker
//
// Stops calling a failing AI provider. Closed -> Open after N consecutive
// failures; Open -> HalfOpen after the cool-down; one trial call in HalfOpen
// closes the breaker on success or re-opens it on failure.
//
// A trial that never reports back (its future was dropped) is abandoned after
// trial_timeout, and the next caller becomes the trial.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// Set while a HalfOpen trial call is outstanding
    trial_started: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    trial_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Trial calls are abandoned after one cool-down
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
            trial_timeout: cooldown,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_started: None,
            }),
        }
    }

    pub fn with_trial_timeout(mut self, trial_timeout: Duration) -> Self {
        self.trial_timeout = trial_timeout;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // State is a few plain fields; a poisoned lock still holds a usable value
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether a call may go ahead now
    ///
    /// In HalfOpen only one trial call is admitted until it reports back or
    /// outlives `trial_timeout`.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open => {
                let cooled = inner
                    .opened_at
                    .is_some_and(|opened| opened.elapsed() >= self.cooldown);
                if cooled {
                    inner.state = BreakerState::HalfOpen;
                    inner.trial_started = Some(Instant::now());
                    tracing::info!("Circuit breaker half-open; admitting trial call");
                    true
                } else {
                    false
                }
            }
            BreakerState::HalfOpen => match inner.trial_started {
                Some(started) if started.elapsed() < self.trial_timeout => false,
                Some(started) => {
                    tracing::warn!(
                        trial_age_ms = started.elapsed().as_millis() as u64,
                        "Circuit breaker trial never reported; admitting a new trial"
                    );
                    inner.trial_started = Some(Instant::now());
                    true
                }
                None => {
                    inner.trial_started = Some(Instant::now());
                    true
                }
            },
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != BreakerState::Closed {
            tracing::info!("Circuit breaker closed");
        }
        inner.state = BreakerState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_started = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.trial_started = None;

        let should_open = inner.state == BreakerState::HalfOpen
            || inner.consecutive_failures >= self.failure_threshold;
        if should_open && inner.state != BreakerState::Open {
            tracing::warn!(
                consecutive_failures = inner.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "Circuit breaker opened"
            );
        }
        if should_open {
            inner.state = BreakerState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }
}
