//! # Retry Routing
//!
//! Quarantined (and degraded) results flow through:
//! 1. `failure_classifier` - field verdict -> `FailureType`
//! 2. `strategy_selector` - (field, `FailureType`) -> ordered `RetryPlan`
//!
//! Outcomes of executed plans are recorded in the `learning` log.

pub mod failure_classifier;
pub mod strategy_selector;

pub use failure_classifier::{ClassifiedFailure, FailureClassifier, FailureType};
pub use strategy_selector::{EnrichmentMethod, RetryContext, RetryPlan, RetryStrategySelector};
