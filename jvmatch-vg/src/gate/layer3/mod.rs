// Layer 3: AI Verification
//
// Paid and optional. Only consulted for SUSPICIOUS fields of a profile the
// first two layers left UNVERIFIED. Every call is bounded by a timeout, a
// per-run budget and a circuit breaker; any failure leaves the field at its
// Layer 1/2 verdict.

pub mod circuit_breaker;
pub mod cost_guard;
pub mod openrouter_client;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use cost_guard::CostGuard;
pub use openrouter_client::OpenRouterVerifier;

use crate::types::FieldName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the verifier is asked to judge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiVerificationRequest {
    pub profile_id: String,
    pub field: FieldName,
    /// Claimed value, rendered as text
    pub value: String,
    /// Why Layers 1/2 were unsure
    pub concern: String,
    /// Source text the claim should be grounded in, untruncated; verifiers
    /// cut it to their prompt budget
    pub source_excerpt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiVerdict {
    /// Source supports the claim
    Confirmed,
    /// Source contradicts the claim, or the value is fabricated
    Refuted,
    /// Not enough evidence either way
    Inconclusive,
}

/// Verifier's answer for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiJudgement {
    pub verdict: AiVerdict,
    pub confidence: f64,
    #[serde(default)]
    pub rationale: String,
}

/// Layer 3 failures; never escape the gate
///
/// Only the verifier call itself fails. Budget and breaker denials happen
/// before any call and are counted as skips, not errors.
#[derive(Debug, Error)]
pub enum AiVerifierError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Verifier timed out after {0} ms")]
    Timeout(u64),

    #[error("Invalid verifier response: {0}")]
    InvalidResponse(String),
}

/// AI verifier seam
///
/// Implementations must be cheap to share across workers (`Arc<dyn AiVerifier>`).
#[async_trait]
pub trait AiVerifier: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn verify(&self, request: &AiVerificationRequest) -> Result<AiJudgement, AiVerifierError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let errors = [
            AiVerifierError::Http("503 Service Unavailable".to_string()),
            AiVerifierError::Timeout(250),
            AiVerifierError::InvalidResponse("no choices".to_string()),
        ];
        let messages: Vec<String> = errors
            .iter()
            .map(|e| match e {
                AiVerifierError::Http(_) | AiVerifierError::Timeout(_) | AiVerifierError::InvalidResponse(_) => {
                    e.to_string()
                }
            })
            .collect();
        assert_eq!(
            messages,
            vec![
                "HTTP error: 503 Service Unavailable",
                "Verifier timed out after 250 ms",
                "Invalid verifier response: no choices",
            ]
        );
    }
}
