//! # jvmatch Verification Gate (jvmatch-vg)
//!
//! Three-layer quality gate between AI profile enrichment and the profile store.
//!
//! **Purpose:** Judge every extracted field (format, grounding in source text,
//! optional AI second opinion), decide VERIFIED / UNVERIFIED / QUARANTINED for
//! the profile, and route quarantined profiles to retry strategies.
//!
//! **Architecture:** Layer 1 (deterministic) and Layer 2 (source grounding) are
//! pure and synchronous; Layer 3 is an injected async `AiVerifier` behind a cost
//! guard, circuit breaker and timeout. Retry outcomes land in an append-only
//! learning log.

pub mod config;
pub mod error;
pub mod gate;
pub mod learning;
pub mod pipeline;
pub mod retry;
pub mod types;

pub use config::GateConfig;
pub use error::{GateError, GateResult};
pub use gate::{GateStats, VerificationGate};
pub use types::{
    EnrichmentInput, ExtractedField, FieldCategory, FieldName, FieldStatus, FieldVerdict, GateStatus,
    GateVerdict, SourceText, VerificationLayer,
};
