//! Error types for jvmatch-vg
//!
//! Data-quality problems never surface here: they become field verdicts.
//! `GateError` is raised only while constructing or configuring a gate.

use thiserror::Error;

/// Gate construction / configuration error
#[derive(Debug, Error)]
pub enum GateError {
    /// Invalid or incomplete configuration (e.g. Layer 3 enabled without a verifier)
    #[error("Gate configuration error: {0}")]
    Config(String),

    /// jvmatch-common error (config file loading, database, IO)
    #[error(transparent)]
    Common(#[from] jvmatch_common::Error),
}

/// Result type for gate construction
pub type GateResult<T> = Result<T, GateError>;
