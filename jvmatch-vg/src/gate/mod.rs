//! # Verification Gate
//!
//! **3-Layer Gate between AI profile enrichment and the profile store:**
//!
//! ## Layer 1: Deterministic Checks (free, instant)
//! - `deterministic_checker` - Per-field regex/heuristic rules
//! - `contact_rules` - email, phone, website/booking link, LinkedIn
//! - `text_rules` - free-text bounds, field-swap detection, metrics
//!
//! ## Layer 2: Source Grounding (free)
//! - `source_quote_verifier` - exact, fuzzy and key-phrase grounding of quotes
//!
//! ## Layer 3: AI Verification (paid, optional)
//! - `AiVerifier` trait, `openrouter_client`, `cost_guard`, `circuit_breaker`
//!
//! ## Orchestration
//! - `verification_gate` - runs the layers and reduces field verdicts to a `GateVerdict`
//! - `stats` - lock-free outcome counters
//!
//! Every layer only classifies. Bad input becomes a verdict, never an error.

pub mod layer1;
pub mod layer2;
pub mod layer3;
pub mod reasons;
pub mod stats;
pub mod verification_gate;

pub use stats::GateStats;
pub use verification_gate::VerificationGate;
