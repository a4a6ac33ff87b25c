// Layer 1: Deterministic Checks
//
// Free, synchronous, rule-based checks per field type. No network access.
// Contract: one FieldVerdict per field examined; absent values are UNCHECKED.

pub mod contact_rules;
pub mod deterministic_checker;
pub mod patterns;
pub mod text_rules;

pub use deterministic_checker::DeterministicChecker;
