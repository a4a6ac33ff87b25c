//! # Pipeline
//!
//! Caller side of the gate: what to persist for a verdict, where to persist it,
//! and a bounded-concurrency batch driver.
//!
//! - `persist` - `apply_verdict`, `ProfileStore` and its in-memory/JSONL stores
//! - `batch_runner` - `BatchRunner` over `futures::stream::buffer_unordered`

pub mod batch_runner;
pub mod persist;

pub use batch_runner::{BatchRunner, BatchSummary, ProfileOutcome};
pub use persist::{apply_verdict, InMemoryProfileStore, JsonlProfileStore, ProfileStore, ProfileWrite, WriteDecision};
