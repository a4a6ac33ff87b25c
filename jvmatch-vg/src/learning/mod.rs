//! # Learning Log
//!
//! Append-only ledger of retry outcomes. Entries are never updated or deleted;
//! success rates are computed by scanning entries, never by maintained counters,
//! so concurrent writers cannot lose updates.
//!
//! Sinks:
//! - `learning_log::LearningLog` - SQLite table, one INSERT per entry
//! - `jsonl_log::JsonlLearningLog` - JSON-lines file, one append write per entry
//!
//! The log informs manual tuning of the retry priority table (`method_report`);
//! nothing reads it back into retry selection automatically.

pub mod jsonl_log;
pub mod learning_log;

pub use jsonl_log::JsonlLearningLog;
pub use learning_log::LearningLog;

use crate::retry::{EnrichmentMethod, FailureType};
use crate::types::FieldName;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jvmatch_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Result of one retry attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOutcome {
    Success,
    /// Some but not all of the wanted data; counts as half a success
    Partial,
    Failure,
}

impl RetryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failure => "failure",
        }
    }

    /// Contribution to a success rate
    pub fn credit(&self) -> f64 {
        match self {
            Self::Success => 1.0,
            Self::Partial => 0.5,
            Self::Failure => 0.0,
        }
    }
}

impl fmt::Display for RetryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryOutcome {
    type Err = jvmatch_common::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "partial" => Ok(Self::Partial),
            "failure" => Ok(Self::Failure),
            other => Err(jvmatch_common::Error::InvalidInput(format!(
                "unknown retry outcome '{}'",
                other
            ))),
        }
    }
}

/// One recorded retry outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEntry {
    pub id: Uuid,
    pub field: FieldName,
    pub failure_type: FailureType,
    pub method_attempted: EnrichmentMethod,
    pub outcome: RetryOutcome,
    pub timestamp: DateTime<Utc>,
}

impl LearningEntry {
    /// New entry stamped now with a fresh id
    pub fn new(
        field: FieldName,
        failure_type: FailureType,
        method_attempted: EnrichmentMethod,
        outcome: RetryOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            field,
            failure_type,
            method_attempted,
            outcome,
            timestamp: Utc::now(),
        }
    }

    fn matches(&self, field: &FieldName, failure_type: FailureType) -> bool {
        self.field == *field && self.failure_type == failure_type
    }
}

/// Per-method attempt count and success rate for one (field, failure type)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodStats {
    pub method: EnrichmentMethod,
    pub attempts: u64,
    pub success_rate: f64,
}

/// Scanned success rate; `None` when there were no attempts
pub fn success_rate_of(outcomes: impl IntoIterator<Item = RetryOutcome>) -> Option<f64> {
    let (attempts, credit) = outcomes
        .into_iter()
        .fold((0u64, 0.0f64), |(n, c), o| (n + 1, c + o.credit()));
    (attempts > 0).then(|| credit / attempts as f64)
}

/// Rank methods by scanned success rate, best first (ties: more attempts first)
pub fn rank_methods(entries: &[LearningEntry], field: &FieldName, failure_type: FailureType) -> Vec<MethodStats> {
    let mut by_method: BTreeMap<EnrichmentMethod, Vec<RetryOutcome>> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.matches(field, failure_type)) {
        by_method.entry(entry.method_attempted).or_default().push(entry.outcome);
    }

    let mut report: Vec<MethodStats> = by_method
        .into_iter()
        .filter_map(|(method, outcomes)| {
            let attempts = outcomes.len() as u64;
            success_rate_of(outcomes).map(|success_rate| MethodStats {
                method,
                attempts,
                success_rate,
            })
        })
        .collect();

    report.sort_by(|a, b| {
        b.success_rate
            .total_cmp(&a.success_rate)
            .then(b.attempts.cmp(&a.attempts))
            .then(a.method.cmp(&b.method))
    });
    report
}

/// Append-only outcome store
#[async_trait]
pub trait LearningSink: Send + Sync {
    /// Append one entry; exactly one write per entry
    async fn append(&self, entry: &LearningEntry) -> Result<()>;

    /// Every entry, oldest first
    async fn entries(&self) -> Result<Vec<LearningEntry>>;

    /// Success rate for (field, failure type, method) by full scan
    async fn success_rate(
        &self,
        field: &FieldName,
        failure_type: FailureType,
        method: EnrichmentMethod,
    ) -> Result<Option<f64>> {
        let entries = self.entries().await?;
        Ok(success_rate_of(
            entries
                .iter()
                .filter(|e| e.matches(field, failure_type) && e.method_attempted == method)
                .map(|e| e.outcome),
        ))
    }

    /// Offline ranking of methods for manual tuning of the retry table
    async fn method_report(&self, field: &FieldName, failure_type: FailureType) -> Result<Vec<MethodStats>> {
        let entries = self.entries().await?;
        Ok(rank_methods(&entries, field, failure_type))
    }
}
