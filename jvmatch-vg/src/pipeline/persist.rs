// Pipeline: Persisting Gate Results
//
// Concept: Turn a GateVerdict into a write decision and hand it to a store.
// Synchronization: Accepts (&EnrichmentInput, &GateVerdict), outputs WriteDecision
//
// QUARANTINED results are never written. Written values are the extracted
// values with the gate's auto-fixes substituted; an auto-fix of "" drops the
// field. Confidence is discounted multiplicatively for UNVERIFIED results.

use crate::learning::jsonl_log::append_json_line;
use crate::types::{EnrichmentInput, FieldName, GateStatus, GateVerdict};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jvmatch_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Profile record as handed to the profile store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileWrite {
    pub profile_id: String,
    pub fields: BTreeMap<FieldName, String>,
    pub confidence: f64,
    pub status: GateStatus,
    pub verified_at: DateTime<Utc>,
}

/// What the caller should do with an evaluated profile
#[derive(Debug, Clone, PartialEq)]
pub enum WriteDecision {
    /// Quarantined: nothing is persisted
    Skip { profile_id: String },
    Write(ProfileWrite),
}

impl WriteDecision {
    pub fn profile_id(&self) -> &str {
        match self {
            Self::Skip { profile_id } => profile_id,
            Self::Write(record) => &record.profile_id,
        }
    }

    pub fn as_write(&self) -> Option<&ProfileWrite> {
        match self {
            Self::Write(record) => Some(record),
            Self::Skip { .. } => None,
        }
    }
}

/// Decide what to persist for one evaluated input
pub fn apply_verdict(input: &EnrichmentInput, verdict: &GateVerdict) -> WriteDecision {
    let Some(confidence) = verdict.effective_confidence(input.base_confidence) else {
        return WriteDecision::Skip {
            profile_id: input.profile_id.clone(),
        };
    };

    let fixes = verdict.auto_fixed_data();
    let fields: BTreeMap<FieldName, String> = input
        .fields
        .iter()
        .filter_map(|(name, field)| {
            let value = match fixes.get(name) {
                Some(fixed) => fixed.clone(),
                None => field.value_text()?,
            };
            (!value.trim().is_empty()).then(|| (name.clone(), value))
        })
        .collect();

    WriteDecision::Write(ProfileWrite {
        profile_id: input.profile_id.clone(),
        fields,
        confidence,
        status: verdict.status(),
        verified_at: Utc::now(),
    })
}

/// Destination for accepted profile records
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn write(&self, record: &ProfileWrite) -> Result<()>;
}

/// Latest record per profile, kept in memory
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    records: RwLock<BTreeMap<String, ProfileWrite>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, profile_id: &str) -> Option<ProfileWrite> {
        self.records.read().await.get(profile_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn write(&self, record: &ProfileWrite) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.profile_id.clone(), record.clone());
        Ok(())
    }
}

/// JSON-lines profile output, one record per line
#[derive(Debug, Clone)]
pub struct JsonlProfileStore {
    path: PathBuf,
}

impl JsonlProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ProfileStore for JsonlProfileStore {
    async fn write(&self, record: &ProfileWrite) -> Result<()> {
        let line = serde_json::to_vec(record)?;
        append_json_line(&self.path, &line).await?;

        debug!(profile_id = %record.profile_id, path = %self.path.display(), "Profile written");
        Ok(())
    }
}
