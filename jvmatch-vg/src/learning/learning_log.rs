// Learning Log: SQLite sink
//
// Concept: One row per retry attempt. Rows are inserted and read, never
// updated or deleted. Rates come from SELECTs over the rows.
// Synchronization: Pool-level; each append is a single INSERT statement

use super::{success_rate_of, LearningEntry, LearningSink, RetryOutcome};
use crate::retry::{EnrichmentMethod, FailureType};
use crate::types::FieldName;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jvmatch_common::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const MAX_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed learning log
#[derive(Clone)]
pub struct LearningLog {
    pool: SqlitePool,
}

impl LearningLog {
    /// Open (creating if needed) the log database at `path`
    pub async fn connect(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        info!(path = %path.display(), "Opened learning log");
        Self::from_pool(pool).await
    }

    /// Private in-memory log (tests, dry runs)
    ///
    /// Single connection kept alive for the pool's lifetime; every new
    /// in-memory connection would otherwise see an empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the table if missing
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        create_learning_log_table(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of recorded attempts
    pub async fn len(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM learning_log")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

/// Create the learning_log table and its lookup index
pub async fn create_learning_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS learning_log (
            id TEXT PRIMARY KEY,
            field TEXT NOT NULL,
            failure_type TEXT NOT NULL,
            method_attempted TEXT NOT NULL,
            outcome TEXT NOT NULL CHECK (outcome IN ('success', 'partial', 'failure')),
            timestamp TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_learning_log_key
        ON learning_log (field, failure_type, method_attempted)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[async_trait]
impl LearningSink for LearningLog {
    async fn append(&self, entry: &LearningEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO learning_log (id, field, failure_type, method_attempted, outcome, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.field.as_str())
        .bind(entry.failure_type.as_str())
        .bind(entry.method_attempted.as_str())
        .bind(entry.outcome.as_str())
        .bind(entry.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(
            id = %entry.id,
            field = %entry.field,
            failure_type = %entry.failure_type,
            method = %entry.method_attempted,
            outcome = %entry.outcome,
            "Recorded retry outcome"
        );
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<LearningEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, field, failure_type, method_attempted, outcome, timestamp
            FROM learning_log
            ORDER BY timestamp, rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn success_rate(
        &self,
        field: &FieldName,
        failure_type: FailureType,
        method: EnrichmentMethod,
    ) -> Result<Option<f64>> {
        let outcomes: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT outcome FROM learning_log
            WHERE field = ? AND failure_type = ? AND method_attempted = ?
            "#,
        )
        .bind(field.as_str())
        .bind(failure_type.as_str())
        .bind(method.as_str())
        .fetch_all(&self.pool)
        .await?;

        let outcomes = outcomes
            .iter()
            .map(|o| o.parse::<RetryOutcome>())
            .collect::<Result<Vec<_>>>()?;
        Ok(success_rate_of(outcomes))
    }
}

fn row_to_entry(row: &SqliteRow) -> Result<LearningEntry> {
    let id: String = row.try_get("id")?;
    let field: String = row.try_get("field")?;
    let failure_type: String = row.try_get("failure_type")?;
    let method: String = row.try_get("method_attempted")?;
    let outcome: String = row.try_get("outcome")?;
    let timestamp: String = row.try_get("timestamp")?;

    let corrupt = |what: &str, detail: String| {
        Error::Internal(format!("learning_log row {}: bad {}: {}", id, what, detail))
    };

    Ok(LearningEntry {
        id: Uuid::parse_str(&id).map_err(|e| corrupt("id", e.to_string()))?,
        field: FieldName::from(field),
        failure_type: failure_type.parse()?,
        method_attempted: method.parse()?,
        outcome: outcome.parse()?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| corrupt("timestamp", e.to_string()))?,
    })
}
