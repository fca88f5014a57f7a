use chrono::{DateTime, Utc};
use nova_hub_common::{HubResult, RunStatus};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// One invocation of the batch processor's sandboxed game binary.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProcessingRun {
    pub id: Uuid,
    pub league_id: Option<Uuid>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: String,
    pub packets_processed: i32,
    pub packets_failed: i32,
    pub exit_code: Option<i32>,
    pub captured_output: String,
    pub error_message: Option<String>,
}

impl ProcessingRun {
    pub async fn start(league_id: Option<Uuid>, pool: &PgPool) -> HubResult<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO processing_runs (league_id, status)
            VALUES ($1, 'running')
            RETURNING *
            "#,
        )
        .bind(league_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> HubResult<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM processing_runs WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn complete(
        id: Uuid,
        status: RunStatus,
        packets_processed: i32,
        packets_failed: i32,
        exit_code: Option<i32>,
        captured_output: &str,
        error_message: Option<&str>,
        pool: &PgPool,
    ) -> HubResult<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE processing_runs
            SET completed_at = NOW(),
                status = $1,
                packets_processed = $2,
                packets_failed = $3,
                exit_code = $4,
                captured_output = $5,
                error_message = $6
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(status.as_str())
        .bind(packets_processed)
        .bind(packets_failed)
        .bind(exit_code)
        .bind(captured_output)
        .bind(error_message)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn list_recent(limit: i64, pool: &PgPool) -> HubResult<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM processing_runs ORDER BY started_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Used by the singleton guard to detect a crashed previous run left
    /// `running`.
    pub async fn find_running(pool: &PgPool) -> HubResult<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM processing_runs WHERE status = 'running'")
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }
}
