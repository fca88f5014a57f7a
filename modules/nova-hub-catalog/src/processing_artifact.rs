use chrono::{DateTime, Utc};
use nova_hub_common::{ArtifactKind, HubResult};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A score/routes/bbsinfo artifact captured from one processing run.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProcessingArtifact {
    pub id: Uuid,
    pub run_id: Uuid,
    pub kind: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

impl ProcessingArtifact {
    pub async fn create(
        run_id: Uuid,
        kind: ArtifactKind,
        payload: &str,
        pool: &PgPool,
    ) -> HubResult<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO processing_artifacts (run_id, kind, payload)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(run_id)
        .bind(kind.as_str())
        .bind(payload)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn list_for_run(run_id: Uuid, pool: &PgPool) -> HubResult<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM processing_artifacts WHERE run_id = $1 ORDER BY created_at",
        )
        .bind(run_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
