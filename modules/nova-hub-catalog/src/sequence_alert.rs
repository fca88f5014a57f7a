use chrono::{DateTime, Utc};
use nova_hub_common::HubResult;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A detected gap in a source/destination packet sequence.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SequenceAlert {
    pub id: Uuid,
    pub league_id: Uuid,
    pub source_bbs_index: String,
    pub dest_bbs_index: String,
    pub expected_seq: i16,
    pub received_seq: Option<i16>,
    pub gap_size: i16,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl SequenceAlert {
    /// Raises a new unresolved alert, or returns the existing one if a gap
    /// at this exact (route, expected_seq) is already open — the partial
    /// unique index makes this an upsert rather than a plain insert.
    pub async fn raise(
        league_id: Uuid,
        source_bbs_index: &str,
        dest_bbs_index: &str,
        expected_seq: i16,
        received_seq: Option<i16>,
        gap_size: i16,
        pool: &PgPool,
    ) -> HubResult<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO sequence_alerts
                (league_id, source_bbs_index, dest_bbs_index, expected_seq, received_seq, gap_size)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (league_id, source_bbs_index, dest_bbs_index, expected_seq)
                WHERE resolved_at IS NULL
            DO UPDATE SET received_seq = EXCLUDED.received_seq, gap_size = EXCLUDED.gap_size
            RETURNING *
            "#,
        )
        .bind(league_id)
        .bind(source_bbs_index)
        .bind(dest_bbs_index)
        .bind(expected_seq)
        .bind(received_seq)
        .bind(gap_size)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn resolve(id: Uuid, note: Option<&str>, pool: &PgPool) -> HubResult<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE sequence_alerts SET resolved_at = NOW(), note = $1 WHERE id = $2 RETURNING *",
        )
        .bind(note)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn list_open(league_id: Uuid, pool: &PgPool) -> HubResult<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM sequence_alerts
            WHERE league_id = $1 AND resolved_at IS NULL
            ORDER BY detected_at
            "#,
        )
        .bind(league_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
