use chrono::{DateTime, Utc};
use nova_hub_common::HubResult;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A single routed game packet.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Packet {
    pub id: Uuid,
    pub filename: String,
    pub league_id: Uuid,
    pub source_bbs_index: String,
    pub dest_bbs_index: String,
    pub sequence_number: i16,
    #[serde(skip_serializing)]
    pub payload: Vec<u8>,
    pub size: i64,
    pub checksum: String,
    pub uploaded_at: DateTime<Utc>,
    pub downloaded_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processing_run_id: Option<Uuid>,
    pub processed: bool,
    pub downloaded: bool,
    pub source_client_id: Option<Uuid>,
    pub dest_client_id: Option<Uuid>,
}

impl Packet {
    /// Re-upload of an already-known (filename, dest_bbs_index) overwrites
    /// the existing row rather than failing, mirroring the on-disk overwrite
    /// semantics. The composite key, rather than filename alone, is what
    /// lets a nodelist fan-out to many members under one shared filename.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        filename: &str,
        league_id: Uuid,
        source_bbs_index: &str,
        dest_bbs_index: &str,
        sequence_number: i16,
        payload: Vec<u8>,
        checksum: &str,
        source_client_id: Option<Uuid>,
        dest_client_id: Option<Uuid>,
        pool: &PgPool,
    ) -> HubResult<Self> {
        let size = payload.len() as i64;
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO packets
                (filename, league_id, source_bbs_index, dest_bbs_index, sequence_number,
                 payload, size, checksum, source_client_id, dest_client_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (filename, dest_bbs_index) DO UPDATE SET
                league_id = EXCLUDED.league_id,
                source_bbs_index = EXCLUDED.source_bbs_index,
                dest_bbs_index = EXCLUDED.dest_bbs_index,
                sequence_number = EXCLUDED.sequence_number,
                payload = EXCLUDED.payload,
                size = EXCLUDED.size,
                checksum = EXCLUDED.checksum,
                uploaded_at = NOW(),
                downloaded_at = NULL,
                processed_at = NULL,
                processing_run_id = NULL,
                processed = false,
                downloaded = false,
                source_client_id = EXCLUDED.source_client_id,
                dest_client_id = EXCLUDED.dest_client_id
            RETURNING *
            "#,
        )
        .bind(filename)
        .bind(league_id)
        .bind(source_bbs_index)
        .bind(dest_bbs_index)
        .bind(sequence_number)
        .bind(payload)
        .bind(size)
        .bind(checksum)
        .bind(source_client_id)
        .bind(dest_client_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> HubResult<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM packets WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    /// Only safe for ordinary grammar-named packets, where filename alone
    /// is unique; nodelist rows share a filename across members and must go
    /// through [`Packet::find_by_filename_and_dest`] instead.
    pub async fn find_by_filename(filename: &str, pool: &PgPool) -> HubResult<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM packets WHERE filename = $1")
            .bind(filename)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// The member-specific row for a shared filename (a nodelist fan-out
    /// row, or any ordinary packet looked up by its own dest).
    pub async fn find_by_filename_and_dest(
        filename: &str,
        dest_bbs_index: &str,
        pool: &PgPool,
    ) -> HubResult<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM packets WHERE filename = $1 AND dest_bbs_index = $2",
        )
        .bind(filename)
        .bind(dest_bbs_index)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Most recent sequence number seen for a route, used by the gap
    /// detector to compute the expected next sequence.
    pub async fn latest_sequence_for_route(
        league_id: Uuid,
        source_bbs_index: &str,
        dest_bbs_index: &str,
        pool: &PgPool,
    ) -> HubResult<Option<i16>> {
        let row = sqlx::query_as::<_, (i16,)>(
            r#"
            SELECT sequence_number FROM packets
            WHERE league_id = $1 AND source_bbs_index = $2 AND dest_bbs_index = $3
            ORDER BY uploaded_at DESC
            LIMIT 1
            "#,
        )
        .bind(league_id)
        .bind(source_bbs_index)
        .bind(dest_bbs_index)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Packets addressed to one (league, dest_bbs_index) pair, optionally
    /// restricted to those not yet downloaded.
    pub async fn list_for_destination(
        league_id: Uuid,
        dest_bbs_index: &str,
        unread_only: bool,
        pool: &PgPool,
    ) -> HubResult<Vec<Self>> {
        if unread_only {
            sqlx::query_as::<_, Self>(
                r#"
                SELECT * FROM packets
                WHERE league_id = $1 AND dest_bbs_index = $2 AND downloaded_at IS NULL
                ORDER BY uploaded_at DESC
                "#,
            )
            .bind(league_id)
            .bind(dest_bbs_index)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
        } else {
            sqlx::query_as::<_, Self>(
                r#"
                SELECT * FROM packets
                WHERE league_id = $1 AND dest_bbs_index = $2
                ORDER BY uploaded_at DESC
                "#,
            )
            .bind(league_id)
            .bind(dest_bbs_index)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
        }
    }

    /// All unprocessed packets across all leagues, the batch processor's
    /// staging-phase read.
    pub async fn list_unprocessed(pool: &PgPool) -> HubResult<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM packets WHERE processed_at IS NULL ORDER BY uploaded_at",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Egress selection for one (filename, dest_bbs_index): prefer an
    /// undelivered row, newest upload first among ties.
    pub async fn find_latest_for_download(
        filename: &str,
        dest_bbs_index: &str,
        pool: &PgPool,
    ) -> HubResult<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM packets
            WHERE filename = $1 AND dest_bbs_index = $2
            ORDER BY downloaded ASC, uploaded_at DESC
            LIMIT 1
            "#,
        )
        .bind(filename)
        .bind(dest_bbs_index)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn mark_downloaded(id: Uuid, pool: &PgPool) -> HubResult<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE packets SET downloaded = true, downloaded_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn mark_processed(id: Uuid, run_id: Uuid, pool: &PgPool) -> HubResult<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE packets
            SET processed = true, processed_at = NOW(), processing_run_id = $1
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(run_id)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Every sequence number ever seen on a route, for the gap detector —
    /// dedup and sort happen there, this just returns the raw set.
    pub async fn sequence_numbers_for_route(
        league_id: Uuid,
        source_bbs_index: &str,
        dest_bbs_index: &str,
        pool: &PgPool,
    ) -> HubResult<Vec<i16>> {
        let rows = sqlx::query_as::<_, (i16,)>(
            r#"
            SELECT sequence_number FROM packets
            WHERE league_id = $1 AND source_bbs_index = $2 AND dest_bbs_index = $3
            "#,
        )
        .bind(league_id)
        .bind(source_bbs_index)
        .bind(dest_bbs_index)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Whether a packet exists at exactly this sequence on this route,
    /// used by `auto_resolve` to decide whether a gap has been filled.
    pub async fn exists_at_sequence(
        league_id: Uuid,
        source_bbs_index: &str,
        dest_bbs_index: &str,
        sequence_number: i16,
        pool: &PgPool,
    ) -> HubResult<bool> {
        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT COUNT(*) FROM packets
            WHERE league_id = $1 AND source_bbs_index = $2 AND dest_bbs_index = $3
                AND sequence_number = $4
            "#,
        )
        .bind(league_id)
        .bind(source_bbs_index)
        .bind(dest_bbs_index)
        .bind(sequence_number)
        .fetch_one(pool)
        .await?;
        Ok(row.0 > 0)
    }

    /// Every distinct (league, src, dst) route with at least one packet,
    /// the batch processor's "sequence sweep" input.
    pub async fn distinct_routes(pool: &PgPool) -> HubResult<Vec<(Uuid, String, String)>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT DISTINCT league_id, source_bbs_index, dest_bbs_index FROM packets",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_unprocessed(pool: &PgPool) -> HubResult<i64> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM packets WHERE processed_at IS NULL")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}
