use chrono::{DateTime, Utc};
use nova_hub_common::HubResult;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Binds a client to a bbs_index/fidonet_address within one league.
/// Active memberships are unique per (league, bbs_index) and per
/// (league, fidonet_address) — enforced by partial unique indexes, not
/// application code.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub client_id: Uuid,
    pub league_id: Uuid,
    pub bbs_index: i16,
    pub fidonet_address: String,
    pub active: bool,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub async fn create(
        client_id: Uuid,
        league_id: Uuid,
        bbs_index: i16,
        fidonet_address: &str,
        pool: &PgPool,
    ) -> HubResult<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO memberships (client_id, league_id, bbs_index, fidonet_address)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(league_id)
        .bind(bbs_index)
        .bind(fidonet_address)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// The membership that authorizes `client_id` to act as `bbs_index`
    /// within `league_id`. Ingress/egress authorization checks this is
    /// `Some` and `active` before accepting a packet.
    pub async fn find_active(
        client_id: Uuid,
        league_id: Uuid,
        bbs_index: i16,
        pool: &PgPool,
    ) -> HubResult<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM memberships
            WHERE client_id = $1 AND league_id = $2 AND bbs_index = $3 AND active
            "#,
        )
        .bind(client_id)
        .bind(league_id)
        .bind(bbs_index)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// The active membership (if any) binding `client_id` to `league_id`,
    /// regardless of `bbs_index` — used to resolve "my mailbox" for the
    /// listing endpoint.
    pub async fn find_by_client_and_league(
        client_id: Uuid,
        league_id: Uuid,
        pool: &PgPool,
    ) -> HubResult<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM memberships WHERE client_id = $1 AND league_id = $2 AND active",
        )
        .bind(client_id)
        .bind(league_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_league_and_bbs_index(
        league_id: Uuid,
        bbs_index: i16,
        pool: &PgPool,
    ) -> HubResult<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM memberships WHERE league_id = $1 AND bbs_index = $2 AND active",
        )
        .bind(league_id)
        .bind(bbs_index)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn list_for_league(league_id: Uuid, pool: &PgPool) -> HubResult<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM memberships WHERE league_id = $1 AND active ORDER BY bbs_index",
        )
        .bind(league_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
