use chrono::{DateTime, Utc};
use nova_hub_common::HubResult;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A federation member node, identified by its `client_id` credential.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Client {
    pub id: Uuid,
    pub client_id: String,
    pub hashed_secret: String,
    pub display_name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl Client {
    pub async fn create(
        client_id: &str,
        hashed_secret: &str,
        display_name: &str,
        pool: &PgPool,
    ) -> HubResult<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO clients (client_id, hashed_secret, display_name)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(hashed_secret)
        .bind(display_name)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> HubResult<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    /// Looked up on every ingress/egress request; callers are expected to
    /// reject inactive clients rather than filter them out here.
    pub async fn find_by_client_id(client_id: &str, pool: &PgPool) -> HubResult<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM clients WHERE client_id = $1")
            .bind(client_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn list(pool: &PgPool) -> HubResult<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM clients ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn touch_last_seen(id: Uuid, pool: &PgPool) -> HubResult<()> {
        sqlx::query("UPDATE clients SET last_seen_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
