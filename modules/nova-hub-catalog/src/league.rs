use chrono::{DateTime, Utc};
use nova_hub_common::{GameType, HubResult};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// One league is one (league_number, game_type) routing domain.
/// `league_number` is stored zero-padded, as text — never as an integer —
/// so leading zeros survive round trips.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct League {
    pub id: Uuid,
    pub league_number: String,
    pub game_type: String,
    pub display_name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl League {
    pub fn game(&self) -> Option<GameType> {
        self.game_type.parse().ok()
    }

    pub async fn create(
        league_number: &str,
        game_type: GameType,
        display_name: &str,
        pool: &PgPool,
    ) -> HubResult<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO leagues (league_number, game_type, display_name)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(league_number)
        .bind(game_type.as_str())
        .bind(display_name)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> HubResult<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM leagues WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_number_and_game(
        league_number: &str,
        game_type: GameType,
        pool: &PgPool,
    ) -> HubResult<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM leagues WHERE league_number = $1 AND game_type = $2",
        )
        .bind(league_number)
        .bind(game_type.as_str())
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn list_active(pool: &PgPool) -> HubResult<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM leagues WHERE active ORDER BY league_number, game_type",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
