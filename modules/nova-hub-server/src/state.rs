use std::path::PathBuf;
use std::sync::Arc;

use nova_hub_common::FileConfig;
use nova_hub_events::EventBus;
use nova_hub_processor::{BatchProcessor, SingletonGuard};
use sqlx::PgPool;

/// Everything a request handler needs: one struct, wrapped in an `Arc`,
/// handed to `Router::with_state`.
pub struct AppState {
    pub pool: PgPool,
    pub file_config: Arc<FileConfig>,
    pub data_dir: PathBuf,
    pub events: Arc<EventBus>,
    pub processor: Arc<BatchProcessor>,
    pub singleton: Arc<SingletonGuard>,
    pub hub_bbs_index: u8,
    pub operator_token: Option<String>,
}

impl AppState {
    /// Fire-and-forget batch trigger for a successful upload.
    pub fn trigger_batch(&self) {
        self.singleton.trigger(Arc::clone(&self.processor));
    }

    pub fn hub_inbound_dir(&self) -> PathBuf {
        nova_hub_processor::layout::hub_inbound_dir(&self.data_dir)
    }

    pub fn hub_outbound_dir(&self) -> PathBuf {
        nova_hub_processor::layout::hub_outbound_dir(&self.data_dir)
    }

    pub fn nodelists_dir(&self, game: nova_hub_common::GameType, league_number: &str) -> PathBuf {
        nova_hub_processor::layout::nodelists_dir(&self.data_dir, game.as_config_key(), league_number)
    }
}
