pub mod config;
pub mod error;
pub mod file_config;
pub mod fsutil;
pub mod types;

pub use config::AppConfig;
pub use error::{HubResult, NovaHubError};
pub use file_config::{load_config, FileConfig, LeagueDosConfig};
pub use types::{ArtifactKind, GameType, PacketName, RunStatus};
