use anyhow::Result;

/// Secrets and env-specific values. The per-league DOS command tables live in
/// [`crate::file_config::FileConfig`] instead, loaded from a TOML file.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    /// The reserved BBS index representing "the hub itself". Outbound
    /// packets addressed to it are consumed by the directory watcher, not
    /// the batch processor.
    pub hub_bbs_index: u8,

    pub dosemu_path: String,
    pub dosemu_timeout_secs: u64,
    pub dosemu_config_dir: String,

    pub data_dir: String,

    /// Shared secret a dashboard connection must present in place of a
    /// full operator-auth mechanism; unset disables the check, which is
    /// only appropriate for local development.
    pub operator_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")?,
            host: std::env::var("HUB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("HUB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            hub_bbs_index: std::env::var("HUB_BBS_INDEX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            dosemu_path: std::env::var("DOSEMU_PATH")
                .unwrap_or_else(|_| "/usr/bin/dosemu".to_string()),
            dosemu_timeout_secs: std::env::var("DOSEMU_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
            dosemu_config_dir: std::env::var("DOSEMU_CONFIG_DIR")
                .unwrap_or_else(|_| "./dosemu_configs".to_string()),
            data_dir: std::env::var("HUB_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            operator_token: std::env::var("HUB_OPERATOR_TOKEN").ok(),
        };

        config.log_redacted();
        Ok(config)
    }

    fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let n = val.len().min(8);
            format!("{}...({} chars)", &val[..n], val.len())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  DATABASE_URL: {}", preview(&self.database_url));
        tracing::info!("  HOST:PORT: {}:{}", self.host, self.port);
        tracing::info!("  HUB_BBS_INDEX: {}", self.hub_bbs_index);
        tracing::info!("  DOSEMU_PATH: {}", self.dosemu_path);
        tracing::info!("  DOSEMU_TIMEOUT_SECS: {}", self.dosemu_timeout_secs);
        tracing::info!("  HUB_DATA_DIR: {}", self.data_dir);
    }
}
