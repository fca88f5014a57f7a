//! TOML-backed configuration: a typed record of per-league/per-game dosemu
//! settings, replacing an ad-hoc nested-dict-with-`isinstance`-guards approach.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerSection,
    #[serde(default)]
    pub security: SecuritySection,
    pub dosemu: DosemuSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    pub data_dir: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecuritySection {
    pub jwt_secret: Option<String>,
    pub jwt_expiry_hours: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DosemuSection {
    pub path: String,
    pub timeout: u64,
    pub config_dir: String,

    /// `[dosemu.<league_number>.<game>]` tables, e.g. `[dosemu.555.b]`.
    /// Keyed by league number string, then lowercase game letter ("b"/"f").
    #[serde(flatten)]
    pub leagues: HashMap<String, HashMap<String, LeagueDosConfig>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueDosConfig {
    pub processing_command: String,
    pub scores_command: Option<String>,
    pub routeinfo_command: Option<String>,
    pub bbsinfo_command: Option<String>,
    pub inbound_folder: String,
    pub outbound_folder: String,
    pub scores_folder: Option<String>,
    pub game_folder: String,
    #[serde(default = "default_game_dos_path")]
    pub game_dos_path: String,
}

fn default_game_dos_path() -> String {
    "C:\\".to_string()
}

impl DosemuSection {
    /// Resolve the league/game-specific command table, mirroring the
    /// original `_run_dosemu_command`'s `config["dosemu"][league_id][game]`
    /// lookup but as a typed, fallible accessor instead of a dict probe.
    pub fn league_config(&self, league_number: &str, game_key: &str) -> Option<&LeagueDosConfig> {
        self.leagues.get(league_number)?.get(game_key)
    }
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_league_game_tables() {
        let toml = r#"
            [server]
            data_dir = "./data"
            host = "0.0.0.0"
            port = 8080

            [dosemu]
            path = "/usr/bin/dosemu"
            timeout = 120
            config_dir = "./dosemu_configs"

            [dosemu.555.b]
            processing_command = "BRE.EXE"
            inbound_folder = "/data/dosemu/555/b/inbound"
            outbound_folder = "/data/dosemu/555/b/outbound"
            game_folder = "/data/dosemu/555/b/game"
        "#;

        let config: FileConfig = toml::from_str(toml).unwrap();
        let league = config.dosemu.league_config("555", "b").unwrap();
        assert_eq!(league.processing_command, "BRE.EXE");
        assert_eq!(league.game_dos_path, "C:\\");
        assert!(config.dosemu.league_config("555", "f").is_none());
        assert!(config.dosemu.league_config("999", "b").is_none());
    }
}
