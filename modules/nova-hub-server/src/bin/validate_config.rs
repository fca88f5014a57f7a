//! Read-only startup diagnostic: checks the TOML dosemu config against the
//! filesystem and the catalog — directory existence, duplicate-directory
//! detection, and membership consistency — printed as one report to stdout.
//! Never run automatically by `nova-hub-server`; an operator invokes it
//! by hand before rolling out a config change.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use nova_hub_catalog::{League, Membership};
use nova_hub_common::AppConfig;

#[derive(Parser)]
#[command(name = "validate-config", about = "Check Nova Hub config against disk and the database")]
struct Cli {
    #[arg(long, default_value = "./config/nova-hub.toml")]
    config: PathBuf,

    /// Skip the database-consistency checks (useful with no DB reachable).
    #[arg(long)]
    skip_db: bool,
}

struct Report {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Report {
    fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut report = Report::new();

    let config_path = cli
        .config
        .canonicalize()
        .with_context(|| format!("config file not found: {}", cli.config.display()))?;
    let file_config = nova_hub_common::load_config(&config_path)?;

    let mut dir_usage: HashMap<PathBuf, Vec<String>> = HashMap::new();

    for (league_number, games) in &file_config.dosemu.leagues {
        for (game_key, league_config) in games {
            let league_key = format!("{league_number}.{game_key}");

            check_directory(&mut report, &league_key, "game_folder", &league_config.game_folder);
            check_directory(&mut report, &league_key, "inbound_folder", &league_config.inbound_folder);
            check_directory(&mut report, &league_key, "outbound_folder", &league_config.outbound_folder);

            for (label, dir) in [
                ("game_folder", &league_config.game_folder),
                ("inbound_folder", &league_config.inbound_folder),
                ("outbound_folder", &league_config.outbound_folder),
            ] {
                if let Ok(canonical) = Path::new(dir).canonicalize() {
                    dir_usage
                        .entry(canonical)
                        .or_default()
                        .push(format!("{league_key} ({label})"));
                }
            }
        }
    }

    for (path, usages) in &dir_usage {
        if usages.len() > 1 {
            report.error(format!(
                "directory used multiple times: {} - {}",
                path.display(),
                usages.join(", ")
            ));
        }
    }

    if cli.skip_db {
        report.warn("database consistency checks skipped (--skip-db)");
    } else {
        match AppConfig::from_env() {
            Ok(config) => check_database_consistency(&config, &file_config, &mut report).await,
            Err(e) => report.warn(format!("could not load AppConfig for database checks: {e}")),
        }
    }

    for warning in &report.warnings {
        println!("[WARNING] {warning}");
    }
    for error in &report.errors {
        println!("[ERROR] {error}");
    }
    println!(
        "validate-config: {} error(s), {} warning(s)",
        report.errors.len(),
        report.warnings.len()
    );

    if !report.errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn check_directory(report: &mut Report, league_key: &str, kind: &str, dir: &str) {
    let path = Path::new(dir);
    if !path.exists() {
        report.error(format!("{league_key}: {kind} does not exist: {dir}"));
    } else if !path.is_dir() {
        report.error(format!("{league_key}: {kind} is not a directory: {dir}"));
    }
}

async fn check_database_consistency(
    config: &AppConfig,
    file_config: &nova_hub_common::FileConfig,
    report: &mut Report,
) {
    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            report.warn(format!("could not connect to database: {e}"));
            return;
        }
    };

    for (league_number, games) in &file_config.dosemu.leagues {
        for game_key in games.keys() {
            let Ok(game) = game_key.parse::<nova_hub_common::GameType>() else {
                report.error(format!("{league_number}.{game_key}: unrecognized game letter"));
                continue;
            };

            let league_key = format!("{league_number}.{game_key}");
            match League::find_by_number_and_game(league_number, game, &pool).await {
                Ok(Some(league)) => {
                    match Membership::list_for_league(league.id, &pool).await {
                        Ok(members) if members.is_empty() => {
                            report.warn(format!("{league_key}: configured but has no active memberships"));
                        }
                        Ok(_) => {}
                        Err(e) => report.warn(format!("{league_key}: membership lookup failed: {e}")),
                    }
                }
                Ok(None) => {
                    report.warn(format!("{league_key}: configured in dosemu.toml but not yet in the catalog"));
                }
                Err(e) => report.warn(format!("{league_key}: league lookup failed: {e}")),
            }
        }
    }
}
