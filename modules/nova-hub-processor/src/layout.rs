//! On-disk layout the processor, watcher, and HTTP boundary all share.
//! Filesystem copies are regenerable; the catalog is truth.

use std::path::{Path, PathBuf};

pub fn hub_inbound_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("packets").join("inbound")
}

pub fn hub_outbound_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("packets").join("outbound")
}

pub fn hub_processed_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("packets").join("processed")
}

pub fn nodelists_dir(data_dir: &Path, game_key: &str, league_number: &str) -> PathBuf {
    data_dir.join("nodelists").join(game_key).join(league_number)
}

/// The staging root for one (league, game) subset inside the sandbox
/// (mirrors `nova_hub_dosrunner`'s own `drive_path` layout).
pub fn staging_inbound_dir(data_dir: &Path, league_number: &str, game_key: &str) -> PathBuf {
    data_dir
        .join("dosemu")
        .join(league_number)
        .join(game_key)
        .join("inbound")
}

pub fn staging_outbound_dir(data_dir: &Path, league_number: &str, game_key: &str) -> PathBuf {
    data_dir
        .join("dosemu")
        .join(league_number)
        .join(game_key)
        .join("outbound")
}
