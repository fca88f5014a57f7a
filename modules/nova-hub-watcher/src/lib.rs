//! Watches each league's configured game-outbound directory for packets the
//! game produced on its own, outside a triggered batch.
//!
//! `notify`'s callback runs on its own thread, so raw events are forwarded
//! across a bounded std channel into a bridging task that hands each
//! candidate path to its own async settle-and-ingest job. A per-filename
//! in-flight set stops overlapping events on the same file from racing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nova_hub_catalog::{League, Packet};
use nova_hub_codec as codec;
use nova_hub_common::{fsutil, FileConfig};
use nova_hub_events::{EventBus, HubEvent};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const SETTLE_INITIAL: Duration = Duration::from_secs(2);
const SETTLE_RESAMPLE: Duration = Duration::from_secs(1);
const SETTLE_EXTENDED: Duration = Duration::from_secs(3);
const EVENT_CHANNEL_DEPTH: usize = 256;

pub struct PacketWatcher {
    pool: PgPool,
    file_config: Arc<FileConfig>,
    data_dir: PathBuf,
    events: Arc<EventBus>,
    in_flight: Mutex<HashSet<String>>,
}

impl PacketWatcher {
    pub fn new(
        pool: PgPool,
        file_config: Arc<FileConfig>,
        data_dir: PathBuf,
        events: Arc<EventBus>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pool,
            file_config,
            data_dir,
            events,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// Start one watcher per configured outbound folder and run until the
    /// process exits. Never returns under normal operation.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let watched_dirs = self.configured_outbound_dirs();
        if watched_dirs.is_empty() {
            warn!("no dosemu outbound folders configured, watcher is idle");
            return Ok(());
        }

        let (tx, mut rx) = mpsc::channel::<PathBuf>(EVENT_CHANNEL_DEPTH);

        // `notify`'s recommended backend delivers events on its own thread;
        // keep the watcher alive for the life of the process by leaking it
        // into a background task rather than dropping it at end of scope.
        let mut watcher = spawn_bridge(tx.clone())?;
        for dir in &watched_dirs {
            tokio::fs::create_dir_all(dir).await.ok();
            if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
                warn!(dir = %dir.display(), error = %e, "failed to watch outbound directory");
                continue;
            }
            info!(dir = %dir.display(), "watching outbound directory");
        }
        // The watcher must outlive this function; park it in a task that
        // never completes so it isn't dropped (and stopped) on return.
        let _keep_alive = tokio::spawn(async move {
            let _watcher = watcher;
            std::future::pending::<()>().await;
        });

        // Existing-files sweep: once watches are installed, scan each
        // directory once for leftovers and feed them through the same path.
        for dir in &watched_dirs {
            self.sweep_existing(dir).await;
        }

        while let Some(path) = rx.recv().await {
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                this.process_candidate(path).await;
            });
        }

        Ok(())
    }

    fn configured_outbound_dirs(&self) -> Vec<PathBuf> {
        self.file_config
            .dosemu
            .leagues
            .values()
            .flat_map(|games| games.values())
            .map(|cfg| PathBuf::from(&cfg.outbound_folder))
            .collect()
    }

    async fn sweep_existing(&self, dir: &Path) {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to sweep outbound directory");
                return;
            }
        };

        let mut found = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.path().is_file() {
                found += 1;
                self.process_candidate(entry.path()).await;
            }
        }
        if found > 0 {
            info!(dir = %dir.display(), found, "swept existing outbound files on startup");
        }
    }

    async fn process_candidate(&self, path: PathBuf) {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            return;
        };

        // Reject directories and names that don't fit the packet grammar.
        if path.is_dir() {
            return;
        }
        let Some(parts) = codec::parse(&filename) else {
            debug!(filename, "ignoring non-packet file in outbound directory");
            return;
        };

        {
            let mut in_flight = self.in_flight.lock().expect("watcher mutex poisoned");
            if !in_flight.insert(filename.clone()) {
                return;
            }
        }

        self.settle_and_ingest(&path, &filename, &parts).await;

        self.in_flight
            .lock()
            .expect("watcher mutex poisoned")
            .remove(&filename);
    }

    async fn settle_and_ingest(
        &self,
        path: &Path,
        filename: &str,
        parts: &nova_hub_common::PacketName,
    ) {
        if !path.exists() {
            debug!(filename, "file already gone before settling, skipping");
            return;
        }

        sleep(SETTLE_INITIAL).await;
        let Ok(size1) = tokio::fs::metadata(path).await.map(|m| m.len()) else {
            debug!(filename, "file disappeared mid-settle, skipping");
            return;
        };

        sleep(SETTLE_RESAMPLE).await;
        let size2 = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(_) => {
                debug!(filename, "file disappeared mid-settle, skipping");
                return;
            }
        };

        if size1 != size2 {
            sleep(SETTLE_EXTENDED).await;
        }

        if !path.exists() {
            debug!(filename, "file moved before final read, skipping");
            return;
        }

        let payload = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(filename, error = %e, "failed to read settled file");
                return;
            }
        };
        let checksum = fsutil::sha256_hex_bytes(&payload);
        let canonical_name = codec::format(parts);

        let league = match League::find_by_number_and_game(&parts.league_number, parts.game, &self.pool).await
        {
            Ok(Some(league)) => league,
            Ok(None) => {
                warn!(
                    filename,
                    league_number = %parts.league_number,
                    game = %parts.game,
                    "no league for watched packet, leaving file in place",
                );
                return;
            }
            Err(e) => {
                warn!(filename, error = %e, "league lookup failed, leaving file in place");
                return;
            }
        };

        let hub_outbound = nova_hub_processor::layout::hub_outbound_dir(&self.data_dir);
        let moved = match fsutil::move_with_overwrite(path, &hub_outbound, &canonical_name).await {
            Ok(dest) => dest,
            Err(e) => {
                warn!(filename, error = %e, "failed to move packet into hub outbound directory");
                return;
            }
        };
        let _ = moved;

        let packet = match Packet::upsert(
            &canonical_name,
            league.id,
            &parts.source_bbs_index,
            &parts.dest_bbs_index,
            parts.sequence_number as i16,
            payload,
            &checksum,
            None,
            None,
            &self.pool,
        )
        .await
        {
            Ok(packet) => packet,
            Err(e) => {
                warn!(filename, error = %e, "failed to upsert watched packet");
                return;
            }
        };

        info!(filename = %canonical_name, packet_id = %packet.id, "registered hub-generated packet");

        self.events.publish(HubEvent::PacketUploaded {
            packet_id: packet.id,
            filename: canonical_name,
            league_id: league.id,
            source_bbs_index: parts.source_bbs_index.clone(),
            dest_bbs_index: parts.dest_bbs_index.clone(),
            at: chrono::Utc::now(),
        });
    }
}

/// Bridge `notify`'s thread-based callback into the async world: forward
/// every `Create` event's path into `tx`, best-effort (a full channel just
/// drops the notification — the startup sweep catches anything missed).
fn spawn_bridge(tx: mpsc::Sender<PathBuf>) -> notify::Result<RecommendedWatcher> {
    notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if !matches!(event.kind, EventKind::Create(_)) {
                return;
            }
            for path in event.paths {
                let _ = tx.try_send(path);
            }
        }
        Err(e) => warn!(error = %e, "filesystem watch error"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_names_are_recognized_and_non_packets_are_not() {
        assert!(codec::parse("555B0201.001").is_some());
        assert!(codec::parse("readme.txt").is_none());
    }
}
