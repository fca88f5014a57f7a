use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use nova_hub_catalog::{League, Membership, Packet, ProcessingArtifact, ProcessingRun};
use nova_hub_codec as codec;
use nova_hub_common::{fsutil, ArtifactKind, FileConfig, GameType, HubResult, RunStatus};
use nova_hub_dosrunner::{self as dosrunner, DosRunRequest};
use nova_hub_events::{EventBus, HubEvent};
use sqlx::PgPool;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::layout;

pub struct BatchProcessor {
    pool: PgPool,
    file_config: Arc<FileConfig>,
    data_dir: PathBuf,
    dosemu_path: String,
    dosemu_config_dir: PathBuf,
    dosemu_timeout: Duration,
    events: Arc<EventBus>,
    hub_bbs_index: u8,
}

/// Outcome of one (league, game) subset, rolled up into the run record.
struct SubsetOutcome {
    success: bool,
    packets_archived: i32,
    output: String,
    error_message: Option<String>,
}

impl BatchProcessor {
    pub fn new(
        pool: PgPool,
        file_config: Arc<FileConfig>,
        data_dir: PathBuf,
        dosemu_path: String,
        dosemu_config_dir: PathBuf,
        dosemu_timeout: Duration,
        events: Arc<EventBus>,
        hub_bbs_index: u8,
    ) -> Self {
        Self {
            pool,
            file_config,
            data_dir,
            dosemu_path,
            dosemu_config_dir,
            dosemu_timeout,
            events,
            hub_bbs_index,
        }
    }

    /// The full eight-phase batch run, executed to completion once.
    pub async fn run_once(&self) -> HubResult<Uuid> {
        // 1. Collect work.
        let unprocessed = Packet::list_unprocessed(&self.pool).await?;

        // 2. Partition by game: group packets by league, then resolve each
        // league to find its game_type.
        let mut by_league: HashMap<Uuid, Vec<Packet>> = HashMap::new();
        for packet in unprocessed {
            by_league.entry(packet.league_id).or_default().push(packet);
        }

        // 3. Open run.
        let run = ProcessingRun::start(None, &self.pool).await?;
        self.events.publish(HubEvent::BatchRunStarted {
            run_id: run.id,
            league_id: None,
            at: Utc::now(),
        });
        info!(run_id = %run.id, leagues = by_league.len(), "batch run started");

        let mut overall_success = true;
        let mut packets_processed = 0i32;
        let mut packets_failed = 0i32;
        let mut captured_output = String::new();
        let mut error_message: Option<String> = None;

        // 4. Resolve each league and split into a B subset and an F
        // subset; B subsets run to completion before any F subset starts.
        let mut b_subsets = Vec::new();
        let mut f_subsets = Vec::new();
        for (league_id, packets) in by_league {
            let league = match League::find_by_id(league_id, &self.pool).await {
                Ok(league) => league,
                Err(e) => {
                    warn!(league_id = %league_id, error = %e, "league vanished mid-run, skipping subset");
                    packets_failed += packets.len() as i32;
                    overall_success = false;
                    error_message.get_or_insert_with(|| {
                        format!("league {league_id} vanished mid-run: {e}")
                    });
                    continue;
                }
            };
            let Some(game) = league.game() else {
                warn!(league_id = %league_id, game_type = %league.game_type, "unrecognized game_type, skipping subset");
                packets_failed += packets.len() as i32;
                overall_success = false;
                error_message.get_or_insert_with(|| {
                    format!("league {league_id}: unrecognized game_type {}", league.game_type)
                });
                continue;
            };

            match game {
                GameType::B => b_subsets.push((league, packets)),
                GameType::F => f_subsets.push((league, packets)),
            }
        }

        for (league, packets) in b_subsets.into_iter().chain(f_subsets) {
            let game = league.game().expect("partitioned by a resolved game_type");
            match self
                .process_subset(run.id, &league.league_number, game, &packets)
                .await
            {
                Ok(outcome) => {
                    captured_output.push_str(&outcome.output);
                    if outcome.success {
                        packets_processed += outcome.packets_archived;
                    } else {
                        packets_failed += packets.len() as i32;
                        overall_success = false;
                        if let Some(msg) = outcome.error_message {
                            error_message.get_or_insert(msg);
                        }
                    }
                }
                Err(e) => {
                    warn!(league_id = %league.id, error = %e, "subset processing errored");
                    packets_failed += packets.len() as i32;
                    overall_success = false;
                    error_message.get_or_insert_with(|| {
                        format!("league {}: subset processing errored: {e}", league.id)
                    });
                }
            }
        }

        // 5. Close run.
        let status = if overall_success {
            RunStatus::Completed
        } else {
            RunStatus::Error
        };
        ProcessingRun::complete(
            run.id,
            status,
            packets_processed,
            packets_failed,
            None,
            &captured_output,
            error_message.as_deref(),
            &self.pool,
        )
        .await?;

        // 6. Sequence sweep: detect and record gaps, then resolve any open
        // alert whose missing sequence has since shown up.
        let routes = Packet::distinct_routes(&self.pool).await?;
        for (league_id, src, dst) in &routes {
            if let Err(e) = nova_hub_validator::validate_route(
                *league_id,
                src,
                dst,
                &self.pool,
                &self.events,
            )
            .await
            {
                warn!(league_id = %league_id, error = %e, "sequence sweep failed for route");
            }
        }
        let mut swept_leagues: Vec<Uuid> = routes.iter().map(|(league_id, ..)| *league_id).collect();
        swept_leagues.sort_unstable();
        swept_leagues.dedup();
        for league_id in swept_leagues {
            if let Err(e) = nova_hub_validator::auto_resolve(league_id, &self.pool).await {
                warn!(league_id = %league_id, error = %e, "auto-resolve failed for league");
            }
        }

        // 7. Outbound sweep: catch artifacts produced outside this run's
        // own packet-triggered subsets (e.g. asynchronously by the game).
        if let Err(e) = self.outbound_sweep(run.id).await {
            warn!(run_id = %run.id, error = %e, "outbound sweep failed");
        }

        // 8. Publish completion.
        self.events.publish(HubEvent::BatchRunCompleted {
            run_id: run.id,
            status: status.as_str().to_string(),
            packets_processed,
            packets_failed,
            at: Utc::now(),
        });
        info!(run_id = %run.id, packets_processed, packets_failed, "batch run complete");

        Ok(run.id)
    }

    async fn process_subset(
        &self,
        run_id: Uuid,
        league_number: &str,
        game: GameType,
        packets: &[Packet],
    ) -> HubResult<SubsetOutcome> {
        let game_key = game.as_config_key();
        let Some(league_config) = self.file_config.dosemu.league_config(league_number, game_key)
        else {
            warn!(league_number, game_key, "no dosemu configuration for subset");
            return Ok(SubsetOutcome {
                success: false,
                packets_archived: 0,
                output: String::new(),
                error_message: Some(format!(
                    "no dosemu configuration for {league_number}{game_key}"
                )),
            });
        };

        let staging_inbound = layout::staging_inbound_dir(&self.data_dir, league_number, game_key);
        let staging_outbound =
            layout::staging_outbound_dir(&self.data_dir, league_number, game_key);
        let hub_inbound = layout::hub_inbound_dir(&self.data_dir);
        let hub_processed = layout::hub_processed_dir(&self.data_dir);

        // 4.a Stage inbound: copy (not move) each known packet file into
        // the per-(league, game) inbound staging directory.
        let mut staged = Vec::new();
        for packet in packets {
            match fsutil::find_case_insensitive(&hub_inbound, &packet.filename).await {
                Ok(Some(found)) => {
                    if let Err(e) = fsutil::copy_into(&found, &staging_inbound).await {
                        warn!(filename = %packet.filename, error = %e, "failed to stage packet");
                        continue;
                    }
                    staged.push((packet, found));
                }
                Ok(None) => warn!(filename = %packet.filename, "packet missing from hub inbound, skipping"),
                Err(e) => warn!(filename = %packet.filename, error = %e, "error searching hub inbound"),
            }
        }

        // 4.b Run game processor.
        let outcome = dosrunner::run(DosRunRequest {
            league_number,
            game,
            command: &league_config.processing_command,
            game_dos_path: &league_config.game_dos_path,
            data_dir: &self.data_dir,
            dosemu_path: &self.dosemu_path,
            dosemu_config_dir: &self.dosemu_config_dir,
            timeout: self.dosemu_timeout,
        })
        .await;

        let run_outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(league_number, game_key, error = %e, "dosemu invocation failed");
                return Ok(SubsetOutcome {
                    success: false,
                    packets_archived: 0,
                    output: format!("[{league_number}{game_key}] invocation error: {e}\n"),
                    error_message: Some(format!(
                        "{league_number}{game_key}: dosemu invocation failed: {e}"
                    )),
                });
            }
        };

        if !run_outcome.success {
            warn!(league_number, game_key, exit_code = ?run_outcome.exit_code, "game processor reported failure");
            return Ok(SubsetOutcome {
                success: false,
                packets_archived: 0,
                output: run_outcome.captured_output,
                error_message: Some(format!(
                    "{league_number}{game_key}: game processor exited with {:?}",
                    run_outcome.exit_code
                )),
            });
        }

        // 4.c Mark processed & archive.
        let mut archived = 0;
        for (packet, found_path) in &staged {
            if let Err(e) = Packet::mark_processed(packet.id, run_id, &self.pool).await {
                warn!(filename = %packet.filename, error = %e, "failed to mark packet processed");
                continue;
            }
            if let Err(e) = fsutil::move_with_overwrite(found_path, &hub_processed, &packet.filename).await {
                warn!(filename = %packet.filename, error = %e, "failed to archive packet");
                continue;
            }
            archived += 1;
        }

        // 4.d / 4.f Collect outbound (packets and nodelists).
        self.collect_outbound(run_id, &staging_outbound).await?;

        // 4.e Ingest artifacts (best effort).
        self.ingest_artifacts(run_id, league_number, game, league_config)
            .await;

        // 4.g Cleanup staging inbound.
        if let Err(e) = fs::remove_dir_all(&staging_inbound).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, "failed to clean up staging inbound directory");
            }
        }

        Ok(SubsetOutcome {
            success: true,
            packets_archived: archived,
            output: run_outcome.captured_output,
            error_message: None,
        })
    }

    /// Walk one outbound directory, routing nodelists to fan-out and
    /// packets into the catalog + hub outbound directory.
    async fn collect_outbound(&self, run_id: Uuid, outbound_dir: &Path) -> HubResult<()> {
        let mut entries = match fs::read_dir(outbound_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(anyhow::Error::from(e).into()),
        };

        while let Some(entry) = entries.next_entry().await.map_err(anyhow::Error::from)? {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if codec::is_nodelist_name(name) {
                if let Err(e) = self.nodelist_fanout(&path, name).await {
                    warn!(filename = name, error = %e, "nodelist fan-out failed");
                }
                continue;
            }

            let Some(parts) = codec::parse(name) else {
                continue;
            };

            if let Err(e) = self.handle_outbound_packet(run_id, &path, &parts).await {
                warn!(filename = name, error = %e, "failed to route outbound packet");
            }
        }

        Ok(())
    }

    async fn handle_outbound_packet(
        &self,
        run_id: Uuid,
        path: &Path,
        parts: &nova_hub_common::PacketName,
    ) -> HubResult<()> {
        // The directory watcher independently consumes packets addressed to the hub itself.
        let hub_index_hex = format!("{:02X}", self.hub_bbs_index());
        if parts.dest_bbs_index == hub_index_hex {
            return Ok(());
        }

        let league = self.find_or_create_league(&parts.league_number, parts.game).await?;
        let canonical_name = codec::format(parts);
        let checksum = fsutil::sha256_hex_file(path)
            .await
            .map_err(anyhow::Error::from)?;

        let hub_outbound = layout::hub_outbound_dir(&self.data_dir);
        fsutil::move_with_overwrite(path, &hub_outbound, &canonical_name)
            .await
            .map_err(anyhow::Error::from)?;

        let dest_path = hub_outbound.join(&canonical_name);
        let payload = fs::read(&dest_path).await.map_err(anyhow::Error::from)?;

        let packet = Packet::upsert(
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
        .await?;
        Packet::mark_processed(packet.id, run_id, &self.pool).await?;

        self.events.publish(HubEvent::PacketUploaded {
            packet_id: packet.id,
            filename: canonical_name,
            league_id: league.id,
            source_bbs_index: parts.source_bbs_index.clone(),
            dest_bbs_index: parts.dest_bbs_index.clone(),
            at: Utc::now(),
        });

        Ok(())
    }

    /// Fan a hub-generated nodelist out to one Packet row per active
    /// member.
    async fn nodelist_fanout(&self, path: &Path, name: &str) -> HubResult<()> {
        let Some(nodelist) = codec::parse_nodelist_name(name) else {
            return Ok(());
        };
        let league = self
            .find_or_create_league(&nodelist.league_number, nodelist.game)
            .await?;

        let canonical_name = codec::format_nodelist_name(nodelist.game, &nodelist.league_number);
        let dest_dir = layout::nodelists_dir(
            &self.data_dir,
            nodelist.game.as_config_key(),
            &nodelist.league_number,
        );
        fsutil::move_with_overwrite(path, &dest_dir, &canonical_name)
            .await
            .map_err(anyhow::Error::from)?;

        let final_path = dest_dir.join(&canonical_name);
        let payload = fs::read(&final_path).await.map_err(anyhow::Error::from)?;
        let checksum = fsutil::sha256_hex_bytes(&payload);

        let members = Membership::list_for_league(league.id, &self.pool).await?;
        for member in members {
            let dest_bbs_index = format!("{:02X}", member.bbs_index);
            Packet::upsert(
                &canonical_name,
                league.id,
                "00",
                &dest_bbs_index,
                0,
                payload.clone(),
                &checksum,
                None,
                Some(member.client_id),
                &self.pool,
            )
            .await?;

            self.events.publish(HubEvent::NodelistIngested {
                league_id: league.id,
                game: nodelist.game.as_str().to_string(),
                filename: canonical_name.clone(),
                dest_bbs_index,
                at: Utc::now(),
            });
        }

        Ok(())
    }

    /// Optionally run scores/routeinfo/bbsinfo commands and persist their
    /// output as artifacts. Failures here are warnings, not batch failures.
    async fn ingest_artifacts(
        &self,
        run_id: Uuid,
        league_number: &str,
        game: GameType,
        league_config: &nova_hub_common::LeagueDosConfig,
    ) {
        let commands: [(Option<&String>, ArtifactKind); 3] = [
            (league_config.scores_command.as_ref(), ArtifactKind::Score),
            (league_config.routeinfo_command.as_ref(), ArtifactKind::Routes),
            (league_config.bbsinfo_command.as_ref(), ArtifactKind::BbsInfo),
        ];

        for (command, kind) in commands {
            let Some(command) = command else { continue };
            let outcome = dosrunner::run(DosRunRequest {
                league_number,
                game,
                command,
                game_dos_path: &league_config.game_dos_path,
                data_dir: &self.data_dir,
                dosemu_path: &self.dosemu_path,
                dosemu_config_dir: &self.dosemu_config_dir,
                timeout: self.dosemu_timeout,
            })
            .await;

            match outcome {
                Ok(outcome) if outcome.success => {
                    if let Err(e) =
                        ProcessingArtifact::create(run_id, kind, &outcome.captured_output, &self.pool)
                            .await
                    {
                        warn!(?kind, error = %e, "failed to persist artifact");
                        continue;
                    }
                    self.events.publish(HubEvent::ArtifactCaptured {
                        run_id,
                        kind: kind.as_str().to_string(),
                        at: Utc::now(),
                    });
                }
                Ok(_) => warn!(?kind, "artifact command reported failure"),
                Err(e) => warn!(?kind, error = %e, "artifact command invocation failed"),
            }
        }
    }

    /// Phase 7: repeat outbound collection across every active league's
    /// configured outbound folder, independent of whether a batch was
    /// triggered for it this run.
    async fn outbound_sweep(&self, run_id: Uuid) -> HubResult<()> {
        let leagues = League::list_active(&self.pool).await?;
        for league in leagues {
            let Some(game) = league.game() else { continue };
            let Some(league_config) = self
                .file_config
                .dosemu
                .league_config(&league.league_number, game.as_config_key())
            else {
                continue;
            };
            let outbound_dir = PathBuf::from(&league_config.outbound_folder);
            self.collect_outbound(run_id, &outbound_dir).await?;
        }
        Ok(())
    }

    async fn find_or_create_league(&self, league_number: &str, game: GameType) -> HubResult<League> {
        if let Some(league) =
            League::find_by_number_and_game(league_number, game, &self.pool).await?
        {
            return Ok(league);
        }
        let display_name = format!("League {league_number}{}", game.as_char());
        League::create(league_number, game, &display_name, &self.pool).await
    }

    fn hub_bbs_index(&self) -> u8 {
        self.hub_bbs_index
    }
}
