use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything the in-process bus fans out to dashboards and per-destination
/// listeners. Unlike the catalog, this is never persisted —
/// a listener that isn't connected when an event fires simply misses it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubEvent {
    PacketUploaded {
        packet_id: Uuid,
        filename: String,
        league_id: Uuid,
        source_bbs_index: String,
        dest_bbs_index: String,
        at: DateTime<Utc>,
    },
    PacketDownloaded {
        packet_id: Uuid,
        filename: String,
        league_id: Uuid,
        dest_bbs_index: String,
        at: DateTime<Utc>,
    },
    SequenceGapDetected {
        alert_id: Uuid,
        league_id: Uuid,
        source_bbs_index: String,
        dest_bbs_index: String,
        expected_seq: i16,
        received_seq: Option<i16>,
        gap_size: i16,
        at: DateTime<Utc>,
    },
    BatchRunStarted {
        run_id: Uuid,
        league_id: Option<Uuid>,
        at: DateTime<Utc>,
    },
    BatchRunCompleted {
        run_id: Uuid,
        status: String,
        packets_processed: i32,
        packets_failed: i32,
        at: DateTime<Utc>,
    },
    ArtifactCaptured {
        run_id: Uuid,
        kind: String,
        at: DateTime<Utc>,
    },
    NodelistIngested {
        league_id: Uuid,
        game: String,
        filename: String,
        dest_bbs_index: String,
        at: DateTime<Utc>,
    },
}

impl HubEvent {
    /// Routing key for the per-destination channel, if this event is
    /// addressed to one specific bbs_index. Dashboard listeners see
    /// everything regardless of this value.
    pub fn destination_key(&self) -> Option<String> {
        match self {
            HubEvent::PacketUploaded {
                league_id,
                dest_bbs_index,
                ..
            }
            | HubEvent::PacketDownloaded {
                league_id,
                dest_bbs_index,
                ..
            }
            | HubEvent::NodelistIngested {
                league_id,
                dest_bbs_index,
                ..
            } => Some(destination_key(*league_id, dest_bbs_index)),
            _ => None,
        }
    }
}

pub fn destination_key(league_id: Uuid, dest_bbs_index: &str) -> String {
    format!("{league_id}:{dest_bbs_index}")
}
