//! Sequence gap detection and auto-resolution.

pub mod gaps;

use chrono::Utc;
use nova_hub_catalog::{Packet, SequenceAlert};
use nova_hub_common::HubResult;
use nova_hub_events::{EventBus, HubEvent};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

pub use gaps::{find_gaps, Gap};

/// Re-run gap detection for one route and persist any newly-discovered
/// gaps as unresolved alerts. A gap already tracked by an open alert at
/// the same `expected_seq` is not duplicated. Publishes a
/// `SequenceGapDetected` event for every alert raised (new or refreshed).
pub async fn validate_route(
    league_id: Uuid,
    source_bbs_index: &str,
    dest_bbs_index: &str,
    pool: &PgPool,
    events: &EventBus,
) -> HubResult<Vec<Gap>> {
    let sequences =
        Packet::sequence_numbers_for_route(league_id, source_bbs_index, dest_bbs_index, pool)
            .await?;
    let gaps = find_gaps(&sequences);

    for gap in &gaps {
        let alert = SequenceAlert::raise(
            league_id,
            source_bbs_index,
            dest_bbs_index,
            gap.expected_seq,
            None,
            gap.gap_size,
            pool,
        )
        .await?;
        info!(
            league_id = %league_id, route = %format!("{source_bbs_index}->{dest_bbs_index}"),
            expected_seq = gap.expected_seq, alert_id = %alert.id,
            "sequence gap recorded",
        );
        events.publish(HubEvent::SequenceGapDetected {
            alert_id: alert.id,
            league_id,
            source_bbs_index: source_bbs_index.to_string(),
            dest_bbs_index: dest_bbs_index.to_string(),
            expected_seq: gap.expected_seq,
            received_seq: None,
            gap_size: gap.gap_size,
            at: Utc::now(),
        });
    }

    Ok(gaps)
}

/// For every unresolved alert in a league, resolve it if a packet matching
/// its `(route, expected_seq)` now exists.
/// Only the batch processor calls this — ingress upload never does;
/// synchronous auto-resolve on upload was left out of scope.
pub async fn auto_resolve(league_id: Uuid, pool: &PgPool) -> HubResult<usize> {
    let open = SequenceAlert::list_open(league_id, pool).await?;
    let mut resolved = 0;

    for alert in open {
        let filled = Packet::exists_at_sequence(
            alert.league_id,
            &alert.source_bbs_index,
            &alert.dest_bbs_index,
            alert.expected_seq,
            pool,
        )
        .await?;

        if filled {
            SequenceAlert::resolve(alert.id, Some("received"), pool).await?;
            resolved += 1;
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_gaps_reexported() {
        assert!(find_gaps(&[1, 2, 3]).is_empty());
    }
}
