use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, warn};

use nova_hub_catalog::{League, Membership, Packet};
use nova_hub_codec as codec;
use nova_hub_common::fsutil;
use nova_hub_events::HubEvent;

use crate::auth::AuthenticatedClient;
use crate::rest::{bad_request, forbidden, hub_error_response, parse_league_game};
use crate::state::AppState;

/// `PUT /leagues/{NNN[BF]}/packets/{name}`.
pub async fn upload_packet(
    State(state): State<Arc<AppState>>,
    Path((league_game, filename)): Path<(String, String)>,
    AuthenticatedClient { client }: AuthenticatedClient,
    body: Bytes,
) -> Response {
    if filename.to_ascii_uppercase().starts_with("BRNODES.")
        || filename.to_ascii_uppercase().starts_with("FENODES.")
    {
        return forbidden("nodelists are hub-generated and cannot be uploaded");
    }

    let Some(parsed) = codec::parse(&filename) else {
        return bad_request("malformed packet filename");
    };

    let Some((url_number, url_game)) = parse_league_game(&league_game) else {
        return bad_request("malformed league path segment");
    };
    if parsed.league_number != url_number || parsed.game != url_game {
        return bad_request("filename does not match league path");
    }

    let league = match resolve_or_create_league(&url_number, url_game, &state).await {
        Ok(league) => league,
        Err(resp) => return resp,
    };

    let source_index: i16 = match i16::from_str_radix(&parsed.source_bbs_index, 16) {
        Ok(v) => v,
        Err(_) => return bad_request("malformed source bbs_index"),
    };
    match Membership::find_active(client.id, league.id, source_index, &state.pool).await {
        Ok(Some(_)) => {}
        Ok(None) => return forbidden("no active membership for this source bbs_index"),
        Err(e) => return hub_error_response(e),
    }

    let canonical_name = codec::format(&parsed);
    let hub_inbound = state.hub_inbound_dir();
    if let Err(e) = tokio::fs::create_dir_all(&hub_inbound).await {
        warn!(error = %e, "failed to create hub inbound directory");
        return hub_error_response(nova_hub_common::NovaHubError::TransientIo(e.to_string()));
    }
    let dest_path = hub_inbound.join(&canonical_name);
    if let Some(existing) = fsutil::find_case_insensitive(&hub_inbound, &canonical_name)
        .await
        .ok()
        .flatten()
    {
        let _ = tokio::fs::remove_file(&existing).await;
    }
    if let Err(e) = tokio::fs::write(&dest_path, &body).await {
        warn!(error = %e, "failed to write uploaded packet");
        return hub_error_response(nova_hub_common::NovaHubError::TransientIo(e.to_string()));
    }
    let checksum = fsutil::sha256_hex_bytes(&body);

    let packet = match Packet::upsert(
        &canonical_name,
        league.id,
        &parsed.source_bbs_index,
        &parsed.dest_bbs_index,
        parsed.sequence_number as i16,
        body.to_vec(),
        &checksum,
        None,
        None,
        &state.pool,
    )
    .await
    {
        Ok(packet) => packet,
        Err(e) => return hub_error_response(e),
    };

    info!(filename = %canonical_name, packet_id = %packet.id, client = %client.client_id, "packet uploaded");

    state.events.publish(HubEvent::PacketUploaded {
        packet_id: packet.id,
        filename: canonical_name.clone(),
        league_id: league.id,
        source_bbs_index: parsed.source_bbs_index.clone(),
        dest_bbs_index: parsed.dest_bbs_index.clone(),
        at: chrono::Utc::now(),
    });

    state.trigger_batch();

    Json(serde_json::json!({
        "status": "received",
        "filename": canonical_name,
        "packet_id": packet.id,
    }))
    .into_response()
}

async fn resolve_or_create_league(
    league_number: &str,
    game: nova_hub_common::GameType,
    state: &AppState,
) -> Result<League, Response> {
    match League::find_by_number_and_game(league_number, game, &state.pool).await {
        Ok(Some(league)) => Ok(league),
        Ok(None) => {
            let display_name = format!("League {league_number}{}", game.as_char());
            League::create(league_number, game, &display_name, &state.pool)
                .await
                .map_err(hub_error_response)
        }
        Err(e) => Err(hub_error_response(e)),
    }
}
