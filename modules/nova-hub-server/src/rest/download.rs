use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::info;

use nova_hub_catalog::{League, Membership, Packet};
use nova_hub_codec as codec;
use nova_hub_common::fsutil;
use nova_hub_events::HubEvent;

use crate::auth::AuthenticatedClient;
use crate::rest::{bad_request, forbidden, hub_error_response, not_found, parse_league_game};
use crate::state::AppState;

/// `GET /leagues/{NNN[BF]}/packets/{name}`.
pub async fn download_packet(
    State(state): State<Arc<AppState>>,
    Path((league_game, filename)): Path<(String, String)>,
    AuthenticatedClient { client }: AuthenticatedClient,
) -> Response {
    let Some((url_number, url_game)) = parse_league_game(&league_game) else {
        return bad_request("malformed league path segment");
    };

    if let Some(nodelist) = codec::parse_nodelist_name(&filename) {
        if nodelist.league_number != url_number || nodelist.game != url_game {
            return bad_request("filename does not match league path");
        }
        return download_nodelist(state, client, url_number, url_game, nodelist.league_number).await;
    }

    let Some(parsed) = codec::parse(&filename) else {
        return bad_request("malformed packet filename");
    };
    if parsed.league_number != url_number || parsed.game != url_game {
        return bad_request("filename does not match league path");
    }

    let league = match League::find_by_number_and_game(&url_number, url_game, &state.pool).await {
        Ok(Some(league)) => league,
        Ok(None) => return not_found("unknown league"),
        Err(e) => return hub_error_response(e),
    };

    let dest_index: i16 = match i16::from_str_radix(&parsed.dest_bbs_index, 16) {
        Ok(v) => v,
        Err(_) => return bad_request("malformed dest bbs_index"),
    };
    match Membership::find_active(client.id, league.id, dest_index, &state.pool).await {
        Ok(Some(_)) => {}
        Ok(None) => return forbidden("no active membership for this destination bbs_index"),
        Err(e) => return hub_error_response(e),
    }

    let canonical_name = codec::format(&parsed);
    let packet =
        match Packet::find_latest_for_download(&canonical_name, &parsed.dest_bbs_index, &state.pool).await
        {
            Ok(Some(packet)) => packet,
            Ok(None) => return not_found("packet not on file"),
            Err(e) => return hub_error_response(e),
        };

    let hub_outbound = state.hub_outbound_dir();
    let Some(found) = fsutil::find_case_insensitive(&hub_outbound, &canonical_name)
        .await
        .ok()
        .flatten()
    else {
        return not_found("packet file missing from outbound mailbox");
    };
    let bytes = match tokio::fs::read(&found).await {
        Ok(bytes) => bytes,
        Err(_) => return not_found("packet file missing from outbound mailbox"),
    };

    if let Err(e) = Packet::mark_downloaded(packet.id, &state.pool).await {
        return hub_error_response(e);
    }

    info!(filename = %canonical_name, client = %client.client_id, "packet downloaded");
    state.events.publish(HubEvent::PacketDownloaded {
        packet_id: packet.id,
        filename: canonical_name.clone(),
        league_id: league.id,
        dest_bbs_index: parsed.dest_bbs_index.clone(),
        at: chrono::Utc::now(),
    });

    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response()
}

async fn download_nodelist(
    state: Arc<AppState>,
    client: nova_hub_catalog::Client,
    league_number: String,
    game: nova_hub_common::GameType,
    nodelist_league_number: String,
) -> Response {
    let league = match League::find_by_number_and_game(&league_number, game, &state.pool).await {
        Ok(Some(league)) => league,
        Ok(None) => return not_found("unknown league"),
        Err(e) => return hub_error_response(e),
    };

    let membership = match Membership::find_by_client_and_league(client.id, league.id, &state.pool).await
    {
        Ok(Some(membership)) => membership,
        Ok(None) => return forbidden("no active membership in this league"),
        Err(e) => return hub_error_response(e),
    };

    let canonical_name = codec::format_nodelist_name(game, &nodelist_league_number);
    let dest_bbs_index = format!("{:02X}", membership.bbs_index);

    let packet = match Packet::find_by_filename_and_dest(&canonical_name, &dest_bbs_index, &state.pool)
        .await
    {
        Ok(Some(packet)) => packet,
        Ok(None) => return not_found("nodelist not on file for this member"),
        Err(e) => return hub_error_response(e),
    };

    let dir = state.nodelists_dir(game, &nodelist_league_number);
    let Some(found) = fsutil::find_case_insensitive(&dir, &canonical_name).await.ok().flatten() else {
        return not_found("nodelist file missing on disk");
    };
    let bytes = match tokio::fs::read(&found).await {
        Ok(bytes) => bytes,
        Err(_) => return not_found("nodelist file missing on disk"),
    };

    if let Err(e) = Packet::mark_downloaded(packet.id, &state.pool).await {
        return hub_error_response(e);
    }

    info!(filename = %canonical_name, client = %client.client_id, "nodelist downloaded");
    state.events.publish(HubEvent::PacketDownloaded {
        packet_id: packet.id,
        filename: canonical_name,
        league_id: league.id,
        dest_bbs_index,
        at: chrono::Utc::now(),
    });

    ([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response()
}
