use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use nova_hub_catalog::{League, Membership, Packet};

use crate::auth::AuthenticatedClient;
use crate::rest::{bad_request, forbidden, hub_error_response, not_found, parse_league_game};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    unread: Option<bool>,
}

/// `GET /leagues/{NNN[BF]}/packets?unread=bool`.
pub async fn list_packets(
    State(state): State<Arc<AppState>>,
    Path(league_game): Path<String>,
    Query(query): Query<ListQuery>,
    AuthenticatedClient { client }: AuthenticatedClient,
) -> Response {
    let Some((league_number, game)) = parse_league_game(&league_game) else {
        return bad_request("malformed league path segment");
    };

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

    let dest_bbs_index = format!("{:02X}", membership.bbs_index);
    let unread_only = query.unread.unwrap_or(false);

    let packets = match Packet::list_for_destination(league.id, &dest_bbs_index, unread_only, &state.pool)
        .await
    {
        Ok(packets) => packets,
        Err(e) => return hub_error_response(e),
    };

    Json(serde_json::json!({ "packets": packets })).into_response()
}
