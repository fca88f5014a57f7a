//! The two WebSocket endpoints: a per-destination stream keyed by a
//! caller's own league membership, and a dashboard stream of every bus
//! event plus an `initial_stats` snapshot on connect. Both reply to
//! inbound text frames with `pong` as a keepalive.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tracing::debug;
use uuid::Uuid;

use nova_hub_catalog::{League, Membership, Packet};
use nova_hub_events::HubEvent;

use crate::auth::{AuthenticatedClient, AuthenticatedOperator};
use crate::rest::{bad_request, forbidden, hub_error_response, not_found, parse_league_game};
use crate::state::AppState;

const PONG_FRAME: &str = r#"{"type":"pong"}"#;

pub async fn destination_socket(
    State(state): State<Arc<AppState>>,
    Path(league_game): Path<String>,
    AuthenticatedClient { client }: AuthenticatedClient,
    ws: WebSocketUpgrade,
) -> Response {
    let Some((league_number, game)) = parse_league_game(&league_game) else {
        return bad_request("malformed league path segment");
    };

    let league = match League::find_by_number_and_game(&league_number, game, &state.pool).await {
        Ok(Some(league)) => league,
        Ok(None) => return not_found("unknown league"),
        Err(e) => return hub_error_response(e),
    };

    let membership =
        match Membership::find_by_client_and_league(client.id, league.id, &state.pool).await {
            Ok(Some(membership)) => membership,
            Ok(None) => return forbidden("no active membership in this league"),
            Err(e) => return hub_error_response(e),
        };

    let dest_bbs_index = format!("{:02X}", membership.bbs_index);
    ws.on_upgrade(move |socket| run_destination_socket(socket, state, league.id, dest_bbs_index))
}

async fn run_destination_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    league_id: Uuid,
    dest_bbs_index: String,
) {
    let mut events = state.events.subscribe_destination(league_id, &dest_bbs_index);
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let Some(payload) = destination_payload(&event) else { continue };
                if sink.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(_))) => {
                        if sink.send(Message::Text(PONG_FRAME.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "destination socket read error");
                        break;
                    }
                }
            }
        }
    }
}

fn destination_payload(event: &HubEvent) -> Option<String> {
    match event {
        HubEvent::PacketUploaded { filename, .. } => Some(
            serde_json::json!({"type": "packet_available", "filename": filename}).to_string(),
        ),
        HubEvent::NodelistIngested { filename, .. } => Some(
            serde_json::json!({"type": "nodelist_available", "filename": filename}).to_string(),
        ),
        _ => None,
    }
}

pub async fn dashboard_socket(
    State(state): State<Arc<AppState>>,
    _operator: AuthenticatedOperator,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_dashboard_socket(socket, state))
}

async fn run_dashboard_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut events = state.events.subscribe_dashboard();
    let (mut sink, mut stream) = socket.split();

    if let Ok(snapshot) = initial_stats(&state).await {
        if sink.send(Message::Text(snapshot.into())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if let Ok(payload) = serde_json::to_string(&event) {
                            if sink.send(Message::Text(payload.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(_))) => {
                        if sink.send(Message::Text(PONG_FRAME.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "dashboard socket read error");
                        break;
                    }
                }
            }
        }
    }
}

async fn initial_stats(state: &AppState) -> Result<String, sqlx::Error> {
    let unprocessed = Packet::count_unprocessed(&state.pool)
        .await
        .map_err(|e| match e {
            nova_hub_common::NovaHubError::Database(e) => e,
            other => sqlx::Error::Protocol(other.to_string()),
        })?;
    let active_leagues = League::list_active(&state.pool)
        .await
        .map_err(|e| match e {
            nova_hub_common::NovaHubError::Database(e) => e,
            other => sqlx::Error::Protocol(other.to_string()),
        })?
        .len();

    Ok(serde_json::json!({
        "type": "initial_stats",
        "unprocessed_packets": unprocessed,
        "active_leagues": active_leagues,
    })
    .to_string())
}
