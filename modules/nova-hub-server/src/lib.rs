//! Ingress/egress boundary: the axum HTTP + WebSocket surface over the
//! catalog, event bus, and batch processor.

pub mod auth;
pub mod rest;
pub mod state;
pub mod ws;

use std::sync::Arc;

use axum::routing::{get, put};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/leagues/{league_game}/packets/{name}",
            put(rest::upload::upload_packet).get(rest::download::download_packet),
        )
        .route("/leagues/{league_game}/packets", get(rest::list::list_packets))
        .route("/leagues/{league_game}/ws", get(ws::destination_socket))
        .route("/ws/dashboard", get(ws::dashboard_socket))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
