//! Integration tests for the REST surface, driven through `build_router`
//! with `tower::ServiceExt::oneshot` instead of a bound TCP socket, against
//! a real Postgres instance.
//!
//! Requirements: Docker (for Postgres via testcontainers)
//!
//! Run with: cargo test -p nova-hub-server --features nova-hub-catalog/test-utils --test rest_test

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sha2::{Digest, Sha256};
use tower::ServiceExt;

use nova_hub_catalog::{testutil, Client, League, Membership};
use nova_hub_common::file_config::{DosemuSection, SecuritySection, ServerSection};
use nova_hub_common::{FileConfig, GameType};
use nova_hub_events::EventBus;
use nova_hub_processor::{BatchProcessor, SingletonGuard};
use nova_hub_server::{build_router, AppState};

fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

async fn make_state_with_pool(
    data_dir: &std::path::Path,
    pool: sqlx::PgPool,
) -> (Arc<AppState>, sqlx::PgPool) {
    let file_config = Arc::new(FileConfig {
        server: ServerSection {
            data_dir: data_dir.to_str().unwrap().to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
        },
        security: SecuritySection::default(),
        dosemu: DosemuSection {
            path: "/bin/true".to_string(),
            timeout: 5,
            config_dir: "./dosemu_configs".to_string(),
            leagues: Default::default(),
        },
    });
    let events = Arc::new(EventBus::new());
    let processor = Arc::new(BatchProcessor::new(
        pool.clone(),
        Arc::clone(&file_config),
        data_dir.to_path_buf(),
        "/bin/true".to_string(),
        data_dir.join("dosemu_configs"),
        Duration::from_secs(5),
        Arc::clone(&events),
        0,
    ));
    let state = Arc::new(AppState {
        pool: pool.clone(),
        file_config,
        data_dir: data_dir.to_path_buf(),
        events,
        processor,
        singleton: Arc::new(SingletonGuard::new()),
        hub_bbs_index: 0,
        operator_token: None,
    });
    (state, pool)
}

#[tokio::test]
async fn upload_then_list_round_trip() {
    let data_dir = tempfile::tempdir().expect("tempdir failed");
    let (_container, pool) = testutil::postgres_container().await;
    let (state, pool) = make_state_with_pool(data_dir.path(), pool).await;

    let league = League::create("555", GameType::B, "Test League", &pool)
        .await
        .expect("league create failed");
    let station_a = Client::create("station-a", &hash_secret("secret-a"), "Station A", &pool)
        .await
        .expect("client create failed");
    let station_b = Client::create("station-b", &hash_secret("secret-b"), "Station B", &pool)
        .await
        .expect("client create failed");
    Membership::create(station_a.id, league.id, 2, "1:1/2", &pool)
        .await
        .expect("membership create failed");
    Membership::create(station_b.id, league.id, 1, "1:1/1", &pool)
        .await
        .expect("membership create failed");

    let app = build_router(Arc::clone(&state));

    let upload = Request::builder()
        .method("PUT")
        .uri("/leagues/555B/packets/555B0201.001")
        .header("x-nova-client-id", "station-a")
        .header("x-nova-client-secret", "secret-a")
        .body(Body::from("turn data"))
        .unwrap();
    let response = app.clone().oneshot(upload).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let list_request = Request::builder()
        .method("GET")
        .uri("/leagues/555B/packets?unread=true")
        .header("x-nova-client-id", "station-b")
        .header("x-nova-client-secret", "secret-b")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(list_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let packets = json["packets"].as_array().expect("packets array missing");
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0]["filename"], "555B0201.001");
}

#[tokio::test]
async fn upload_rejects_wrong_source_membership() {
    let data_dir = tempfile::tempdir().expect("tempdir failed");
    let (_container, pool) = testutil::postgres_container().await;
    let (state, pool) = make_state_with_pool(data_dir.path(), pool).await;

    League::create("555", GameType::B, "Test League", &pool)
        .await
        .expect("league create failed");
    Client::create("station-a", &hash_secret("secret-a"), "Station A", &pool)
        .await
        .expect("client create failed");

    let app = build_router(state);
    let upload = Request::builder()
        .method("PUT")
        .uri("/leagues/555B/packets/555B0201.001")
        .header("x-nova-client-id", "station-a")
        .header("x-nova-client-secret", "secret-a")
        .body(Body::from("turn data"))
        .unwrap();
    let response = app.oneshot(upload).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn download_requires_membership_at_dest_bbs_index() {
    let data_dir = tempfile::tempdir().expect("tempdir failed");
    let (_container, pool) = testutil::postgres_container().await;
    let (state, _pool) = make_state_with_pool(data_dir.path(), pool).await;

    let league = League::create("555", GameType::B, "Test League", &state.pool)
        .await
        .expect("league create failed");
    let outsider = Client::create("outsider", &hash_secret("secret"), "Outsider", &state.pool)
        .await
        .expect("client create failed");
    // Membership at the wrong bbs_index (2, not the packet's dest of 1).
    Membership::create(outsider.id, league.id, 2, "1:1/2", &state.pool)
        .await
        .expect("membership create failed");

    nova_hub_catalog::Packet::upsert(
        "555B0201.001",
        league.id,
        "02",
        "01",
        1,
        b"turn data".to_vec(),
        "checksum",
        None,
        None,
        &state.pool,
    )
    .await
    .expect("packet upsert failed");
    tokio::fs::create_dir_all(state.hub_outbound_dir())
        .await
        .expect("failed to create outbound dir");
    tokio::fs::write(state.hub_outbound_dir().join("555B0201.001"), b"turn data")
        .await
        .expect("failed to write outbound file");

    let app = build_router(Arc::clone(&state));
    let download = Request::builder()
        .method("GET")
        .uri("/leagues/555B/packets/555B0201.001")
        .header("x-nova-client-id", "outsider")
        .header("x-nova-client-secret", "secret")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(download).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn download_returns_bytes_once_routed_to_outbound() {
    let data_dir = tempfile::tempdir().expect("tempdir failed");
    let (_container, pool) = testutil::postgres_container().await;
    let (state, _pool) = make_state_with_pool(data_dir.path(), pool).await;

    let league = League::create("555", GameType::B, "Test League", &state.pool)
        .await
        .expect("league create failed");
    let station_b = Client::create("station-b", &hash_secret("secret-b"), "Station B", &state.pool)
        .await
        .expect("client create failed");
    Membership::create(station_b.id, league.id, 1, "1:1/1", &state.pool)
        .await
        .expect("membership create failed");

    nova_hub_catalog::Packet::upsert(
        "555B0201.001",
        league.id,
        "02",
        "01",
        1,
        b"turn data".to_vec(),
        "checksum",
        None,
        None,
        &state.pool,
    )
    .await
    .expect("packet upsert failed");
    tokio::fs::create_dir_all(state.hub_outbound_dir())
        .await
        .expect("failed to create outbound dir");
    tokio::fs::write(state.hub_outbound_dir().join("555B0201.001"), b"turn data")
        .await
        .expect("failed to write outbound file");

    let app = build_router(Arc::clone(&state));
    let download = Request::builder()
        .method("GET")
        .uri("/leagues/555B/packets/555B0201.001")
        .header("x-nova-client-id", "station-b")
        .header("x-nova-client-secret", "secret-b")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(download).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"turn data");
}
