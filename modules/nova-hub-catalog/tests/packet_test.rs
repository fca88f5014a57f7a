//! Integration tests for packet storage against a real Postgres instance.
//!
//! Requirements: Docker (for Postgres via testcontainers)
//!
//! Run with: cargo test -p nova-hub-catalog --features test-utils --test packet_test

#![cfg(feature = "test-utils")]

use nova_hub_catalog::{League, Packet};
use nova_hub_common::GameType;

async fn setup_league(pool: &sqlx::PgPool) -> League {
    League::create("555", GameType::B, "Test League", pool)
        .await
        .expect("failed to create league")
}

#[tokio::test]
async fn upsert_overwrites_by_filename_and_dest() {
    let (_container, pool) = nova_hub_catalog::testutil::postgres_container().await;
    let league = setup_league(&pool).await;

    let first = Packet::upsert(
        "555B0201.001",
        league.id,
        "02",
        "01",
        1,
        b"first".to_vec(),
        "deadbeef",
        None,
        None,
        &pool,
    )
    .await
    .expect("first upsert failed");

    let second = Packet::upsert(
        "555B0201.001",
        league.id,
        "02",
        "01",
        1,
        b"second".to_vec(),
        "c0ffee",
        None,
        None,
        &pool,
    )
    .await
    .expect("second upsert failed");

    assert_eq!(first.id, second.id);
    assert_eq!(second.payload, b"second");
    assert_eq!(second.checksum, "c0ffee");
    assert!(!second.downloaded);
    assert!(!second.processed);
}

#[tokio::test]
async fn upsert_keeps_distinct_rows_per_destination() {
    let (_container, pool) = nova_hub_catalog::testutil::postgres_container().await;
    let league = setup_league(&pool).await;

    Packet::upsert(
        "555B.nod", league.id, "00", "01", 0, b"a".to_vec(), "aaa", None, None, &pool,
    )
    .await
    .expect("upsert for dest 01 failed");
    Packet::upsert(
        "555B.nod", league.id, "00", "02", 0, b"b".to_vec(), "bbb", None, None, &pool,
    )
    .await
    .expect("upsert for dest 02 failed");

    let for_01 = Packet::find_by_filename_and_dest("555B.nod", "01", &pool)
        .await
        .expect("lookup failed")
        .expect("row for dest 01 missing");
    let for_02 = Packet::find_by_filename_and_dest("555B.nod", "02", &pool)
        .await
        .expect("lookup failed")
        .expect("row for dest 02 missing");

    assert_ne!(for_01.id, for_02.id);
    assert_eq!(for_01.payload, b"a");
    assert_eq!(for_02.payload, b"b");
}

#[tokio::test]
async fn list_for_destination_filters_unread_only() {
    let (_container, pool) = nova_hub_catalog::testutil::postgres_container().await;
    let league = setup_league(&pool).await;

    let packet = Packet::upsert(
        "555B0201.001", league.id, "02", "01", 1, b"p".to_vec(), "x", None, None, &pool,
    )
    .await
    .expect("upsert failed");

    let unread = Packet::list_for_destination(league.id, "01", true, &pool)
        .await
        .expect("list failed");
    assert_eq!(unread.len(), 1);

    Packet::mark_downloaded(packet.id, &pool)
        .await
        .expect("mark_downloaded failed");

    let unread_after = Packet::list_for_destination(league.id, "01", true, &pool)
        .await
        .expect("list failed");
    assert!(unread_after.is_empty());

    let all = Packet::list_for_destination(league.id, "01", false, &pool)
        .await
        .expect("list failed");
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn distinct_routes_dedupes_across_sequences() {
    let (_container, pool) = nova_hub_catalog::testutil::postgres_container().await;
    let league = setup_league(&pool).await;

    Packet::upsert(
        "555B0201.001", league.id, "02", "01", 1, b"p".to_vec(), "x", None, None, &pool,
    )
    .await
    .expect("upsert failed");
    Packet::upsert(
        "555B0201.002", league.id, "02", "01", 2, b"p".to_vec(), "y", None, None, &pool,
    )
    .await
    .expect("upsert failed");

    let routes = Packet::distinct_routes(&pool).await.expect("query failed");
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0], (league.id, "02".to_string(), "01".to_string()));
}
