//! Integration tests for sequence alert bookkeeping against a real
//! Postgres instance.
//!
//! Run with: cargo test -p nova-hub-catalog --features test-utils --test sequence_alert_test

#![cfg(feature = "test-utils")]

use nova_hub_catalog::{League, SequenceAlert};
use nova_hub_common::GameType;

#[tokio::test]
async fn raise_is_idempotent_for_same_open_gap() {
    let (_container, pool) = nova_hub_catalog::testutil::postgres_container().await;
    let league = League::create("555", GameType::B, "Test League", &pool)
        .await
        .expect("league create failed");

    let first = SequenceAlert::raise(league.id, "02", "01", 5, None, 1, &pool)
        .await
        .expect("first raise failed");
    let second = SequenceAlert::raise(league.id, "02", "01", 5, None, 1, &pool)
        .await
        .expect("second raise failed");

    assert_eq!(first.id, second.id);

    let open = SequenceAlert::list_open(league.id, &pool)
        .await
        .expect("list_open failed");
    assert_eq!(open.len(), 1);
}

#[tokio::test]
async fn resolved_alert_no_longer_lists_as_open() {
    let (_container, pool) = nova_hub_catalog::testutil::postgres_container().await;
    let league = League::create("555", GameType::F, "Test League", &pool)
        .await
        .expect("league create failed");

    let alert = SequenceAlert::raise(league.id, "03", "01", 8, None, 1, &pool)
        .await
        .expect("raise failed");
    SequenceAlert::resolve(alert.id, Some("received"), &pool)
        .await
        .expect("resolve failed");

    let open = SequenceAlert::list_open(league.id, &pool)
        .await
        .expect("list_open failed");
    assert!(open.is_empty());
}

#[tokio::test]
async fn a_new_gap_after_resolution_raises_again() {
    let (_container, pool) = nova_hub_catalog::testutil::postgres_container().await;
    let league = League::create("555", GameType::B, "Test League", &pool)
        .await
        .expect("league create failed");

    let first = SequenceAlert::raise(league.id, "02", "01", 5, None, 1, &pool)
        .await
        .expect("first raise failed");
    SequenceAlert::resolve(first.id, Some("received"), &pool)
        .await
        .expect("resolve failed");

    let second = SequenceAlert::raise(league.id, "02", "01", 5, None, 1, &pool)
        .await
        .expect("second raise failed");

    assert_ne!(first.id, second.id);
    let open = SequenceAlert::list_open(league.id, &pool)
        .await
        .expect("list_open failed");
    assert_eq!(open.len(), 1);
}
