//! Integration tests for client/league/membership wiring against a real
//! Postgres instance.
//!
//! Run with: cargo test -p nova-hub-catalog --features test-utils --test membership_test

#![cfg(feature = "test-utils")]

use nova_hub_catalog::{Client, League, Membership};
use nova_hub_common::GameType;

#[tokio::test]
async fn find_active_requires_matching_bbs_index() {
    let (_container, pool) = nova_hub_catalog::testutil::postgres_container().await;

    let league = League::create("555", GameType::B, "Test League", &pool)
        .await
        .expect("league create failed");
    let client = Client::create("station-a", "hash", "Station A", &pool)
        .await
        .expect("client create failed");
    Membership::create(client.id, league.id, 2, "1:1/1", &pool)
        .await
        .expect("membership create failed");

    let as_registered = Membership::find_active(client.id, league.id, 2, &pool)
        .await
        .expect("lookup failed");
    assert!(as_registered.is_some());

    let wrong_index = Membership::find_active(client.id, league.id, 9, &pool)
        .await
        .expect("lookup failed");
    assert!(wrong_index.is_none());
}

#[tokio::test]
async fn find_by_client_and_league_ignores_bbs_index() {
    let (_container, pool) = nova_hub_catalog::testutil::postgres_container().await;

    let league = League::create("555", GameType::F, "Test League", &pool)
        .await
        .expect("league create failed");
    let client = Client::create("station-b", "hash", "Station B", &pool)
        .await
        .expect("client create failed");
    Membership::create(client.id, league.id, 7, "1:1/7", &pool)
        .await
        .expect("membership create failed");

    let mailbox = Membership::find_by_client_and_league(client.id, league.id, &pool)
        .await
        .expect("lookup failed")
        .expect("membership missing");
    assert_eq!(mailbox.bbs_index, 7);
}

#[tokio::test]
async fn list_for_league_only_returns_active_members() {
    let (_container, pool) = nova_hub_catalog::testutil::postgres_container().await;

    let league = League::create("900", GameType::B, "Another League", &pool)
        .await
        .expect("league create failed");
    let client_one = Client::create("station-c", "hash", "Station C", &pool)
        .await
        .expect("client create failed");
    let client_two = Client::create("station-d", "hash", "Station D", &pool)
        .await
        .expect("client create failed");
    Membership::create(client_one.id, league.id, 1, "1:1/1", &pool)
        .await
        .expect("membership create failed");
    Membership::create(client_two.id, league.id, 2, "1:1/2", &pool)
        .await
        .expect("membership create failed");

    let members = Membership::list_for_league(league.id, &pool)
        .await
        .expect("list failed");
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].bbs_index, 1);
    assert_eq!(members[1].bbs_index, 2);
}
