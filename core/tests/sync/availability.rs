// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Availability refresh on order notifications.

use serde_json::json;
use ticketsync_core::{EntityKey, NoticeLevel, OrderAction, SyncContext};

use crate::common::{FakeRemote, Harness, ORGANIZER, notices, test_instance, test_series};

async fn synchronized_harness() -> (Harness, String) {
    let harness = Harness::start(FakeRemote::multi_date().await).await;
    harness.catalogue.insert(test_series(
        1,
        vec![test_instance(10, 1, 1), test_instance(11, 1, 8)],
    ));
    let (outcome, _) = harness.synchronize_mirrored(1).await;
    assert!(!outcome.is_failed(), "{outcome:?}");
    let slug = harness.slug(1).await;

    {
        let mut state = harness.remote.state();
        state.orders.insert(
            (slug.clone(), "ABC12".to_string()),
            json!({
                "code": "ABC12",
                "status": "p",
                "positions": [
                    {"id": 1, "item": 1000, "subevent": 101},
                    {"id": 2, "item": 1000, "subevent": 101},
                ],
            }),
        );
        state
            .availability
            .insert(1001, json!({"available": false, "available_number": 0}));
    }
    (harness, slug)
}

#[tokio::test]
async fn paid_order_refreshes_dates_and_event() {
    let (harness, slug) = synchronized_harness().await;
    let writes = harness.remote.writes();

    let mut ctx = SyncContext::new();
    harness
        .sync
        .on_order_notification(&mut ctx, ORGANIZER, &slug, "ABC12", OrderAction::PAID)
        .await;

    assert!(ctx.notices().is_empty(), "{:?}", ctx.notices());
    assert_eq!(harness.remote.writes(), writes);

    let sold_out = harness.record(EntityKey::instance(10)).await.unwrap();
    assert_eq!(sold_out.available, Some(false));
    let snapshot = sold_out.availability_snapshot.unwrap();
    assert_eq!(snapshot.as_array().unwrap().len(), 1);
    assert_eq!(snapshot[0]["id"], 1001);
    assert_eq!(snapshot[0]["availability"]["available_number"], 0);

    let untouched = harness.record(EntityKey::instance(11)).await.unwrap();
    assert_eq!(untouched.available, None);

    let series = harness.record(EntityKey::series(1)).await.unwrap();
    assert_eq!(series.available, Some(true));
    assert_eq!(
        series.availability_snapshot.unwrap().as_array().unwrap().len(),
        2
    );

    assert_eq!(
        harness.catalogue.invalidated(),
        vec![EntityKey::instance(10), EntityKey::series(1)]
    );
}

#[tokio::test]
async fn canceled_order_refreshes_too() {
    let (harness, slug) = synchronized_harness().await;
    harness.remote.state().availability.clear();

    let mut ctx = SyncContext::new();
    harness
        .sync
        .on_order_notification(&mut ctx, ORGANIZER, &slug, "ABC12", OrderAction::CANCELED)
        .await;

    let record = harness.record(EntityKey::instance(10)).await.unwrap();
    assert_eq!(record.available, Some(true));
    assert_eq!(harness.catalogue.invalidated().len(), 2);
}

#[tokio::test]
async fn other_actions_are_ignored() {
    let (harness, slug) = synchronized_harness().await;
    let requests = harness.remote.request_count().await;

    let mut ctx = SyncContext::new();
    harness
        .sync
        .on_order_notification(&mut ctx, ORGANIZER, &slug, "ABC12", "pretix.event.order.placed")
        .await;

    assert_eq!(harness.remote.request_count().await, requests);
    assert!(ctx.notices().is_empty());
    assert!(harness.catalogue.invalidated().is_empty());
}

#[tokio::test]
async fn events_not_mirrored_here_are_ignored() {
    let (harness, _) = synchronized_harness().await;
    let requests = harness.remote.request_count().await;

    let mut ctx = SyncContext::new();
    harness
        .sync
        .on_order_notification(&mut ctx, ORGANIZER, "elsewhere", "ABC12", OrderAction::PAID)
        .await;

    assert_eq!(harness.remote.request_count().await, requests);
    assert!(ctx.notices().is_empty());
}

#[tokio::test]
async fn unknown_order_is_reported() {
    let (harness, slug) = synchronized_harness().await;

    let mut ctx = SyncContext::new();
    harness
        .sync
        .on_order_notification(&mut ctx, ORGANIZER, &slug, "NOPE1", OrderAction::PAID)
        .await;

    let errors = notices(&ctx, NoticeLevel::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Cannot get order NOPE1"), "{}", errors[0]);
    assert!(harness.catalogue.invalidated().is_empty());
}
