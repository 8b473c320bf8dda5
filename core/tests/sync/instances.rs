// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation of instances with remote dates and quotas.

use serde_json::json;
use ticketsync_core::{EntityKey, NoticeLevel, RecordStore, SyncOutcome};
use ticketsync_remote::Amount;

use crate::common::{FakeRemote, Harness, RemoteState, notices, test_instance, test_series};

async fn harness(state: RemoteState, days: &[(i64, u8)]) -> Harness {
    let harness = Harness::start(FakeRemote::start(state).await).await;
    let instances = days
        .iter()
        .map(|(id, day)| test_instance(*id, 1, *day))
        .collect();
    harness.catalogue.insert(test_series(1, instances));
    harness
}

#[tokio::test]
async fn removed_instance_deletes_its_date() {
    let harness = harness(
        RemoteState::multi_date_template(),
        &[(10, 1), (11, 8), (12, 15)],
    )
    .await;
    harness.synchronize_mirrored(1).await;
    let slug = harness.slug(1).await;
    assert_eq!(harness.remote.state().sub_event_ids(&slug), vec![101, 102, 103]);
    let writes = harness.remote.writes().len();

    harness
        .catalogue
        .update(1, |series| series.instances.retain(|i| i.id != 11));
    let (outcome, ctx) = harness.synchronize(1).await;

    assert!(!outcome.is_failed(), "{outcome:?}");
    assert!(notices(&ctx, NoticeLevel::Error).is_empty());
    assert_eq!(
        harness.remote.writes()[writes..],
        [format!("DELETE {slug}/subevents/102")]
    );
    assert_eq!(harness.remote.state().sub_event_ids(&slug), vec![101, 103]);
    assert_eq!(harness.record(EntityKey::instance(11)).await, None);

    let first = harness.record(EntityKey::instance(10)).await.unwrap();
    let third = harness.record(EntityKey::instance(12)).await.unwrap();
    assert_eq!(first.remote_sub_event_id, Some(101));
    assert_eq!(third.remote_sub_event_id, Some(103));
}

#[tokio::test]
async fn failing_instance_halts_the_run() {
    let mut state = RemoteState::multi_date_template();
    // the first new date comes with a quota of its own, the second needs a
    // clone of the template quota, which is limited to a variation the
    // product does not have
    state.quotas_with_next_sub_events = 1;
    state.quotas.get_mut("template").unwrap()[0]["variations"] = json!([70]);
    let harness = harness(state, &[(10, 1), (11, 8), (12, 15)]).await;

    let (outcome, ctx) = harness.synchronize_mirrored(1).await;

    let SyncOutcome::Failed { message } = &outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert!(message.starts_with("Instance 11: "), "{message}");
    assert!(message.contains("no variation"), "{message}");
    let errors = notices(&ctx, NoticeLevel::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Instance 11"), "{}", errors[0]);

    let slug = harness.slug(1).await;
    let writes = harness.remote.writes();
    assert_eq!(
        writes,
        vec![
            "POST template/clone".to_string(),
            format!("PATCH {slug}/items/1000"),
            format!("POST {slug}/subevents"),
            format!("POST {slug}/subevents"),
        ]
    );

    // the first instance is complete, reusing the quota it came with
    let first = harness.record(EntityKey::instance(10)).await.unwrap();
    assert_eq!(first.remote_sub_event_id, Some(101));
    assert_eq!(first.quota_id(), Some(1001));

    // the failing one keeps its date so the next run does not create another
    let second = harness.record(EntityKey::instance(11)).await.unwrap();
    assert_eq!(second.remote_sub_event_id, Some(102));
    assert_eq!(second.quota_id(), None);

    // never attempted
    assert_eq!(harness.record(EntityKey::instance(12)).await, None);
    assert_eq!(harness.remote.state().sub_event_ids(&slug), vec![101, 102]);
    assert_eq!(harness.remote.state().events[&slug]["live"], false);
}

#[tokio::test]
async fn updates_before_a_failing_instance_are_kept() {
    let harness = harness(RemoteState::multi_date_template(), &[(10, 1)]).await;
    harness.synchronize_mirrored(1).await;
    let slug = harness.slug(1).await;

    harness.remote.state().quotas.get_mut("template").unwrap()[0]["variations"] = json!([70]);
    harness.catalogue.update(1, |series| {
        series.label = "Poetry club".to_string();
        series.price = Some(Amount::from_minor(1500));
        series.instances.push(test_instance(11, 1, 8));
    });
    let (outcome, _) = harness.synchronize(1).await;
    assert!(outcome.is_failed(), "{outcome:?}");
    let writes = harness.remote.writes();
    assert!(writes.contains(&format!("PATCH {slug}")), "{writes:?}");
    assert!(writes.contains(&format!("PATCH {slug}/items/1000")), "{writes:?}");

    let series = harness.record(EntityKey::series(1)).await.unwrap();
    let event = series.event_snapshot.unwrap();
    assert_eq!(event.get("name"), Some(&json!({"en": "Poetry club"})));
    assert_eq!(series.product_snapshot.unwrap()[0]["default_price"], "15.00");

    // nothing changed locally, so only the failing quota is retried
    let (outcome, _) = harness.synchronize(1).await;
    let SyncOutcome::Failed { message } = &outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert!(message.starts_with("Instance 11: "), "{message}");
    assert_eq!(harness.remote.writes(), writes);
}

#[tokio::test]
async fn capacity_change_patches_quota_sizes() {
    let harness = harness(RemoteState::multi_date_template(), &[(10, 1), (11, 8)]).await;
    harness.synchronize_mirrored(1).await;
    let slug = harness.slug(1).await;
    let writes = harness.remote.writes().len();

    harness.catalogue.update(1, |series| {
        series.capacity = Some(30);
        series.instances[1].capacity = Some(5);
    });
    let (outcome, _) = harness.synchronize(1).await;

    assert!(!outcome.is_failed(), "{outcome:?}");
    assert_eq!(
        harness.remote.writes()[writes..],
        [
            format!("PATCH {slug}/quotas/1001"),
            format!("PATCH {slug}/quotas/1002"),
        ]
    );
    let quotas = harness.remote.state().quotas_of(&slug);
    assert_eq!(quotas[0]["size"], 30);
    assert_eq!(quotas[1]["size"], 5);

    let second = harness.record(EntityKey::instance(11)).await.unwrap();
    assert_eq!(second.quota_snapshot.unwrap()["size"], 5);
}

#[tokio::test]
async fn moved_instance_updates_only_changed_fields() {
    let harness = harness(RemoteState::multi_date_template(), &[(10, 1)]).await;
    harness.synchronize_mirrored(1).await;
    let slug = harness.slug(1).await;
    harness
        .remote
        .state()
        .sub_events
        .get_mut(&slug)
        .unwrap()[0]["comment"] = json!("set by the box office");
    let writes = harness.remote.writes().len();

    harness.catalogue.update(1, |series| {
        series.instances[0].label = Some("Reading club special".to_string());
    });
    let (outcome, _) = harness.synchronize(1).await;

    assert!(!outcome.is_failed(), "{outcome:?}");
    assert_eq!(
        harness.remote.writes()[writes..],
        [format!("PATCH {slug}/subevents/101")]
    );
    let state = harness.remote.state();
    let date = &state.sub_events[&slug][0];
    assert_eq!(date["name"], json!({"en": "Reading club special"}));
    assert_eq!(date["comment"], "set by the box office");
}

#[tokio::test]
async fn missing_quota_snapshot_is_restored() {
    let harness = harness(RemoteState::multi_date_template(), &[(10, 1)]).await;
    harness.synchronize_mirrored(1).await;
    let mut record = harness.record(EntityKey::instance(10)).await.unwrap();
    record.quota_snapshot = None;
    harness.store.save(&record).await.unwrap();
    let writes = harness.remote.writes();

    let (outcome, ctx) = harness.synchronize(1).await;

    assert!(!outcome.is_failed(), "{outcome:?}");
    assert!(notices(&ctx, NoticeLevel::Error).is_empty());
    assert_eq!(harness.remote.writes(), writes);
    let record = harness.record(EntityKey::instance(10)).await.unwrap();
    assert_eq!(record.quota_id(), Some(1001));
}

#[tokio::test]
async fn products_with_variations_get_variation_prices() {
    let mut state = RemoteState::multi_date_template();
    state.items.get_mut("template").unwrap()[0] = json!({
        "id": 1,
        "name": {"en": "Ticket"},
        "default_price": "0.00",
        "has_variations": true,
        "variations": [{"id": 70, "value": {"en": "Adult"}}, {"id": 71, "value": {"en": "Child"}}],
    });
    state.quotas.get_mut("template").unwrap()[0]["variations"] = json!([70, 71]);
    let harness = harness(state, &[(10, 1)]).await;

    let (outcome, _) = harness.synchronize_mirrored(1).await;

    assert!(!outcome.is_failed(), "{outcome:?}");
    let slug = harness.slug(1).await;
    let state = harness.remote.state();
    let date = &state.sub_events[&slug][0];
    assert_eq!(
        date["variation_price_overrides"],
        json!([
            {"variation": 70, "price": "12.50"},
            {"variation": 71, "price": "12.50"},
        ])
    );
    assert!(date.get("item_price_overrides").is_none());
    assert_eq!(state.quotas_of(&slug)[0]["variations"], json!([70]));
}
