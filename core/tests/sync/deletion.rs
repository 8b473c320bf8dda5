// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Deleting remote counterparts and detaching series.

use ticketsync_core::{EntityKey, NoticeLevel, RecordStore, SyncContext, SyncOutcome, SyncStatus};

use crate::common::{FakeRemote, Harness, notices, test_instance, test_series};

async fn synchronized_harness() -> Harness {
    let harness = Harness::start(FakeRemote::multi_date().await).await;
    harness.catalogue.insert(test_series(
        1,
        vec![test_instance(10, 1, 1), test_instance(11, 1, 8)],
    ));
    let (outcome, _) = harness.synchronize_mirrored(1).await;
    assert!(!outcome.is_failed(), "{outcome:?}");
    harness
}

#[tokio::test]
async fn delete_remote_removes_event_and_records() {
    let harness = synchronized_harness().await;
    let slug = harness.slug(1).await;

    let mut ctx = SyncContext::new();
    assert!(harness.sync.delete_remote(&mut ctx, 1).await);

    assert_eq!(harness.remote.writes().last(), Some(&format!("DELETE {slug}")));
    assert!(!harness.remote.state().events.contains_key(&slug));
    assert!(harness.store.load_all().await.unwrap().is_empty());
    assert_eq!(notices(&ctx, NoticeLevel::Status).len(), 1);

    // nothing left to delete
    assert!(!harness.sync.delete_remote(&mut ctx, 1).await);
}

#[tokio::test]
async fn delete_remote_failure_keeps_records() {
    let harness = synchronized_harness().await;
    let slug = harness.slug(1).await;
    harness.remote.state().events.remove(&slug);

    let mut ctx = SyncContext::new();
    assert!(!harness.sync.delete_remote(&mut ctx, 1).await);

    let errors = notices(&ctx, NoticeLevel::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains(&format!("Cannot delete event {slug}")), "{}", errors[0]);
    assert!(harness.record(EntityKey::series(1)).await.is_some());
    assert!(harness.record(EntityKey::instance(10)).await.is_some());
}

#[tokio::test]
async fn delete_remote_instance_removes_its_date() {
    let harness = synchronized_harness().await;
    let slug = harness.slug(1).await;

    let mut ctx = SyncContext::new();
    assert!(harness.sync.delete_remote_instance(&mut ctx, 11).await);

    assert_eq!(
        harness.remote.writes().last(),
        Some(&format!("DELETE {slug}/subevents/102"))
    );
    assert_eq!(harness.remote.state().sub_event_ids(&slug), vec![101]);
    assert_eq!(harness.record(EntityKey::instance(11)).await, None);
    assert!(harness.record(EntityKey::instance(10)).await.is_some());

    // unknown instances have nothing to delete
    let requests = harness.remote.request_count().await;
    assert!(!harness.sync.delete_remote_instance(&mut ctx, 42).await);
    assert_eq!(harness.remote.request_count().await, requests);
    assert!(notices(&ctx, NoticeLevel::Error).is_empty());
}

#[tokio::test]
async fn detach_forgets_remote_side_without_requests() {
    let harness = synchronized_harness().await;
    let old_slug = harness.slug(1).await;
    let requests = harness.remote.request_count().await;

    let mut ctx = SyncContext::new();
    assert!(harness.sync.detach(&mut ctx, 1).await);

    assert_eq!(harness.remote.request_count().await, requests);
    let series = harness.record(EntityKey::series(1)).await.unwrap();
    assert!(!series.maintain_copy);
    assert_eq!(series.remote_event_slug, None);
    assert_eq!(series.template_reference.as_deref(), Some("template"));
    let instance = harness.record(EntityKey::instance(10)).await.unwrap();
    assert_eq!(instance.remote_event_slug, None);
    assert_eq!(instance.remote_sub_event_id, None);

    // mirroring again starts from a fresh clone
    let (outcome, _) = harness.synchronize_mirrored(1).await;
    let SyncOutcome::Synchronized { event, status } = &outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert_eq!(*status, SyncStatus::Created);
    assert_ne!(event.slug, old_slug);
    let clones = harness
        .remote
        .writes()
        .iter()
        .filter(|w| *w == "POST template/clone")
        .count();
    assert_eq!(clones, 2);
    let instance = harness.record(EntityKey::instance(10)).await.unwrap();
    assert_eq!(instance.remote_sub_event_id, Some(103));
    assert_eq!(instance.remote_event_slug.as_deref(), Some(event.slug.as_str()));
    assert_eq!(harness.remote.state().sub_event_ids(&old_slug), vec![101, 102]);
}

#[tokio::test]
async fn detach_unknown_series_is_a_no_op() {
    let harness = synchronized_harness().await;

    let mut ctx = SyncContext::new();
    assert!(!harness.sync.detach(&mut ctx, 7).await);
    assert!(ctx.notices().is_empty());
}
