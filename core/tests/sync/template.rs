// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use serde_json::json;

use crate::common::{FakeRemote, Harness, RemoteState, TEMPLATE};

#[tokio::test]
async fn usable_templates_have_no_problems() {
    for remote in [FakeRemote::multi_date().await, FakeRemote::singular().await] {
        let harness = Harness::start(remote).await;
        let problems = harness.sync.validate_template_event(TEMPLATE).await.unwrap();
        assert!(problems.is_empty(), "{problems:?}");
        assert!(harness.remote.writes().is_empty());
    }
}

#[tokio::test]
async fn template_problems_are_listed() {
    let mut state = RemoteState::multi_date_template();
    state.events.get_mut(TEMPLATE).unwrap()["live"] = json!(true);
    let second_date = json!({"id": 51, "event": TEMPLATE, "date_from": "2026-01-02T10:00:00+01:00"});
    state.sub_events.get_mut(TEMPLATE).unwrap().push(second_date);
    state.quotas.get_mut(TEMPLATE).unwrap().clear();
    let harness = Harness::start(FakeRemote::start(state).await).await;

    let problems = harness.sync.validate_template_event(TEMPLATE).await.unwrap();

    assert_eq!(
        problems,
        vec![
            "Template event template must not be live".to_string(),
            "Template event template must have exactly one date, found 2".to_string(),
            "Template event template must have exactly one quota, found 0".to_string(),
        ]
    );
}

#[tokio::test]
async fn missing_template_is_an_error() {
    let harness = Harness::start(FakeRemote::start(RemoteState::new()).await).await;

    let err = harness
        .sync
        .validate_template_event("nowhere")
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert!(err.to_string().contains("Cannot get template event nowhere"));
}
