//! End-to-end fan-out and broadcast behavior over in-memory collaborators.

mod support;

use push_dispatch::{Action, Category, Phase, Platform, PushMessage, RegisterOutcome};
use support::{ctx, make_harness, Harness};

fn message() -> PushMessage {
    PushMessage::new("Title", "Body", Category::Notice).with_web_link("https://example.com")
}

async fn register(harness: &Harness, device_token: &str, user_id: &str) -> String {
    let outcome = harness
        .service
        .register(&ctx(), device_token, Platform::Ios, Some(user_id))
        .await
        .expect("register should succeed");
    match outcome {
        RegisterOutcome::Registered(record) => record.endpoint_arn,
        RegisterOutcome::AlreadyRegistered => panic!("device was already registered"),
    }
}

#[tokio::test]
async fn empty_target_list_touches_nothing() {
    let harness = make_harness();

    let message_ids = harness
        .service
        .send_to_users(&ctx(), &[], &message())
        .await
        .expect("empty send should succeed");

    assert!(message_ids.is_empty());
    assert_eq!(harness.transport.publish_count().await, 0);
    assert_eq!(harness.audit.entry_count().await, 0);
    assert_eq!(harness.webhook.notice_count().await, 0);
}

#[tokio::test]
async fn unresolvable_targets_produce_no_audit_or_webhook() {
    let harness = make_harness();

    let message_ids = harness
        .service
        .send_to_users(&ctx(), &["ghost".to_string()], &message())
        .await
        .expect("send to unresolvable users should succeed");

    assert!(message_ids.is_empty());
    assert_eq!(harness.transport.publish_count().await, 0);
    assert_eq!(harness.audit.entry_count().await, 0);
    assert_eq!(harness.webhook.notice_count().await, 0);
}

#[tokio::test]
async fn mixed_targets_deliver_to_the_resolvable_subset() {
    let harness = make_harness();
    register(&harness, "tok-1", "u1").await;
    let requested = vec!["u1".to_string(), "u2".to_string()];

    let message_ids = harness
        .service
        .send_to_users(&ctx(), &requested, &message())
        .await
        .expect("send should succeed");

    assert_eq!(message_ids.len(), 1);
    assert_eq!(harness.transport.publish_count().await, 1);

    // The webhook fires once with the requested set, not the resolved one.
    let notices = harness.webhook.notices.lock().await;
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].user_ids, requested);
    assert_eq!(notices[0].message_ids, message_ids);

    let entries = harness.audit.entries.lock().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, Action::Send);
    assert_eq!(entries[0].phase, Phase::Success);
    assert_eq!(
        entries[0].user_ids,
        vec!["u#u1".to_string(), "u#u2".to_string()]
    );
    assert_eq!(entries[0].message_ids, message_ids);
}

#[tokio::test]
async fn one_failing_target_never_aborts_its_siblings() {
    let harness = make_harness();
    register(&harness, "tok-1", "u1").await;
    let endpoint_two = register(&harness, "tok-2", "u2").await;
    harness.transport.fail_destination(&endpoint_two).await;

    let message_ids = harness
        .service
        .send_to_users(&ctx(), &["u1".to_string(), "u2".to_string()], &message())
        .await
        .expect("partial failure must not raise");

    assert_eq!(message_ids.len(), 1);
    assert_eq!(harness.webhook.notice_count().await, 1);
}

#[tokio::test]
async fn resolution_failure_fails_the_whole_send() {
    let harness = make_harness();
    register(&harness, "tok-1", "u1").await;
    harness.store.fail_queries(true);

    let err = harness
        .service
        .send_to_users(&ctx(), &["u1".to_string()], &message())
        .await
        .expect_err("resolution errors are total");

    assert!(err.to_string().starts_with("send error:"));
    assert_eq!(harness.transport.publish_count().await, 0);

    let entries = harness.audit.entries.lock().await;
    let failure = entries
        .iter()
        .find(|entry| entry.phase == Phase::Fail)
        .expect("a failure entry should be recorded");
    assert_eq!(failure.action, Action::Send);
}

#[tokio::test]
async fn unicast_payload_reaches_the_resolved_endpoint() {
    let harness = make_harness();
    let endpoint = register(&harness, "tok-1", "u1").await;
    let message = message();

    harness
        .service
        .send_to_users(&ctx(), &["u1".to_string()], &message)
        .await
        .expect("send should succeed");

    let published = harness.transport.published.lock().await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].destination, endpoint);
    assert!(!published[0].broadcast);

    let envelope: serde_json::Value =
        serde_json::from_str(&published[0].payload).expect("payload should be JSON");
    let inner: serde_json::Value = serde_json::from_str(
        envelope["APNS"].as_str().expect("APNS should be a string"),
    )
    .expect("APNS payload should be JSON");
    assert_eq!(inner["id"], message.id.as_str());
    assert_eq!(inner["aps"]["alert"]["title"], "Title");
}

#[tokio::test]
async fn broadcast_publishes_once_to_the_topic() {
    let harness = make_harness();

    let message_id = harness
        .service
        .send_to_all(&ctx(), &message())
        .await
        .expect("broadcast should succeed");

    let published = harness.transport.published.lock().await;
    assert_eq!(published.len(), 1);
    assert!(published[0].broadcast);
    assert_eq!(published[0].destination, "arn:test:topic/all");

    let entries = harness.audit.entries.lock().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, Action::SendAll);
    assert_eq!(entries[0].user_ids, vec!["all".to_string()]);
    assert_eq!(entries[0].message_ids, vec![message_id]);

    let notices = harness.webhook.notices.lock().await;
    assert_eq!(notices.len(), 1);
    assert!(notices[0].user_ids.is_empty());
}

#[tokio::test]
async fn broadcast_without_a_message_id_is_reported_failed() {
    let harness = make_harness();
    harness.transport.omit_message_ids(true);

    let err = harness
        .service
        .send_to_all(&ctx(), &message())
        .await
        .expect_err("missing broadcast id should fail");

    assert!(err.to_string().starts_with("sendAll error:"));
    assert_eq!(harness.webhook.notice_count().await, 0);

    let entries = harness.audit.entries.lock().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].phase, Phase::Fail);
}

#[tokio::test]
async fn a_failing_webhook_never_unwinds_the_send() {
    let harness = make_harness();
    register(&harness, "tok-1", "u1").await;
    harness.webhook.fail_notifies(true);

    let message_ids = harness
        .service
        .send_to_users(&ctx(), &["u1".to_string()], &message())
        .await
        .expect("send should survive webhook failures");

    assert_eq!(message_ids.len(), 1);
}
