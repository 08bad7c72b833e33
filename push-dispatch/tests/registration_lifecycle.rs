//! End-to-end registration state-machine behavior over in-memory
//! collaborators.

mod support;

use push_dispatch::{
    Action, CancelOutcome, PairHealth, Phase, Platform, RegisterOutcome, TokenAttributes,
};
use support::{ctx, make_harness};

#[tokio::test]
async fn register_then_cancel_leaves_no_record_behind() {
    let harness = make_harness();

    let outcome = harness
        .service
        .register(&ctx(), "tok-1", Platform::Ios, Some("u1"))
        .await
        .expect("register should succeed");
    let registered = match outcome {
        RegisterOutcome::Registered(record) => record,
        RegisterOutcome::AlreadyRegistered => panic!("first register must create the pair"),
    };

    let by_user = harness
        .store
        .row("u#u1", "d#tok-1")
        .await
        .expect("by-user row should exist");
    let by_device = harness
        .store
        .row("d#tok-1", "u#u1")
        .await
        .expect("by-device row should exist");
    assert_eq!(by_user, by_device);
    assert_eq!(by_user.endpoint_arn, registered.endpoint_arn);

    let cancelled = harness
        .service
        .cancel(&ctx(), "tok-1", Platform::Ios, Some("u1"))
        .await
        .expect("cancel should succeed");
    let deleted = match cancelled {
        CancelOutcome::Cancelled(record) => record,
        CancelOutcome::TokenNotFound => panic!("cancel must find the registered pair"),
    };

    assert_eq!(deleted.endpoint_arn, registered.endpoint_arn);
    assert_eq!(harness.store.row_count().await, 0);
    assert_eq!(
        *harness.transport.deleted_endpoints.lock().await,
        vec![registered.endpoint_arn.clone()]
    );
    assert_eq!(
        *harness.transport.unsubscriptions.lock().await,
        vec![registered.subscription_arn]
    );
}

#[tokio::test]
async fn re_registering_the_same_owner_is_idempotent() {
    let harness = make_harness();

    harness
        .service
        .register(&ctx(), "tok-1", Platform::Ios, Some("u1"))
        .await
        .expect("first register should succeed");
    let stored_before = harness
        .store
        .row("d#tok-1", "u#u1")
        .await
        .expect("pair should exist");

    let second = harness
        .service
        .register(&ctx(), "tok-1", Platform::Ios, Some("u1"))
        .await
        .expect("second register should succeed");

    assert_eq!(second, RegisterOutcome::AlreadyRegistered);
    assert_eq!(harness.transport.created_endpoint_count().await, 1);
    assert_eq!(harness.transport.subscription_count().await, 1);
    let stored_after = harness
        .store
        .row("d#tok-1", "u#u1")
        .await
        .expect("pair should still exist");
    assert_eq!(stored_before, stored_after);
}

#[tokio::test]
async fn claiming_an_unknown_device_preserves_the_remote_handles() {
    let harness = make_harness();

    harness
        .service
        .register(&ctx(), "tok-1", Platform::Android, None)
        .await
        .expect("anonymous register should succeed");
    let anonymous = harness
        .store
        .row("d#tok-1", "u#unknown")
        .await
        .expect("unknown-owned pair should exist");

    let claimed = harness
        .service
        .register(&ctx(), "tok-1", Platform::Android, Some("u1"))
        .await
        .expect("claim should succeed");
    let record = match claimed {
        RegisterOutcome::Registered(record) => record,
        RegisterOutcome::AlreadyRegistered => panic!("claim must rewrite the pair"),
    };

    assert_eq!(record.user_id, "u1");
    assert_eq!(record.endpoint_arn, anonymous.endpoint_arn);
    assert_eq!(record.subscription_arn, anonymous.subscription_arn);
    // The remote endpoint is reused, not re-registered.
    assert_eq!(harness.transport.created_endpoint_count().await, 1);
    assert_eq!(harness.transport.subscription_count().await, 1);
    assert!(harness.store.row("d#tok-1", "u#unknown").await.is_none());
    assert!(harness.store.row("u#u1", "d#tok-1").await.is_some());
}

#[tokio::test]
async fn a_different_owner_evicts_the_previous_registration() {
    let harness = make_harness();

    harness
        .service
        .register(&ctx(), "tok-1", Platform::Ios, Some("u1"))
        .await
        .expect("first register should succeed");
    let first = harness
        .store
        .row("d#tok-1", "u#u1")
        .await
        .expect("first pair should exist");

    let second = harness
        .service
        .register(&ctx(), "tok-1", Platform::Ios, Some("u2"))
        .await
        .expect("re-registration should succeed");
    let record = match second {
        RegisterOutcome::Registered(record) => record,
        RegisterOutcome::AlreadyRegistered => panic!("new owner must create a fresh pair"),
    };

    assert_eq!(record.user_id, "u2");
    assert_ne!(record.endpoint_arn, first.endpoint_arn);
    assert_eq!(harness.transport.created_endpoint_count().await, 2);
    assert!(harness
        .transport
        .deleted_endpoints
        .lock()
        .await
        .contains(&first.endpoint_arn));
    assert!(harness
        .transport
        .unsubscriptions
        .lock()
        .await
        .contains(&first.subscription_arn));
    assert!(harness.store.row("u#u1", "d#tok-1").await.is_none());
    assert!(harness.store.row("u#u2", "d#tok-1").await.is_some());
}

#[tokio::test]
async fn cancelling_an_unknown_token_is_a_non_fatal_miss() {
    let harness = make_harness();

    let outcome = harness
        .service
        .cancel(&ctx(), "missing", Platform::Ios, Some("u1"))
        .await
        .expect("cancel of a missing token should not raise");

    assert_eq!(outcome, CancelOutcome::TokenNotFound);
    assert!(harness.transport.deleted_endpoints.lock().await.is_empty());
    assert!(harness.transport.unsubscriptions.lock().await.is_empty());
}

#[tokio::test]
async fn cancel_refuses_to_skip_teardown_when_handles_are_missing() {
    let harness = make_harness();
    let crippled = TokenAttributes {
        platform: Platform::Ios,
        endpoint_arn: "arn:test:endpoint/0".to_string(),
        subscription_arn: String::new(),
        created_at: chrono_now(),
    };
    harness.store.seed_raw("d#tok-1", "u#u1", crippled.clone()).await;
    harness.store.seed_raw("u#u1", "d#tok-1", crippled).await;

    let err = harness
        .service
        .cancel(&ctx(), "tok-1", Platform::Ios, Some("u1"))
        .await
        .expect_err("missing subscription handle is corruption");

    assert!(err.to_string().starts_with("cancel error:"));
    assert!(harness.transport.deleted_endpoints.lock().await.is_empty());
}

#[tokio::test]
async fn delivery_failure_unregisters_and_records_the_failed_message() {
    let harness = make_harness();

    harness
        .service
        .register(&ctx(), "tok-1", Platform::Ios, Some("u1"))
        .await
        .expect("register should succeed");

    let outcome = harness
        .service
        .unregister_failed_delivery(&ctx(), "tok-1", "mid-dead")
        .await
        .expect("implicit unregistration should succeed");

    assert!(matches!(outcome, CancelOutcome::Cancelled(_)));
    assert_eq!(harness.store.row_count().await, 0);

    let entries = harness.audit.entries.lock().await;
    let failure = entries
        .iter()
        .find(|entry| entry.phase == Phase::Fail && entry.action == Action::Send)
        .expect("a send-failure entry should precede teardown");
    assert_eq!(failure.message_ids, vec!["mid-dead".to_string()]);
    assert_eq!(failure.user_ids, vec!["u1".to_string()]);
}

#[tokio::test]
async fn registration_actions_emit_start_and_success_audit_phases() {
    let harness = make_harness();

    harness
        .service
        .register(&ctx(), "tok-1", Platform::Ios, Some("u1"))
        .await
        .expect("register should succeed");

    let entries = harness.audit.entries.lock().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, Action::Register);
    assert_eq!(entries[0].phase, Phase::Start);
    assert_eq!(entries[1].phase, Phase::Success);
    assert_eq!(entries[1].device_token, "tok-1");
}

#[tokio::test]
async fn a_failing_audit_sink_never_fails_the_action() {
    let harness = make_harness();
    harness.audit.fail_appends(true);

    let outcome = harness
        .service
        .register(&ctx(), "tok-1", Platform::Ios, Some("u1"))
        .await
        .expect("register should survive audit failures");

    assert!(matches!(outcome, RegisterOutcome::Registered(_)));
    assert_eq!(harness.audit.entry_count().await, 0);
}

#[tokio::test]
async fn a_registered_pair_reports_intact_health() {
    let harness = make_harness();

    harness
        .service
        .register(&ctx(), "tok-1", Platform::Ios, Some("u1"))
        .await
        .expect("register should succeed");

    let health = harness
        .service
        .token_index()
        .check_pair("tok-1")
        .await
        .expect("check should run");
    assert_eq!(health, PairHealth::Intact);

    // Simulate a crash between the two halves of a delete.
    harness
        .store
        .delete_raw("u#u1", "d#tok-1")
        .await
        .expect("seeded row should exist");
    let health = harness
        .service
        .token_index()
        .check_pair("tok-1")
        .await
        .expect("check should run");
    assert_eq!(
        health,
        PairHealth::DanglingByDevice {
            user_id: "u1".to_string()
        }
    );
}

fn chrono_now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
