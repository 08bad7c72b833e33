//! Canonical structured event names used across `push-dispatch`.

// Registration lifecycle events.
pub const REGISTER_START: &str = "register_start";
pub const REGISTER_OK: &str = "register_ok";
pub const REGISTER_FAILED: &str = "register_failed";
pub const REGISTER_NOOP: &str = "register_noop";
pub const REGISTER_OWNER_CLAIMED: &str = "register_owner_claimed";
pub const REGISTER_OWNER_EVICTED: &str = "register_owner_evicted";
pub const CANCEL_START: &str = "cancel_start";
pub const CANCEL_OK: &str = "cancel_ok";
pub const CANCEL_FAILED: &str = "cancel_failed";
pub const CANCEL_TOKEN_NOT_FOUND: &str = "cancel_token_not_found";
pub const DELIVERY_FAILURE_UNREGISTER: &str = "delivery_failure_unregister";

// Endpoint registrar events.
pub const ENDPOINT_TEARDOWN_FAILED: &str = "endpoint_teardown_failed";
pub const SUBSCRIPTION_TEARDOWN_FAILED: &str = "subscription_teardown_failed";

// Token index events.
pub const INDEX_PAIR_WRITE_INCOMPLETE: &str = "index_pair_write_incomplete";
pub const INDEX_PAIR_DELETE_INCOMPLETE: &str = "index_pair_delete_incomplete";

// Fan-out and broadcast events.
pub const FANOUT_SEND_ATTEMPT: &str = "fanout_send_attempt";
pub const FANOUT_SEND_OK: &str = "fanout_send_ok";
pub const FANOUT_SEND_FAILED: &str = "fanout_send_failed";
pub const FANOUT_TARGET_SKIPPED: &str = "fanout_target_skipped";
pub const FANOUT_RESOLVED_EMPTY: &str = "fanout_resolved_empty";
pub const BROADCAST_PUBLISH_OK: &str = "broadcast_publish_ok";
pub const BROADCAST_PUBLISH_FAILED: &str = "broadcast_publish_failed";

// Side-channel events for fire-and-forget collaborators.
pub const AUDIT_APPEND_FAILED: &str = "audit_append_failed";
pub const WEBHOOK_POST_FAILED: &str = "webhook_post_failed";
pub const WEBHOOK_DESTINATION_SKIPPED: &str = "webhook_destination_skipped";
