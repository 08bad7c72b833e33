//! Contracts for the external collaborators the core drives.
//!
//! The core never talks to a concrete store or push transport; it is handed
//! trait objects for the key-value store and the push transport (plus the
//! audit sink and webhook notifier, see [`crate::audit`] and
//! [`crate::webhook`]). Adapter crates implement these over real backends,
//! tests implement them in memory.

use crate::token_index::key::{CompositeKey, KeySegment};
use crate::token_index::record::TokenAttributes;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure reported by any external client call.
///
/// Carries an operation-scoped message only; the adapter decides how much of
/// the backend error to surface.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientError {
    message: String,
}

impl ClientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ClientError {}

/// One row returned by a prefix query, keys still in their stored raw form.
///
/// Keys stay raw so the token index owns malformed-key detection instead of
/// each adapter silently coercing them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawRow {
    pub primary: String,
    pub secondary: String,
    pub attributes: TokenAttributes,
}

/// Point get/put/delete and prefix query over composite-keyed records.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Writes one directional record, overwriting any existing row at the key.
    async fn put(&self, key: &CompositeKey, value: &TokenAttributes) -> Result<(), ClientError>;

    /// Point lookup of one directional record.
    async fn get(&self, key: &CompositeKey) -> Result<Option<TokenAttributes>, ClientError>;

    /// Deletes one directional record and returns the previous value.
    async fn delete(&self, key: &CompositeKey) -> Result<Option<TokenAttributes>, ClientError>;

    /// Returns rows under `primary` whose secondary key starts with
    /// `secondary_prefix`, e.g. `d#`.
    async fn query_prefix(
        &self,
        primary: &KeySegment,
        secondary_prefix: &str,
    ) -> Result<Vec<RawRow>, ClientError>;
}

/// Endpoint lifecycle and publish operations of the push transport.
///
/// Handle-returning calls surface the transport's "no handle in response"
/// case as `Ok(None)`; deciding whether that is fatal is the caller's policy.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Registers a device token on a platform channel, with optional opaque
    /// user metadata, and returns the endpoint handle.
    async fn create_endpoint(
        &self,
        device_token: &str,
        channel: &str,
        user_data: Option<&str>,
    ) -> Result<Option<String>, ClientError>;

    async fn delete_endpoint(&self, endpoint_arn: &str) -> Result<(), ClientError>;

    /// Subscribes an endpoint to a topic and returns the subscription handle.
    async fn subscribe(&self, topic_arn: &str, endpoint_arn: &str)
        -> Result<Option<String>, ClientError>;

    async fn unsubscribe(&self, subscription_arn: &str) -> Result<(), ClientError>;

    /// Unicast publish; returns the transport message id when one was issued.
    async fn publish_to_endpoint(
        &self,
        endpoint_arn: &str,
        payload: &str,
    ) -> Result<Option<String>, ClientError>;

    /// Broadcast publish to a topic; returns the transport message id.
    async fn publish_to_topic(
        &self,
        topic_arn: &str,
        payload: &str,
    ) -> Result<Option<String>, ClientError>;
}
