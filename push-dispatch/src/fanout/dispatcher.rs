//! Fan-out dispatcher: resolves send targets and publishes in parallel.

use crate::clients::PushTransport;
use crate::config::ServiceConfig;
use crate::fanout::payload::{broadcast_payload, unicast_payload, PayloadError, PushMessage};
use crate::observability::{events, fields};
use crate::token_index::{IndexError, TokenIndex, TokenRecord};
use futures::future::{join_all, try_join_all};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "fanout_dispatcher";

/// Failures that abort a whole send, as opposed to degrading one target.
#[derive(Debug)]
pub enum DispatchError {
    /// Resolving the requested users through the token index failed.
    Resolution(IndexError),
    /// The broadcast envelope could not be built.
    Payload(PayloadError),
    /// The broadcast publish reported no message id or failed outright.
    BroadcastFailed { reason: String },
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Resolution(err) => write!(f, "target resolution failed: {err}"),
            DispatchError::Payload(err) => write!(f, "payload construction failed: {err}"),
            DispatchError::BroadcastFailed { reason } => {
                write!(f, "broadcast publish failed: {reason}")
            }
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DispatchError::Resolution(err) => Some(err),
            DispatchError::Payload(err) => Some(err),
            DispatchError::BroadcastFailed { .. } => None,
        }
    }
}

/// Outcome of one fan-out call.
///
/// `targets` counts the resolved deliveries that were attempted; callers use
/// it to distinguish "nobody to send to" from "every target failed".
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FanoutReport {
    pub targets: usize,
    pub message_ids: Vec<String>,
}

/// Publishes one logical message to many endpoints, or once to the
/// broadcast topic.
#[derive(Clone)]
pub struct FanoutDispatcher {
    index: TokenIndex,
    transport: Arc<dyn PushTransport>,
    config: Arc<ServiceConfig>,
}

impl FanoutDispatcher {
    pub fn new(index: TokenIndex, transport: Arc<dyn PushTransport>, config: Arc<ServiceConfig>) -> Self {
        Self {
            index,
            transport,
            config,
        }
    }

    /// Resolves each user to its live device and dispatches all targets in
    /// parallel. Users without an active registration are skipped; a failed
    /// target is absent from the returned ids and never aborts its siblings.
    /// Only resolution itself can fail the whole call.
    pub async fn send_to_users(
        &self,
        user_ids: &[String],
        message: &PushMessage,
    ) -> Result<FanoutReport, DispatchError> {
        if user_ids.is_empty() {
            return Ok(FanoutReport::default());
        }

        let lookups = user_ids.iter().map(|user_id| self.index.query_by_user(user_id));
        let resolved = try_join_all(lookups)
            .await
            .map_err(DispatchError::Resolution)?;
        let targets: Vec<TokenRecord> = resolved.into_iter().flatten().collect();

        if targets.is_empty() {
            debug!(
                event = events::FANOUT_RESOLVED_EMPTY,
                component = COMPONENT,
                requested = user_ids.len(),
                "no requested user has an active registration"
            );
            return Ok(FanoutReport::default());
        }

        let sends = targets
            .iter()
            .map(|target| self.dispatch_one(target, message));
        let outcomes = join_all(sends).await;

        Ok(FanoutReport {
            targets: targets.len(),
            message_ids: outcomes.into_iter().flatten().collect(),
        })
    }

    /// Publishes one multi-platform envelope to the broadcast topic and
    /// returns the transport message id.
    pub async fn send_to_all(&self, message: &PushMessage) -> Result<String, DispatchError> {
        let payload = broadcast_payload(message).map_err(DispatchError::Payload)?;

        match self
            .transport
            .publish_to_topic(&self.config.broadcast_topic_arn, &payload)
            .await
        {
            Ok(Some(message_id)) => {
                debug!(
                    event = events::BROADCAST_PUBLISH_OK,
                    component = COMPONENT,
                    message_id = message_id.as_str(),
                    "broadcast published"
                );
                Ok(message_id)
            }
            Ok(None) => {
                warn!(
                    event = events::BROADCAST_PUBLISH_FAILED,
                    component = COMPONENT,
                    "transport returned no broadcast message id"
                );
                Err(DispatchError::BroadcastFailed {
                    reason: "transport returned no message id".to_string(),
                })
            }
            Err(err) => {
                warn!(
                    event = events::BROADCAST_PUBLISH_FAILED,
                    component = COMPONENT,
                    err = %err,
                    "broadcast publish failed"
                );
                Err(DispatchError::BroadcastFailed {
                    reason: err.message().to_string(),
                })
            }
        }
    }

    /// Dispatches one resolved target; any failure degrades this target to
    /// `None`.
    async fn dispatch_one(&self, target: &TokenRecord, message: &PushMessage) -> Option<String> {
        let payload = match unicast_payload(target.platform, message) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    event = events::FANOUT_TARGET_SKIPPED,
                    component = COMPONENT,
                    user_id = target.user_id.as_str(),
                    device_token = fields::format_device_token(&target.device_token).as_str(),
                    err = %err,
                    "target skipped, no payload for its platform"
                );
                return None;
            }
        };

        debug!(
            event = events::FANOUT_SEND_ATTEMPT,
            component = COMPONENT,
            user_id = target.user_id.as_str(),
            endpoint_arn = target.endpoint_arn.as_str(),
            "attempting unicast publish"
        );

        match self
            .transport
            .publish_to_endpoint(&target.endpoint_arn, &payload)
            .await
        {
            Ok(Some(message_id)) => {
                debug!(
                    event = events::FANOUT_SEND_OK,
                    component = COMPONENT,
                    user_id = target.user_id.as_str(),
                    message_id = message_id.as_str(),
                    "unicast publish succeeded"
                );
                Some(message_id)
            }
            Ok(None) => {
                warn!(
                    event = events::FANOUT_SEND_FAILED,
                    component = COMPONENT,
                    user_id = target.user_id.as_str(),
                    endpoint_arn = target.endpoint_arn.as_str(),
                    "transport returned no message id"
                );
                None
            }
            Err(err) => {
                warn!(
                    event = events::FANOUT_SEND_FAILED,
                    component = COMPONENT,
                    user_id = target.user_id.as_str(),
                    endpoint_arn = target.endpoint_arn.as_str(),
                    err = %err,
                    "unicast publish failed"
                );
                None
            }
        }
    }
}
