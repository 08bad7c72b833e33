//! Endpoint creation and teardown against the push transport.
//!
//! Creation and subscription fail loudly, since the orchestrator needs valid
//! handles before touching the index. Teardown is the opposite: by the time
//! it runs the index has already moved on, so failures are logged and
//! swallowed rather than raised.

use crate::clients::PushTransport;
use crate::config::ServiceConfig;
use crate::observability::events;
use crate::token_index::Platform;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::warn;

const COMPONENT: &str = "endpoint_registrar";

/// Failures raised while establishing a delivery endpoint.
#[derive(Debug)]
pub enum RegistrarError {
    /// The transport rejected the token or returned no endpoint handle.
    EndpointCreationFailed { reason: String },
    /// The broadcast-topic subscription yielded no handle.
    SubscriptionFailed { reason: String },
}

impl Display for RegistrarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrarError::EndpointCreationFailed { reason } => {
                write!(f, "endpoint creation failed: {reason}")
            }
            RegistrarError::SubscriptionFailed { reason } => {
                write!(f, "broadcast subscription failed: {reason}")
            }
        }
    }
}

impl Error for RegistrarError {}

/// Wraps endpoint/subscription lifecycle calls for one configured transport.
#[derive(Clone)]
pub struct EndpointRegistrar {
    transport: Arc<dyn PushTransport>,
    config: Arc<ServiceConfig>,
}

impl EndpointRegistrar {
    pub fn new(transport: Arc<dyn PushTransport>, config: Arc<ServiceConfig>) -> Self {
        Self { transport, config }
    }

    /// Registers the token on its platform channel and returns the endpoint
    /// handle. User metadata is attached when an owner is already known.
    pub async fn create_endpoint(
        &self,
        device_token: &str,
        platform: Platform,
        user_id: Option<&str>,
    ) -> Result<String, RegistrarError> {
        let channel = self.config.platform_channel(platform);
        match self
            .transport
            .create_endpoint(device_token, channel, user_id)
            .await
        {
            Ok(Some(endpoint_arn)) => Ok(endpoint_arn),
            Ok(None) => Err(RegistrarError::EndpointCreationFailed {
                reason: "transport returned no endpoint handle".to_string(),
            }),
            Err(err) => Err(RegistrarError::EndpointCreationFailed {
                reason: err.message().to_string(),
            }),
        }
    }

    /// Subscribes the endpoint to the broadcast topic and returns the
    /// subscription handle.
    pub async fn subscribe(&self, endpoint_arn: &str) -> Result<String, RegistrarError> {
        match self
            .transport
            .subscribe(&self.config.broadcast_topic_arn, endpoint_arn)
            .await
        {
            Ok(Some(subscription_arn)) => Ok(subscription_arn),
            Ok(None) => Err(RegistrarError::SubscriptionFailed {
                reason: "transport returned no subscription handle".to_string(),
            }),
            Err(err) => Err(RegistrarError::SubscriptionFailed {
                reason: err.message().to_string(),
            }),
        }
    }

    /// Best-effort endpoint removal.
    pub async fn delete_endpoint(&self, endpoint_arn: &str) {
        if let Err(err) = self.transport.delete_endpoint(endpoint_arn).await {
            warn!(
                event = events::ENDPOINT_TEARDOWN_FAILED,
                component = COMPONENT,
                endpoint_arn,
                err = %err,
                "endpoint delete failed, leaving remote endpoint dangling"
            );
        }
    }

    /// Best-effort subscription removal.
    pub async fn unsubscribe(&self, subscription_arn: &str) {
        if let Err(err) = self.transport.unsubscribe(subscription_arn).await {
            warn!(
                event = events::SUBSCRIPTION_TEARDOWN_FAILED,
                component = COMPONENT,
                subscription_arn,
                err = %err,
                "unsubscribe failed, leaving remote subscription dangling"
            );
        }
    }

    /// Tears down both handles of one registration concurrently, best-effort.
    pub async fn teardown(&self, endpoint_arn: &str, subscription_arn: &str) {
        tokio::join!(
            self.delete_endpoint(endpoint_arn),
            self.unsubscribe(subscription_arn),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{EndpointRegistrar, RegistrarError};
    use crate::clients::{ClientError, PushTransport};
    use crate::config::{PlatformChannels, ServiceConfig, WebhookTargets};
    use crate::token_index::Platform;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct ScriptedTransport {
        fail_calls: bool,
        omit_handles: bool,
        teardown_calls: AtomicUsize,
        created_channels: Mutex<Vec<String>>,
        user_data_seen: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl PushTransport for ScriptedTransport {
        async fn create_endpoint(
            &self,
            _device_token: &str,
            channel: &str,
            user_data: Option<&str>,
        ) -> Result<Option<String>, ClientError> {
            if self.fail_calls {
                return Err(ClientError::new("create endpoint rejected"));
            }
            self.created_channels.lock().await.push(channel.to_string());
            self.user_data_seen
                .lock()
                .await
                .push(user_data.map(str::to_string));
            if self.omit_handles {
                Ok(None)
            } else {
                Ok(Some("arn:endpoint/1".to_string()))
            }
        }

        async fn delete_endpoint(&self, _endpoint_arn: &str) -> Result<(), ClientError> {
            self.teardown_calls.fetch_add(1, Ordering::Relaxed);
            Err(ClientError::new("delete endpoint failed"))
        }

        async fn subscribe(
            &self,
            _topic_arn: &str,
            _endpoint_arn: &str,
        ) -> Result<Option<String>, ClientError> {
            if self.fail_calls {
                return Err(ClientError::new("subscribe rejected"));
            }
            if self.omit_handles {
                Ok(None)
            } else {
                Ok(Some("arn:subscription/1".to_string()))
            }
        }

        async fn unsubscribe(&self, _subscription_arn: &str) -> Result<(), ClientError> {
            self.teardown_calls.fetch_add(1, Ordering::Relaxed);
            Err(ClientError::new("unsubscribe failed"))
        }

        async fn publish_to_endpoint(
            &self,
            _endpoint_arn: &str,
            _payload: &str,
        ) -> Result<Option<String>, ClientError> {
            Ok(None)
        }

        async fn publish_to_topic(
            &self,
            _topic_arn: &str,
            _payload: &str,
        ) -> Result<Option<String>, ClientError> {
            Ok(None)
        }
    }

    fn config() -> Arc<ServiceConfig> {
        Arc::new(ServiceConfig {
            region: "test-region".to_string(),
            table_name: "tokens".to_string(),
            broadcast_topic_arn: "arn:topic/all".to_string(),
            platform_channels: PlatformChannels {
                ios: "arn:app/ios".to_string(),
                android: "arn:app/android".to_string(),
            },
            webhooks: WebhookTargets::default(),
        })
    }

    #[tokio::test]
    async fn create_endpoint_targets_the_platform_channel_and_keeps_user_data() {
        let transport = Arc::new(ScriptedTransport::default());
        let registrar = EndpointRegistrar::new(transport.clone(), config());

        let endpoint = registrar
            .create_endpoint("tok-1", Platform::Ios, Some("u1"))
            .await
            .expect("endpoint should be created");

        assert_eq!(endpoint, "arn:endpoint/1");
        assert_eq!(*transport.created_channels.lock().await, vec!["arn:app/ios"]);
        assert_eq!(
            *transport.user_data_seen.lock().await,
            vec![Some("u1".to_string())]
        );
    }

    #[tokio::test]
    async fn missing_handles_fail_creation_and_subscription() {
        let transport = Arc::new(ScriptedTransport {
            omit_handles: true,
            ..Default::default()
        });
        let registrar = EndpointRegistrar::new(transport, config());

        let create_err = registrar
            .create_endpoint("tok-1", Platform::Android, None)
            .await
            .expect_err("missing endpoint handle should fail");
        assert!(matches!(
            create_err,
            RegistrarError::EndpointCreationFailed { .. }
        ));

        let subscribe_err = registrar
            .subscribe("arn:endpoint/1")
            .await
            .expect_err("missing subscription handle should fail");
        assert!(matches!(subscribe_err, RegistrarError::SubscriptionFailed { .. }));
    }

    #[tokio::test]
    async fn teardown_swallows_transport_failures() {
        let transport = Arc::new(ScriptedTransport::default());
        let registrar = EndpointRegistrar::new(transport.clone(), config());

        registrar
            .teardown("arn:endpoint/1", "arn:subscription/1")
            .await;

        assert_eq!(transport.teardown_calls.load(Ordering::Relaxed), 2);
    }
}
