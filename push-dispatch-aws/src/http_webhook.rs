//! HTTP webhook notifier POSTing delivery notices to the destination
//! service's callback.

use async_trait::async_trait;
use push_dispatch::observability::events;
use push_dispatch::{ClientError, DeliveryNotice, Service, WebhookNotifier, WebhookTargets};
use serde_json::json;
use tracing::debug;

const COMPONENT: &str = "http_webhook";

/// Fire-once webhook client; destinations without a configured URL are
/// skipped silently.
pub struct HttpWebhookNotifier {
    client: reqwest::Client,
    targets: WebhookTargets,
}

impl HttpWebhookNotifier {
    pub fn new(targets: WebhookTargets) -> Self {
        Self {
            client: reqwest::Client::new(),
            targets,
        }
    }
}

/// Resolves the callback URL for one originating service.
fn destination_url<'a>(targets: &'a WebhookTargets, service: Service) -> Option<&'a str> {
    match service {
        Service::App => targets.app_server_url.as_deref(),
        Service::Operation => targets.operation_server_url.as_deref(),
        _ => None,
    }
}

#[async_trait]
impl WebhookNotifier for HttpWebhookNotifier {
    async fn notify(&self, notice: &DeliveryNotice) -> Result<(), ClientError> {
        let Some(url) = destination_url(&self.targets, notice.service) else {
            debug!(
                event = events::WEBHOOK_DESTINATION_SKIPPED,
                component = COMPONENT,
                service = notice.service.as_str(),
                "no webhook destination configured for service"
            );
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(&json!({ "deliveryNotice": notice }))
            .send()
            .await
            .map_err(|err| ClientError::new(format!("webhook POST failed: {err}")))?;

        response
            .error_for_status()
            .map_err(|err| ClientError::new(format!("webhook POST rejected: {err}")))?;
        Ok(())
    }
}
