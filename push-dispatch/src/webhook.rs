//! Outbound webhook notification sent once per completed send.

use crate::audit::Service;
use crate::clients::ClientError;
use crate::fanout::Category;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Document describing one completed send, POSTed to the destination
/// service's callback.
///
/// `user_ids` is the requested target set, not the resolved subset; a
/// broadcast send carries no user ids at all.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryNotice {
    pub service: Service,
    pub user_ids: Vec<String>,
    pub title: String,
    pub content: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_link: Option<String>,
    pub message_ids: Vec<String>,
}

/// Fire-once outbound callback. Errors are the notifier's to report; a
/// failed POST never unwinds the send that triggered it.
#[async_trait]
pub trait WebhookNotifier: Send + Sync {
    async fn notify(&self, notice: &DeliveryNotice) -> Result<(), ClientError>;
}
