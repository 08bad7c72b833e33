//! Audit-trail payloads emitted on action phase boundaries.
//!
//! The core only produces entries; the sink persists them and they are never
//! read back. Sink failures must not unwind the action that produced the
//! entry.

use crate::clients::ClientError;
use crate::fanout::Category;
use crate::token_index::Platform;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical action an audit entry belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Register,
    Cancel,
    Send,
    SendAll,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Register => "register",
            Action::Cancel => "cancel",
            Action::Send => "send",
            Action::SendAll => "sendAll",
        }
    }
}

/// Phase of the action the entry marks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Start,
    Success,
    Fail,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Success => "success",
            Phase::Fail => "fail",
        }
    }
}

/// Originating service of the request, carried through audit and webhook
/// records.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Crew,
    Official,
    Operation,
    Playground,
    App,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Crew => "crew",
            Service::Official => "official",
            Service::Operation => "operation",
            Service::Playground => "playground",
            Service::App => "app",
        }
    }
}

/// Delivery channel of the notification the entry describes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Email,
    Push,
    Sms,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Email => "email",
            NotificationType::Push => "push",
            NotificationType::Sms => "sms",
        }
    }
}

/// One persisted record per action phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub transaction_id: String,
    pub action: Action,
    pub phase: Phase,
    pub service: Service,
    pub notification_type: NotificationType,
    pub platform: Platform,
    pub device_token: String,
    pub user_ids: Vec<String>,
    pub message_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_link: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Base entry for a token-lifecycle action (register/cancel).
    pub fn token_action(
        transaction_id: &str,
        action: Action,
        phase: Phase,
        service: Service,
        platform: Platform,
        device_token: &str,
        user_ids: Vec<String>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            action,
            phase,
            service,
            notification_type: NotificationType::Push,
            platform,
            device_token: device_token.to_string(),
            user_ids,
            message_ids: Vec::new(),
            title: None,
            content: None,
            category: None,
            deep_link: None,
            web_link: None,
            recorded_at: Utc::now(),
        }
    }

    /// Entry for a send action phase, carrying the message body and the
    /// transport message ids produced so far.
    #[allow(clippy::too_many_arguments)]
    pub fn send_action(
        transaction_id: &str,
        action: Action,
        phase: Phase,
        service: Service,
        user_ids: Vec<String>,
        message_ids: Vec<String>,
        title: &str,
        content: &str,
        category: Category,
        deep_link: Option<&str>,
        web_link: Option<&str>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            action,
            phase,
            service,
            notification_type: NotificationType::Push,
            platform: Platform::None,
            device_token: String::new(),
            user_ids,
            message_ids,
            title: Some(title.to_string()),
            content: Some(content.to_string()),
            category: Some(category),
            deep_link: deep_link.map(str::to_string),
            web_link: web_link.map(str::to_string),
            recorded_at: Utc::now(),
        }
    }
}

/// Append-only audit persistence.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), ClientError>;
}
