//! Platform-specific wire envelopes for one logical push message.

use crate::token_index::Platform;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Fallback body the transport uses for platforms without a dedicated
/// sub-payload in a multi-platform envelope.
const DEFAULT_FALLBACK: &str = "This is the default message which must be present when publishing \
a message to a topic. The default message will only be used if a message is not present for one \
of the notification platforms.";

const SEND_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Category tag carried inside every push payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Notice,
    News,
    None,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Notice => "NOTICE",
            Category::News => "NEWS",
            Category::None => "NONE",
        }
    }
}

/// One logical push message, before platform encoding.
///
/// `id` identifies the message across audit and webhook records and is
/// unrelated to the message ids the transport issues per delivery.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PushMessage {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: Category,
    pub deep_link: Option<String>,
    pub web_link: Option<String>,
}

impl PushMessage {
    pub fn new(title: &str, content: &str, category: Category) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            content: content.to_string(),
            category,
            deep_link: None,
            web_link: None,
        }
    }

    pub fn with_deep_link(mut self, deep_link: &str) -> Self {
        self.deep_link = Some(deep_link.to_string());
        self
    }

    pub fn with_web_link(mut self, web_link: &str) -> Self {
        self.web_link = Some(web_link.to_string());
        self
    }
}

/// Payload construction failures.
#[derive(Debug)]
pub enum PayloadError {
    /// The record's platform has no wire encoding (the `None` platform).
    UnsupportedPlatform(Platform),
    Serialize(serde_json::Error),
}

impl Display for PayloadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadError::UnsupportedPlatform(platform) => {
                write!(f, "no payload encoding for platform '{}'", platform.as_str())
            }
            PayloadError::Serialize(err) => write!(f, "payload serialization failed: {err}"),
        }
    }
}

impl Error for PayloadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PayloadError::Serialize(err) => Some(err),
            PayloadError::UnsupportedPlatform(_) => None,
        }
    }
}

impl From<serde_json::Error> for PayloadError {
    fn from(err: serde_json::Error) -> Self {
        PayloadError::Serialize(err)
    }
}

#[derive(Serialize)]
struct ApnsAlert<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Serialize)]
struct ApnsAps<'a> {
    alert: ApnsAlert<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApnsMessage<'a> {
    aps: ApnsAps<'a>,
    category: Category,
    id: &'a str,
    send_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    deep_link: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    web_link: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FcmData<'a> {
    id: &'a str,
    title: &'a str,
    content: &'a str,
    category: Category,
    send_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    deep_link: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    web_link: Option<&'a str>,
}

#[derive(Serialize)]
struct FcmMessage<'a> {
    data: FcmData<'a>,
}

/// Outer envelope handed to the transport; platform sub-payloads are
/// string-encoded as the transport's multi-platform format requires.
#[derive(Serialize)]
struct TransportEnvelope {
    default: &'static str,
    #[serde(rename = "APNS", skip_serializing_if = "Option::is_none")]
    apns: Option<String>,
    #[serde(rename = "GCM", skip_serializing_if = "Option::is_none")]
    gcm: Option<String>,
}

fn send_at_stamp() -> String {
    Utc::now().format(SEND_AT_FORMAT).to_string()
}

fn apns_payload(message: &PushMessage) -> Result<String, PayloadError> {
    let encoded = serde_json::to_string(&ApnsMessage {
        aps: ApnsAps {
            alert: ApnsAlert {
                title: &message.title,
                body: &message.content,
            },
        },
        category: message.category,
        id: &message.id,
        send_at: send_at_stamp(),
        deep_link: message.deep_link.as_deref(),
        web_link: message.web_link.as_deref(),
    })?;
    Ok(encoded)
}

fn fcm_payload(message: &PushMessage) -> Result<String, PayloadError> {
    let encoded = serde_json::to_string(&FcmMessage {
        data: FcmData {
            id: &message.id,
            title: &message.title,
            content: &message.content,
            category: message.category,
            send_at: send_at_stamp(),
            deep_link: message.deep_link.as_deref(),
            web_link: message.web_link.as_deref(),
        },
    })?;
    Ok(encoded)
}

/// Builds the unicast envelope for one resolved target's platform.
pub fn unicast_payload(platform: Platform, message: &PushMessage) -> Result<String, PayloadError> {
    let envelope = match platform {
        Platform::Ios => TransportEnvelope {
            default: DEFAULT_FALLBACK,
            apns: Some(apns_payload(message)?),
            gcm: None,
        },
        Platform::Android => TransportEnvelope {
            default: DEFAULT_FALLBACK,
            apns: None,
            gcm: Some(fcm_payload(message)?),
        },
        Platform::None => return Err(PayloadError::UnsupportedPlatform(platform)),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Builds the broadcast envelope carrying both platform sub-payloads plus
/// the default fallback.
pub fn broadcast_payload(message: &PushMessage) -> Result<String, PayloadError> {
    let envelope = TransportEnvelope {
        default: DEFAULT_FALLBACK,
        apns: Some(apns_payload(message)?),
        gcm: Some(fcm_payload(message)?),
    };
    Ok(serde_json::to_string(&envelope)?)
}
