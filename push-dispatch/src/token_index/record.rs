//! Token-record data model shared by both directional index entries.

use crate::token_index::key::{CompositeKey, KeyKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner sentinel for a device that has not been linked to a user yet.
pub const UNKNOWN_USER: &str = "unknown";

/// Target platform of a registered device token.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "iOS")]
    Ios,
    Android,
    #[serde(rename = "")]
    None,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "iOS",
            Platform::Android => "Android",
            Platform::None => "",
        }
    }
}

/// Common fields carried identically by both records of an active pair.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TokenAttributes {
    pub platform: Platform,
    pub endpoint_arn: String,
    pub subscription_arn: String,
    pub created_at: DateTime<Utc>,
}

/// One fully-resolved registration, independent of which direction it was
/// read from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenRecord {
    pub user_id: String,
    pub device_token: String,
    pub platform: Platform,
    pub endpoint_arn: String,
    pub subscription_arn: String,
    pub created_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Rebuilds a record from a stored row, whichever direction it is keyed in.
    pub fn from_row(key: &CompositeKey, attributes: &TokenAttributes) -> Self {
        let (user_segment, device_segment) = match key.primary.kind() {
            KeyKind::User => (&key.primary, &key.secondary),
            KeyKind::Device => (&key.secondary, &key.primary),
        };

        Self {
            user_id: user_segment.id().to_string(),
            device_token: device_segment.id().to_string(),
            platform: attributes.platform,
            endpoint_arn: attributes.endpoint_arn.clone(),
            subscription_arn: attributes.subscription_arn.clone(),
            created_at: attributes.created_at,
        }
    }

    pub fn attributes(&self) -> TokenAttributes {
        TokenAttributes {
            platform: self.platform,
            endpoint_arn: self.endpoint_arn.clone(),
            subscription_arn: self.subscription_arn.clone(),
            created_at: self.created_at,
        }
    }

    /// True when the record is still owned by the [`UNKNOWN_USER`] sentinel.
    pub fn owned_by_unknown(&self) -> bool {
        self.user_id == UNKNOWN_USER
    }
}
