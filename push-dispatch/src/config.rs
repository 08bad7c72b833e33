//! Process-wide service configuration, built once at startup and passed by
//! reference into each component.

use crate::token_index::Platform;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Everything the core needs to address its external collaborators.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub region: String,
    pub table_name: String,
    /// Topic every endpoint is subscribed to for broadcast sends.
    pub broadcast_topic_arn: String,
    pub platform_channels: PlatformChannels,
    pub webhooks: WebhookTargets,
}

/// Platform-application channels endpoints are created against.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct PlatformChannels {
    pub ios: String,
    pub android: String,
}

/// Outbound webhook destinations keyed by originating service.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct WebhookTargets {
    #[serde(default)]
    pub app_server_url: Option<String>,
    #[serde(default)]
    pub operation_server_url: Option<String>,
}

impl ServiceConfig {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            region: require_env("AWS_REGION")?,
            table_name: require_env("DYNAMODB_TABLE")?,
            broadcast_topic_arn: require_env("ALL_TOPIC_ARN")?,
            platform_channels: PlatformChannels {
                ios: require_env("PLATFORM_APPLICATION_IOS")?,
                android: require_env("PLATFORM_APPLICATION_ANDROID")?,
            },
            webhooks: WebhookTargets {
                app_server_url: optional_env("APP_SERVER_URL"),
                operation_server_url: optional_env("OPERATION_SERVER_URL"),
            },
        })
    }

    /// Channel a token registers against. Anything that is not iOS lands on
    /// the Android channel, matching the transport's two platform
    /// applications.
    pub fn platform_channel(&self, platform: Platform) -> &str {
        match platform {
            Platform::Ios => &self.platform_channels.ios,
            Platform::Android | Platform::None => &self.platform_channels.android,
        }
    }
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVariable(name))
}

fn optional_env(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// A required environment variable was absent or not unicode.
#[derive(Debug, Eq, PartialEq)]
pub enum ConfigError {
    MissingVariable(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(name) => {
                write!(f, "required environment variable {name} is not set")
            }
        }
    }
}

impl Error for ConfigError {}
