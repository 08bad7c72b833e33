//! Canonical structured field keys and value-format helpers.

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const DEVICE_TOKEN: &str = "device_token";
pub const USER_ID: &str = "user_id";
pub const ENDPOINT_ARN: &str = "endpoint_arn";
pub const SUBSCRIPTION_ARN: &str = "subscription_arn";
pub const MESSAGE_ID: &str = "message_id";
pub const TRANSACTION_ID: &str = "transaction_id";
pub const ERR: &str = "err";

pub const NONE: &str = "none";

const DEVICE_TOKEN_LOG_PREFIX_LEN: usize = 12;

/// Shortens a device token for log lines; full tokens stay out of the logs.
pub fn format_device_token(device_token: &str) -> String {
    if device_token.chars().count() <= DEVICE_TOKEN_LOG_PREFIX_LEN {
        device_token.to_string()
    } else {
        let prefix: String = device_token.chars().take(DEVICE_TOKEN_LOG_PREFIX_LEN).collect();
        format!("{prefix}…")
    }
}

pub fn format_optional(value: Option<&str>) -> String {
    value.unwrap_or(NONE).to_string()
}
