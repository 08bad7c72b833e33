//! Inbound action-request parsing and validation.
//!
//! Malformed input is rejected here; the core assumes well-typed requests.

use push_dispatch::{Action, Category, Platform, Service};
use serde::Deserialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Header block every action request carries.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RequestHeader {
    pub transaction_id: String,
    pub service: Service,
    pub action: Action,
    #[serde(default)]
    pub platform: Option<Platform>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RequestEnvelope {
    header: RequestHeader,
    body: Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct TokenBody {
    device_token: String,
    #[serde(default)]
    user_ids: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct SendBody {
    user_ids: Vec<String>,
    title: String,
    content: String,
    category: Category,
    #[serde(default)]
    deep_link: Option<String>,
    #[serde(default)]
    web_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct SendAllBody {
    title: String,
    content: String,
    category: Category,
    #[serde(default)]
    deep_link: Option<String>,
    #[serde(default)]
    web_link: Option<String>,
}

/// One validated action, ready for the core.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ActionRequest {
    Register {
        device_token: String,
        platform: Platform,
        user_id: Option<String>,
    },
    Cancel {
        device_token: String,
        platform: Platform,
        user_id: Option<String>,
    },
    Send {
        user_ids: Vec<String>,
        title: String,
        content: String,
        category: Category,
        deep_link: Option<String>,
        web_link: Option<String>,
    },
    SendAll {
        title: String,
        content: String,
        category: Category,
        deep_link: Option<String>,
        web_link: Option<String>,
    },
}

/// Rejection reasons surfaced as a 400-class response.
#[derive(Debug)]
pub enum RequestError {
    Malformed(String),
    EmptyTransactionId,
    EmptyDeviceToken,
    MissingPlatform,
}

impl Display for RequestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::Malformed(reason) => write!(f, "malformed request: {reason}"),
            RequestError::EmptyTransactionId => write!(f, "transactionId must not be empty"),
            RequestError::EmptyDeviceToken => write!(f, "deviceToken must not be empty"),
            RequestError::MissingPlatform => {
                write!(f, "platform header is required for token actions")
            }
        }
    }
}

impl Error for RequestError {}

/// Parses one request document and validates it into an [`ActionRequest`].
pub fn parse_request(raw: &str) -> Result<(RequestHeader, ActionRequest), RequestError> {
    let envelope: RequestEnvelope =
        serde_json::from_str(raw).map_err(|err| RequestError::Malformed(err.to_string()))?;

    if envelope.header.transaction_id.is_empty() {
        return Err(RequestError::EmptyTransactionId);
    }

    let request = match envelope.header.action {
        Action::Register | Action::Cancel => {
            let body: TokenBody = serde_json::from_value(envelope.body)
                .map_err(|err| RequestError::Malformed(err.to_string()))?;
            if body.device_token.is_empty() {
                return Err(RequestError::EmptyDeviceToken);
            }
            let platform = envelope
                .header
                .platform
                .ok_or(RequestError::MissingPlatform)?;
            let user_id = body
                .user_ids
                .and_then(|user_ids| user_ids.into_iter().next());

            match envelope.header.action {
                Action::Register => ActionRequest::Register {
                    device_token: body.device_token,
                    platform,
                    user_id,
                },
                _ => ActionRequest::Cancel {
                    device_token: body.device_token,
                    platform,
                    user_id,
                },
            }
        }
        Action::Send => {
            let body: SendBody = serde_json::from_value(envelope.body)
                .map_err(|err| RequestError::Malformed(err.to_string()))?;
            ActionRequest::Send {
                user_ids: body.user_ids,
                title: body.title,
                content: body.content,
                category: body.category,
                deep_link: body.deep_link,
                web_link: body.web_link,
            }
        }
        Action::SendAll => {
            let body: SendAllBody = serde_json::from_value(envelope.body)
                .map_err(|err| RequestError::Malformed(err.to_string()))?;
            ActionRequest::SendAll {
                title: body.title,
                content: body.content,
                category: body.category,
                deep_link: body.deep_link,
                web_link: body.web_link,
            }
        }
    };

    Ok((envelope.header, request))
}

/// Parses a service name given on the command line.
pub fn parse_service(raw: &str) -> Option<Service> {
    match raw {
        "crew" => Some(Service::Crew),
        "official" => Some(Service::Official),
        "operation" => Some(Service::Operation),
        "playground" => Some(Service::Playground),
        "app" => Some(Service::App),
        _ => None,
    }
}
