//! Routes validated action requests into the core and shapes the response
//! document.

use crate::request::{ActionRequest, RequestHeader};
use push_dispatch::{
    CancelOutcome, PairHealth, PushMessage, PushService, RegisterOutcome, RequestContext,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

pub mod messages {
    pub const INVALID_REQUEST: &str = "invalid request";
    pub const INTERNAL_ERROR: &str = "internal server error";
    pub const TOKEN_REGISTERED: &str = "token registered";
    pub const TOKEN_ALREADY_REGISTERED: &str = "token already registered";
    pub const TOKEN_CANCELLED: &str = "token cancelled";
    pub const TOKEN_NOT_FOUND: &str = "token not found";
    pub const SEND_COMPLETED: &str = "push sent";
}

/// Response document answered for every invocation.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ResponseDocument {
    pub status: u16,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ResponseDocument {
    pub fn ok(message: &str) -> Self {
        Self {
            status: 200,
            success: true,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn ok_with_data(message: &str, data: serde_json::Value) -> Self {
        Self {
            status: 200,
            success: true,
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self {
            status: 400,
            success: false,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn internal_error() -> Self {
        Self {
            status: 500,
            success: false,
            message: messages::INTERNAL_ERROR.to_string(),
            data: None,
        }
    }
}

/// Executes one validated request. Core errors are logged and answered as a
/// generic failure; the non-fatal domain outcomes keep a success shape.
pub async fn execute(
    service: &PushService,
    header: &RequestHeader,
    request: ActionRequest,
) -> ResponseDocument {
    let ctx = RequestContext::new(&header.transaction_id, header.service);

    match request {
        ActionRequest::Register {
            device_token,
            platform,
            user_id,
        } => {
            match service
                .register(&ctx, &device_token, platform, user_id.as_deref())
                .await
            {
                Ok(RegisterOutcome::Registered(_)) => {
                    ResponseDocument::ok(messages::TOKEN_REGISTERED)
                }
                Ok(RegisterOutcome::AlreadyRegistered) => {
                    ResponseDocument::ok(messages::TOKEN_ALREADY_REGISTERED)
                }
                Err(err) => {
                    error!(err = %err, "register action failed");
                    ResponseDocument::internal_error()
                }
            }
        }
        ActionRequest::Cancel {
            device_token,
            platform,
            user_id,
        } => {
            match service
                .cancel(&ctx, &device_token, platform, user_id.as_deref())
                .await
            {
                Ok(CancelOutcome::Cancelled(_)) => ResponseDocument::ok(messages::TOKEN_CANCELLED),
                Ok(CancelOutcome::TokenNotFound) => {
                    ResponseDocument::ok(messages::TOKEN_NOT_FOUND)
                }
                Err(err) => {
                    error!(err = %err, "cancel action failed");
                    ResponseDocument::internal_error()
                }
            }
        }
        ActionRequest::Send {
            user_ids,
            title,
            content,
            category,
            deep_link,
            web_link,
        } => {
            let message = build_message(&title, &content, category, deep_link, web_link);
            match service.send_to_users(&ctx, &user_ids, &message).await {
                Ok(message_ids) => ResponseDocument::ok_with_data(
                    messages::SEND_COMPLETED,
                    json!({ "messageIds": message_ids }),
                ),
                Err(err) => {
                    error!(err = %err, "send action failed");
                    ResponseDocument::internal_error()
                }
            }
        }
        ActionRequest::SendAll {
            title,
            content,
            category,
            deep_link,
            web_link,
        } => {
            let message = build_message(&title, &content, category, deep_link, web_link);
            match service.send_to_all(&ctx, &message).await {
                Ok(message_id) => ResponseDocument::ok_with_data(
                    messages::SEND_COMPLETED,
                    json!({ "messageIds": [message_id] }),
                ),
                Err(err) => {
                    error!(err = %err, "sendAll action failed");
                    ResponseDocument::internal_error()
                }
            }
        }
    }
}

/// Shapes a pair-health verdict for the operational check command.
pub fn pair_health_response(device_token: &str, health: &PairHealth) -> ResponseDocument {
    let (verdict, user_id) = match health {
        PairHealth::Absent => ("absent", None),
        PairHealth::Intact => ("intact", None),
        PairHealth::DanglingByDevice { user_id } => ("dangling-by-device", Some(user_id.clone())),
        PairHealth::Mismatched { user_id } => ("mismatched", Some(user_id.clone())),
    };

    ResponseDocument::ok_with_data(
        "pair checked",
        json!({
            "deviceToken": device_token,
            "health": verdict,
            "userId": user_id,
        }),
    )
}

fn build_message(
    title: &str,
    content: &str,
    category: push_dispatch::Category,
    deep_link: Option<String>,
    web_link: Option<String>,
) -> PushMessage {
    let mut message = PushMessage::new(title, content, category);
    message.deep_link = deep_link;
    message.web_link = web_link;
    message
}

#[cfg(test)]
mod tests {
    use super::{execute, messages, ResponseDocument};
    use crate::request::parse_request;
    use integration_test_utils::{
        MemoryKeyValueStore, MockPushTransport, RecordingAuditSink, RecordingWebhookNotifier,
    };
    use push_dispatch::{PlatformChannels, PushService, ServiceConfig, WebhookTargets};
    use std::sync::Arc;

    fn make_service() -> (PushService, Arc<MemoryKeyValueStore>) {
        let store = Arc::new(MemoryKeyValueStore::new());
        let config = ServiceConfig {
            region: "test-region".to_string(),
            table_name: "tokens".to_string(),
            broadcast_topic_arn: "arn:test:topic/all".to_string(),
            platform_channels: PlatformChannels {
                ios: "arn:test:app/ios".to_string(),
                android: "arn:test:app/android".to_string(),
            },
            webhooks: WebhookTargets::default(),
        };
        let service = PushService::new(
            Arc::new(config),
            store.clone(),
            Arc::new(MockPushTransport::new()),
            Arc::new(RecordingAuditSink::new()),
            Arc::new(RecordingWebhookNotifier::new()),
        );
        (service, store)
    }

    fn register_request(transaction_id: &str) -> String {
        format!(
            r#"{{
                "header": {{
                    "transactionId": "{transaction_id}",
                    "service": "app",
                    "action": "register",
                    "platform": "iOS"
                }},
                "body": {{ "deviceToken": "tok-1", "userIds": ["u1"] }}
            }}"#
        )
    }

    #[tokio::test]
    async fn register_answers_success_then_duplicate() {
        let (service, _store) = make_service();
        let (header, action) = parse_request(&register_request("txn-1")).expect("should parse");

        let first = execute(&service, &header, action.clone()).await;
        assert_eq!(first, ResponseDocument::ok(messages::TOKEN_REGISTERED));

        let second = execute(&service, &header, action).await;
        assert_eq!(
            second,
            ResponseDocument::ok(messages::TOKEN_ALREADY_REGISTERED)
        );
    }

    #[tokio::test]
    async fn cancelling_an_absent_token_keeps_a_success_shape() {
        let (service, _store) = make_service();
        let raw = r#"{
            "header": {
                "transactionId": "txn-1",
                "service": "app",
                "action": "cancel",
                "platform": "iOS"
            },
            "body": { "deviceToken": "missing" }
        }"#;
        let (header, action) = parse_request(raw).expect("should parse");

        let response = execute(&service, &header, action).await;
        assert_eq!(response, ResponseDocument::ok(messages::TOKEN_NOT_FOUND));
    }

    #[tokio::test]
    async fn send_answers_with_the_issued_message_ids() {
        let (service, _store) = make_service();
        let (header, register) = parse_request(&register_request("txn-1")).expect("should parse");
        execute(&service, &header, register).await;

        let raw = r#"{
            "header": {
                "transactionId": "txn-2",
                "service": "app",
                "action": "send"
            },
            "body": {
                "userIds": ["u1", "ghost"],
                "title": "T",
                "content": "C",
                "category": "NOTICE"
            }
        }"#;
        let (header, action) = parse_request(raw).expect("should parse");

        let response = execute(&service, &header, action).await;
        assert_eq!(response.status, 200);
        let data = response.data.expect("send response should carry data");
        assert_eq!(
            data["messageIds"]
                .as_array()
                .expect("messageIds should be an array")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn core_failures_surface_as_a_generic_internal_error() {
        let (service, store) = make_service();
        store.fail_queries(true);

        let raw = r#"{
            "header": {
                "transactionId": "txn-1",
                "service": "app",
                "action": "send"
            },
            "body": {
                "userIds": ["u1"],
                "title": "T",
                "content": "C",
                "category": "NOTICE"
            }
        }"#;
        let (header, action) = parse_request(raw).expect("should parse");

        let response = execute(&service, &header, action).await;
        assert_eq!(response, ResponseDocument::internal_error());
    }
}
