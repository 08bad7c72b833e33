//! AWS-backed implementations of the push-dispatch collaborator traits.
//!
//! - [`DynamoKeyValueStore`]: the token index table (DynamoDB)
//! - [`DynamoAuditSink`]: history rows in the same table
//! - [`SnsPushTransport`]: platform endpoints, broadcast topic and publishes
//! - [`HttpWebhookNotifier`]: outbound delivery callbacks

mod dynamo_store;
mod history_sink;
mod http_webhook;
mod sns_transport;

pub use dynamo_store::DynamoKeyValueStore;
pub use history_sink::DynamoAuditSink;
pub use http_webhook::HttpWebhookNotifier;
pub use sns_transport::SnsPushTransport;

use aws_config::BehaviorVersion;
use push_dispatch::ServiceConfig;

/// Loads the shared AWS configuration for the service's region.
pub async fn aws_sdk_config(config: &ServiceConfig) -> aws_config::SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()))
        .load()
        .await
}
