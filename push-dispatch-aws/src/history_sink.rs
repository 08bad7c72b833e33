//! Audit sink writing history rows into the token table.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use push_dispatch::{AuditEntry, AuditSink, ClientError};
use std::collections::HashMap;

const ENTITY: &str = "history";
const NULL_VALUE: &str = "NULL";

/// Appends one `h#`-keyed row per audit entry. Rows are write-only from the
/// service's point of view.
pub struct DynamoAuditSink {
    client: Client,
    table_name: String,
}

impl DynamoAuditSink {
    pub fn new(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }
}

fn string_or_null(value: Option<&str>) -> AttributeValue {
    let value = value.filter(|value| !value.is_empty()).unwrap_or(NULL_VALUE);
    AttributeValue::S(value.to_string())
}

/// DynamoDB string sets reject empty sets, hence the NULL placeholder.
fn string_set_or_null(values: &[String]) -> AttributeValue {
    if values.is_empty() {
        AttributeValue::Ss(vec![NULL_VALUE.to_string()])
    } else {
        AttributeValue::Ss(values.to_vec())
    }
}

fn history_item(entry: &AuditEntry, table_partition_month: &str) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (
            "pk".to_string(),
            AttributeValue::S(format!("h#{table_partition_month}")),
        ),
        (
            "sk".to_string(),
            AttributeValue::S(format!(
                "h#{}#{}",
                entry.recorded_at.to_rfc3339(),
                entry.transaction_id
            )),
        ),
        ("entity".to_string(), AttributeValue::S(ENTITY.to_string())),
        (
            "action".to_string(),
            AttributeValue::S(entry.action.as_str().to_string()),
        ),
        (
            "status".to_string(),
            AttributeValue::S(entry.phase.as_str().to_string()),
        ),
        (
            "notificationType".to_string(),
            AttributeValue::S(entry.notification_type.as_str().to_string()),
        ),
        (
            "orderServiceName".to_string(),
            AttributeValue::S(entry.service.as_str().to_string()),
        ),
        (
            "platform".to_string(),
            AttributeValue::S(entry.platform.as_str().to_string()),
        ),
        (
            "deviceToken".to_string(),
            string_or_null(Some(entry.device_token.as_str())),
        ),
        ("title".to_string(), string_or_null(entry.title.as_deref())),
        (
            "content".to_string(),
            string_or_null(entry.content.as_deref()),
        ),
        (
            "category".to_string(),
            string_or_null(entry.category.map(|category| category.as_str())),
        ),
        (
            "webLink".to_string(),
            string_or_null(entry.web_link.as_deref()),
        ),
        (
            "applink".to_string(),
            string_or_null(entry.deep_link.as_deref()),
        ),
        ("userIds".to_string(), string_set_or_null(&entry.user_ids)),
        (
            "messageIds".to_string(),
            string_set_or_null(&entry.message_ids),
        ),
    ])
}

#[async_trait]
impl AuditSink for DynamoAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), ClientError> {
        let partition_month = entry.recorded_at.format("%Y-%m").to_string();
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(history_item(entry, &partition_month)))
            .send()
            .await
            .map_err(|err| ClientError::new(format!("dynamodb history put_item failed: {err}")))?;
        Ok(())
    }
}
