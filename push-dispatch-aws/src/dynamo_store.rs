//! DynamoDB implementation of the key-value store contract.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use push_dispatch::{
    ClientError, CompositeKey, KeySegment, KeyValueStore, Platform, RawRow, TokenAttributes,
};
use std::collections::HashMap;

const ENTITY: &str = "deviceToken";

/// Token-index table client; both directional records live in one table
/// under their `pk`/`sk` composite keys.
pub struct DynamoKeyValueStore {
    client: Client,
    table_name: String,
}

impl DynamoKeyValueStore {
    pub fn new(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }

    fn key_attributes(key: &CompositeKey) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("pk".to_string(), AttributeValue::S(key.primary.to_string())),
            ("sk".to_string(), AttributeValue::S(key.secondary.to_string())),
        ])
    }
}

fn item_from_attributes(
    key: &CompositeKey,
    value: &TokenAttributes,
) -> HashMap<String, AttributeValue> {
    HashMap::from([
        ("pk".to_string(), AttributeValue::S(key.primary.to_string())),
        ("sk".to_string(), AttributeValue::S(key.secondary.to_string())),
        ("entity".to_string(), AttributeValue::S(ENTITY.to_string())),
        (
            "platform".to_string(),
            AttributeValue::S(value.platform.as_str().to_string()),
        ),
        (
            "endpointArn".to_string(),
            AttributeValue::S(value.endpoint_arn.clone()),
        ),
        (
            "subscriptionArn".to_string(),
            AttributeValue::S(value.subscription_arn.clone()),
        ),
        (
            "createdAt".to_string(),
            AttributeValue::S(value.created_at.to_rfc3339()),
        ),
    ])
}

fn string_attribute(
    item: &HashMap<String, AttributeValue>,
    name: &str,
) -> Result<String, ClientError> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .ok_or_else(|| ClientError::new(format!("stored item is missing string attribute '{name}'")))
}

fn parse_platform(raw: &str) -> Result<Platform, ClientError> {
    match raw {
        "iOS" => Ok(Platform::Ios),
        "Android" => Ok(Platform::Android),
        "" => Ok(Platform::None),
        other => Err(ClientError::new(format!(
            "stored item carries unknown platform '{other}'"
        ))),
    }
}

fn parse_created_at(raw: &str) -> Result<DateTime<Utc>, ClientError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|stamp| stamp.with_timezone(&Utc))
        .map_err(|err| ClientError::new(format!("stored createdAt '{raw}' is not RFC 3339: {err}")))
}

fn attributes_from_item(
    item: &HashMap<String, AttributeValue>,
) -> Result<TokenAttributes, ClientError> {
    Ok(TokenAttributes {
        platform: parse_platform(&string_attribute(item, "platform")?)?,
        endpoint_arn: string_attribute(item, "endpointArn")?,
        subscription_arn: string_attribute(item, "subscriptionArn")?,
        created_at: parse_created_at(&string_attribute(item, "createdAt")?)?,
    })
}

#[async_trait]
impl KeyValueStore for DynamoKeyValueStore {
    async fn put(&self, key: &CompositeKey, value: &TokenAttributes) -> Result<(), ClientError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_from_attributes(key, value)))
            .send()
            .await
            .map_err(|err| ClientError::new(format!("dynamodb put_item failed: {err}")))?;
        Ok(())
    }

    async fn get(&self, key: &CompositeKey) -> Result<Option<TokenAttributes>, ClientError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key_attributes(key)))
            .send()
            .await
            .map_err(|err| ClientError::new(format!("dynamodb get_item failed: {err}")))?;

        output.item().map(attributes_from_item).transpose()
    }

    async fn delete(&self, key: &CompositeKey) -> Result<Option<TokenAttributes>, ClientError> {
        let output = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key_attributes(key)))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|err| ClientError::new(format!("dynamodb delete_item failed: {err}")))?;

        output.attributes().map(attributes_from_item).transpose()
    }

    async fn query_prefix(
        &self,
        primary: &KeySegment,
        secondary_prefix: &str,
    ) -> Result<Vec<RawRow>, ClientError> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("pk = :pk AND begins_with(sk, :prefix)")
            .expression_attribute_values(":pk", AttributeValue::S(primary.to_string()))
            .expression_attribute_values(":prefix", AttributeValue::S(secondary_prefix.to_string()))
            .limit(1)
            .send()
            .await
            .map_err(|err| ClientError::new(format!("dynamodb query failed: {err}")))?;

        output
            .items()
            .iter()
            .map(|item| {
                Ok(RawRow {
                    primary: string_attribute(item, "pk")?,
                    secondary: string_attribute(item, "sk")?,
                    attributes: attributes_from_item(item)?,
                })
            })
            .collect()
    }
}
