//! SNS implementation of the push-transport contract.

use async_trait::async_trait;
use aws_sdk_sns::Client;
use push_dispatch::{ClientError, PushTransport};

const MESSAGE_STRUCTURE_JSON: &str = "json";
const APPLICATION_PROTOCOL: &str = "application";

/// Platform endpoints, the broadcast topic subscription and both publish
/// shapes over one SNS client.
pub struct SnsPushTransport {
    client: Client,
}

impl SnsPushTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PushTransport for SnsPushTransport {
    async fn create_endpoint(
        &self,
        device_token: &str,
        channel: &str,
        user_data: Option<&str>,
    ) -> Result<Option<String>, ClientError> {
        let output = self
            .client
            .create_platform_endpoint()
            .platform_application_arn(channel)
            .token(device_token)
            .set_custom_user_data(user_data.map(str::to_string))
            .send()
            .await
            .map_err(|err| ClientError::new(format!("sns create_platform_endpoint failed: {err}")))?;

        Ok(output.endpoint_arn().map(str::to_string))
    }

    async fn delete_endpoint(&self, endpoint_arn: &str) -> Result<(), ClientError> {
        self.client
            .delete_endpoint()
            .endpoint_arn(endpoint_arn)
            .send()
            .await
            .map_err(|err| ClientError::new(format!("sns delete_endpoint failed: {err}")))?;
        Ok(())
    }

    async fn subscribe(
        &self,
        topic_arn: &str,
        endpoint_arn: &str,
    ) -> Result<Option<String>, ClientError> {
        let output = self
            .client
            .subscribe()
            .topic_arn(topic_arn)
            .protocol(APPLICATION_PROTOCOL)
            .endpoint(endpoint_arn)
            .send()
            .await
            .map_err(|err| ClientError::new(format!("sns subscribe failed: {err}")))?;

        Ok(output.subscription_arn().map(str::to_string))
    }

    async fn unsubscribe(&self, subscription_arn: &str) -> Result<(), ClientError> {
        self.client
            .unsubscribe()
            .subscription_arn(subscription_arn)
            .send()
            .await
            .map_err(|err| ClientError::new(format!("sns unsubscribe failed: {err}")))?;
        Ok(())
    }

    async fn publish_to_endpoint(
        &self,
        endpoint_arn: &str,
        payload: &str,
    ) -> Result<Option<String>, ClientError> {
        let output = self
            .client
            .publish()
            .target_arn(endpoint_arn)
            .message(payload)
            .message_structure(MESSAGE_STRUCTURE_JSON)
            .send()
            .await
            .map_err(|err| ClientError::new(format!("sns publish to endpoint failed: {err}")))?;

        Ok(output.message_id().map(str::to_string))
    }

    async fn publish_to_topic(
        &self,
        topic_arn: &str,
        payload: &str,
    ) -> Result<Option<String>, ClientError> {
        let output = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .message(payload)
            .message_structure(MESSAGE_STRUCTURE_JSON)
            .send()
            .await
            .map_err(|err| ClientError::new(format!("sns publish to topic failed: {err}")))?;

        Ok(output.message_id().map(str::to_string))
    }
}
