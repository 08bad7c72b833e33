//! Scriptable push transport that records every call it receives.

use async_trait::async_trait;
use push_dispatch::{ClientError, PushTransport};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// One recorded unicast or broadcast publish.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishedMessage {
    pub destination: String,
    pub payload: String,
    pub broadcast: bool,
}

/// Push transport double handing out deterministic handles and message ids.
#[derive(Default)]
pub struct MockPushTransport {
    sequence: AtomicUsize,
    fail_create_endpoint: AtomicBool,
    fail_publish: AtomicBool,
    failing_destinations: Mutex<HashSet<String>>,
    omit_message_ids: AtomicBool,
    pub created_endpoints: Mutex<Vec<(String, String, Option<String>)>>,
    pub deleted_endpoints: Mutex<Vec<String>>,
    pub subscriptions: Mutex<Vec<(String, String)>>,
    pub unsubscriptions: Mutex<Vec<String>>,
    pub published: Mutex<Vec<PublishedMessage>>,
}

impl MockPushTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_create_endpoint(&self, fail: bool) {
        self.fail_create_endpoint.store(fail, Ordering::Relaxed);
    }

    pub fn fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::Relaxed);
    }

    /// Makes publishes to one destination fail while siblings keep working.
    pub async fn fail_destination(&self, destination: &str) {
        self.failing_destinations
            .lock()
            .await
            .insert(destination.to_string());
    }

    pub fn omit_message_ids(&self, omit: bool) {
        self.omit_message_ids.store(omit, Ordering::Relaxed);
    }

    pub async fn created_endpoint_count(&self) -> usize {
        self.created_endpoints.lock().await.len()
    }

    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.lock().await.len()
    }

    pub async fn publish_count(&self) -> usize {
        self.published.lock().await.len()
    }

    fn next(&self) -> usize {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl PushTransport for MockPushTransport {
    async fn create_endpoint(
        &self,
        device_token: &str,
        channel: &str,
        user_data: Option<&str>,
    ) -> Result<Option<String>, ClientError> {
        if self.fail_create_endpoint.load(Ordering::Relaxed) {
            return Err(ClientError::new("mock transport rejected the token"));
        }
        let endpoint_arn = format!("arn:test:endpoint/{}", self.next());
        self.created_endpoints.lock().await.push((
            device_token.to_string(),
            channel.to_string(),
            user_data.map(str::to_string),
        ));
        Ok(Some(endpoint_arn))
    }

    async fn delete_endpoint(&self, endpoint_arn: &str) -> Result<(), ClientError> {
        self.deleted_endpoints
            .lock()
            .await
            .push(endpoint_arn.to_string());
        Ok(())
    }

    async fn subscribe(
        &self,
        topic_arn: &str,
        endpoint_arn: &str,
    ) -> Result<Option<String>, ClientError> {
        let subscription_arn = format!("arn:test:subscription/{}", self.next());
        self.subscriptions
            .lock()
            .await
            .push((topic_arn.to_string(), endpoint_arn.to_string()));
        Ok(Some(subscription_arn))
    }

    async fn unsubscribe(&self, subscription_arn: &str) -> Result<(), ClientError> {
        self.unsubscriptions
            .lock()
            .await
            .push(subscription_arn.to_string());
        Ok(())
    }

    async fn publish_to_endpoint(
        &self,
        endpoint_arn: &str,
        payload: &str,
    ) -> Result<Option<String>, ClientError> {
        if self.fail_publish.load(Ordering::Relaxed)
            || self.failing_destinations.lock().await.contains(endpoint_arn)
        {
            return Err(ClientError::new("mock transport publish failure injected"));
        }
        self.published.lock().await.push(PublishedMessage {
            destination: endpoint_arn.to_string(),
            payload: payload.to_string(),
            broadcast: false,
        });
        if self.omit_message_ids.load(Ordering::Relaxed) {
            Ok(None)
        } else {
            Ok(Some(format!("mid-{}", self.next())))
        }
    }

    async fn publish_to_topic(
        &self,
        topic_arn: &str,
        payload: &str,
    ) -> Result<Option<String>, ClientError> {
        if self.fail_publish.load(Ordering::Relaxed) {
            return Err(ClientError::new("mock transport publish failure injected"));
        }
        self.published.lock().await.push(PublishedMessage {
            destination: topic_arn.to_string(),
            payload: payload.to_string(),
            broadcast: true,
        });
        if self.omit_message_ids.load(Ordering::Relaxed) {
            Ok(None)
        } else {
            Ok(Some(format!("mid-{}", self.next())))
        }
    }
}
