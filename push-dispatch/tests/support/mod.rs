use integration_test_utils::{
    MemoryKeyValueStore, MockPushTransport, RecordingAuditSink, RecordingWebhookNotifier,
};
use push_dispatch::{
    PlatformChannels, PushService, RequestContext, Service, ServiceConfig, WebhookTargets,
};
use std::sync::Arc;

pub(crate) struct Harness {
    pub service: PushService,
    pub store: Arc<MemoryKeyValueStore>,
    pub transport: Arc<MockPushTransport>,
    pub audit: Arc<RecordingAuditSink>,
    pub webhook: Arc<RecordingWebhookNotifier>,
}

pub(crate) fn test_config() -> ServiceConfig {
    ServiceConfig {
        region: "test-region".to_string(),
        table_name: "notification-tokens".to_string(),
        broadcast_topic_arn: "arn:test:topic/all".to_string(),
        platform_channels: PlatformChannels {
            ios: "arn:test:app/APNS/ios".to_string(),
            android: "arn:test:app/GCM/android".to_string(),
        },
        webhooks: WebhookTargets::default(),
    }
}

pub(crate) fn make_harness() -> Harness {
    let store = Arc::new(MemoryKeyValueStore::new());
    let transport = Arc::new(MockPushTransport::new());
    let audit = Arc::new(RecordingAuditSink::new());
    let webhook = Arc::new(RecordingWebhookNotifier::new());

    let service = PushService::new(
        Arc::new(test_config()),
        store.clone(),
        transport.clone(),
        audit.clone(),
        webhook.clone(),
    );

    Harness {
        service,
        store,
        transport,
        audit,
        webhook,
    }
}

pub(crate) fn ctx() -> RequestContext {
    RequestContext::new("txn-1", Service::App)
}
