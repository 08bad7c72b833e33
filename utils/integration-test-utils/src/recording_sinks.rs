//! Capturing audit sink and webhook notifier.

use async_trait::async_trait;
use push_dispatch::{AuditEntry, AuditSink, ClientError, DeliveryNotice, WebhookNotifier};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Audit sink that keeps every appended entry in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    fail_appends: AtomicBool,
    pub entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::Relaxed);
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), ClientError> {
        if self.fail_appends.load(Ordering::Relaxed) {
            return Err(ClientError::new("audit append failure injected"));
        }
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }
}

/// Webhook notifier that records every notice instead of POSTing it.
#[derive(Default)]
pub struct RecordingWebhookNotifier {
    fail_notifies: AtomicBool,
    pub notices: Mutex<Vec<DeliveryNotice>>,
}

impl RecordingWebhookNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_notifies(&self, fail: bool) {
        self.fail_notifies.store(fail, Ordering::Relaxed);
    }

    pub async fn notice_count(&self) -> usize {
        self.notices.lock().await.len()
    }
}

#[async_trait]
impl WebhookNotifier for RecordingWebhookNotifier {
    async fn notify(&self, notice: &DeliveryNotice) -> Result<(), ClientError> {
        if self.fail_notifies.load(Ordering::Relaxed) {
            return Err(ClientError::new("webhook notify failure injected"));
        }
        self.notices.lock().await.push(notice.clone());
        Ok(())
    }
}
