//! In-memory implementations of the push-dispatch collaborator traits,
//! shared by integration tests across the workspace.

mod memory_store;
mod mock_transport;
mod recording_sinks;

pub use memory_store::MemoryKeyValueStore;
pub use mock_transport::{MockPushTransport, PublishedMessage};
pub use recording_sinks::{RecordingAuditSink, RecordingWebhookNotifier};
