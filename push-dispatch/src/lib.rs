//! # push-dispatch
//!
//! `push-dispatch` keeps a bidirectional device/user token index consistent
//! under registration and cancellation, and fans single logical send
//! requests out across per-user deliveries or one broadcast publish.
//!
//! Typical usage is API-first and centered on [`PushService`]: construct it
//! once with a [`ServiceConfig`] and the four collaborator trait objects
//! ([`KeyValueStore`], [`PushTransport`], [`AuditSink`],
//! [`WebhookNotifier`]), then drive register/cancel/send actions through it.
//! Internal modules are organized by domain layer to keep behavior ownership
//! explicit.
//!
//! ## Message payloads
//!
//! One logical [`PushMessage`] encodes differently per platform; the
//! broadcast envelope carries every platform sub-payload plus a default
//! fallback:
//!
//! ```
//! use push_dispatch::{broadcast_payload, Category, PushMessage};
//!
//! let message = PushMessage::new("Maintenance window", "Tonight at 22:00", Category::Notice)
//!     .with_web_link("https://status.example.com");
//!
//! let envelope = broadcast_payload(&message).unwrap();
//! let parsed: serde_json::Value = serde_json::from_str(&envelope).unwrap();
//! assert!(parsed.get("default").is_some());
//! assert!(parsed.get("APNS").is_some());
//! assert!(parsed.get("GCM").is_some());
//! ```
//!
//! ## Record pair
//!
//! Every active registration is stored twice, once per lookup direction,
//! with identical common fields:
//!
//! ```
//! use push_dispatch::CompositeKey;
//!
//! let by_user = CompositeKey::by_user("42", "abc123");
//! assert_eq!(by_user.to_string(), "(u#42, d#abc123)");
//! assert_eq!(by_user.mirrored(), CompositeKey::by_device("abc123", "42"));
//! ```
//!
//! ## Internal architecture map
//!
//! - API facade: outward [`PushService`] surface and per-request context
//! - Token index: composite keys and the mirrored record pair owner
//! - Registration: endpoint registrar and the per-device state machine
//! - Fan-out: payload encoding and the parallel dispatcher
//! - Collaborator contracts: store/transport/audit/webhook traits
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events. Library code emits
//! events/spans and does not unconditionally initialize a global subscriber.
//! Binaries and tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries.

mod audit;
mod clients;
mod config;
mod fanout;
#[doc(hidden)]
pub mod observability;
mod registration;
mod service;
mod token_index;
mod webhook;

pub use audit::{Action, AuditEntry, AuditSink, NotificationType, Phase, Service};
pub use clients::{ClientError, KeyValueStore, PushTransport, RawRow};
pub use config::{ConfigError, PlatformChannels, ServiceConfig, WebhookTargets};
pub use fanout::{
    broadcast_payload, unicast_payload, Category, DispatchError, FanoutDispatcher, FanoutReport,
    PayloadError, PushMessage,
};
pub use registration::{
    CancelOutcome, EndpointRegistrar, RegisterOutcome, RegistrarError, RegistrationError,
    RegistrationOrchestrator,
};
pub use service::{PushService, RequestContext, ServiceError};
pub use token_index::{
    CompositeKey, CorruptKeyError, IndexError, KeyKind, KeySegment, PairHealth, Platform,
    TokenAttributes, TokenIndex, TokenRecord, UNKNOWN_USER,
};
pub use webhook::{DeliveryNotice, WebhookNotifier};
