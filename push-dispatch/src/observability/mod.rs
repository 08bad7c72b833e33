//! Structured-logging vocabulary shared by all components.
//!
//! Library code emits `tracing` events with these names and field keys and
//! never installs a global subscriber; binaries own one-time
//! `tracing_subscriber` initialization.

pub mod events;
pub mod fields;
