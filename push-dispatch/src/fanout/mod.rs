//! Fan-out layer: payload encoding and parallel dispatch.

pub(crate) mod dispatcher;
pub(crate) mod payload;

pub use dispatcher::{DispatchError, FanoutDispatcher, FanoutReport};
pub use payload::{broadcast_payload, unicast_payload, Category, PayloadError, PushMessage};
