//! Token-index layer: composite keys, the record pair model, and the
//! index owner that keeps both lookup directions in step.

pub(crate) mod index;
pub(crate) mod key;
pub(crate) mod record;

pub use index::{IndexError, PairHealth, TokenIndex};
pub use key::{CompositeKey, CorruptKeyError, KeyKind, KeySegment};
pub use record::{Platform, TokenAttributes, TokenRecord, UNKNOWN_USER};
