//! Composite-key model for the bidirectional token index.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Tag for one side of a composite key segment.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KeyKind {
    User,
    Device,
}

impl KeyKind {
    /// Single-letter tag used in the stored `kind#identifier` form.
    pub fn tag(&self) -> &'static str {
        match self {
            KeyKind::User => "u",
            KeyKind::Device => "d",
        }
    }
}

/// One `kind#identifier` tagged key segment, e.g. `u#42` or `d#abc123`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct KeySegment {
    kind: KeyKind,
    id: String,
}

impl KeySegment {
    pub fn user(id: &str) -> Self {
        Self {
            kind: KeyKind::User,
            id: id.to_string(),
        }
    }

    pub fn device(id: &str) -> Self {
        Self {
            kind: KeyKind::Device,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parses a stored segment back into its tagged form.
    ///
    /// A segment without the `#` separator, with an unknown tag, or with an
    /// empty identifier is data corruption and must abort the caller.
    pub fn parse(raw: &str) -> Result<Self, CorruptKeyError> {
        let Some((tag, id)) = raw.split_once('#') else {
            return Err(CorruptKeyError::new(raw));
        };

        if id.is_empty() {
            return Err(CorruptKeyError::new(raw));
        }

        match tag {
            "u" => Ok(Self::user(id)),
            "d" => Ok(Self::device(id)),
            _ => Err(CorruptKeyError::new(raw)),
        }
    }
}

impl Display for KeySegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.kind.tag(), self.id)
    }
}

/// Primary/secondary composite key addressing one directional index record.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CompositeKey {
    pub primary: KeySegment,
    pub secondary: KeySegment,
}

impl CompositeKey {
    /// Key of the by-user record: `(u#<userId>, d#<deviceToken>)`.
    pub fn by_user(user_id: &str, device_token: &str) -> Self {
        Self {
            primary: KeySegment::user(user_id),
            secondary: KeySegment::device(device_token),
        }
    }

    /// Key of the by-device record: `(d#<deviceToken>, u#<userId>)`.
    pub fn by_device(device_token: &str, user_id: &str) -> Self {
        Self {
            primary: KeySegment::device(device_token),
            secondary: KeySegment::user(user_id),
        }
    }

    /// The mirrored key addressing the other half of the record pair.
    pub fn mirrored(&self) -> Self {
        Self {
            primary: self.secondary.clone(),
            secondary: self.primary.clone(),
        }
    }
}

impl Display for CompositeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.primary, self.secondary)
    }
}

/// A stored key that does not decompose into `kind#identifier`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CorruptKeyError {
    raw: String,
}

impl CorruptKeyError {
    fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl Display for CorruptKeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed composite key segment '{}'", self.raw)
    }
}

impl Error for CorruptKeyError {}
