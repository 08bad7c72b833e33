//! Bidirectional device/user token index over the key-value store client.

use crate::clients::{ClientError, KeyValueStore, RawRow};
use crate::observability::events;
use crate::token_index::key::{CompositeKey, CorruptKeyError, KeyKind, KeySegment};
use crate::token_index::record::{Platform, TokenAttributes, TokenRecord, UNKNOWN_USER};
use chrono::Utc;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::warn;

const COMPONENT: &str = "token_index";

/// Failures raised by token-index operations.
#[derive(Debug)]
pub enum IndexError {
    /// The underlying store call failed.
    Store(ClientError),
    /// A stored key does not decompose into its tagged segments.
    CorruptKey(CorruptKeyError),
}

impl Display for IndexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexError::Store(err) => write!(f, "token index store call failed: {err}"),
            IndexError::CorruptKey(err) => write!(f, "token index corrupted: {err}"),
        }
    }
}

impl Error for IndexError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            IndexError::Store(err) => Some(err),
            IndexError::CorruptKey(err) => Some(err),
        }
    }
}

impl From<CorruptKeyError> for IndexError {
    fn from(err: CorruptKeyError) -> Self {
        IndexError::CorruptKey(err)
    }
}

/// Consistency verdict for one device's record pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PairHealth {
    /// No record in either direction.
    Absent,
    /// Both records present with identical common fields.
    Intact,
    /// The by-device record exists but its by-user mirror is gone.
    DanglingByDevice { user_id: String },
    /// Both records exist but disagree on handles or creation time.
    Mismatched { user_id: String },
}

/// Owner of all reads and writes against the paired token records.
///
/// The two directional writes are issued together and joined; they are not
/// transactional, and a crash between them leaves a half-written pair that
/// [`TokenIndex::check_pair`] can flag but nothing repairs.
#[derive(Clone)]
pub struct TokenIndex {
    store: Arc<dyn KeyValueStore>,
}

impl TokenIndex {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Writes both directional records for one registration and returns the
    /// stored record. Both writes run concurrently; the first failure is
    /// surfaced only after both have settled.
    pub async fn put(
        &self,
        user_id: &str,
        device_token: &str,
        platform: Platform,
        endpoint_arn: &str,
        subscription_arn: &str,
    ) -> Result<TokenRecord, IndexError> {
        let attributes = TokenAttributes {
            platform,
            endpoint_arn: endpoint_arn.to_string(),
            subscription_arn: subscription_arn.to_string(),
            created_at: Utc::now(),
        };
        let by_user = CompositeKey::by_user(user_id, device_token);
        let by_device = by_user.mirrored();

        let (user_write, device_write) = tokio::join!(
            self.store.put(&by_user, &attributes),
            self.store.put(&by_device, &attributes),
        );
        if user_write.is_err() || device_write.is_err() {
            warn!(
                event = events::INDEX_PAIR_WRITE_INCOMPLETE,
                component = COMPONENT,
                device_token,
                by_user_ok = user_write.is_ok(),
                by_device_ok = device_write.is_ok(),
                "paired index write did not complete on both sides"
            );
        }
        user_write.map_err(IndexError::Store)?;
        device_write.map_err(IndexError::Store)?;

        Ok(TokenRecord::from_row(&by_device, &attributes))
    }

    /// Point lookup of the by-device record. A missing `user_id` looks up the
    /// unknown-owner sentinel row.
    pub async fn get(
        &self,
        device_token: &str,
        user_id: Option<&str>,
    ) -> Result<Option<TokenRecord>, IndexError> {
        let key = CompositeKey::by_device(device_token, user_id.unwrap_or(UNKNOWN_USER));
        let attributes = self.store.get(&key).await.map_err(IndexError::Store)?;
        Ok(attributes.map(|attributes| TokenRecord::from_row(&key, &attributes)))
    }

    /// Resolves the single active device for a user, if any.
    pub async fn query_by_user(&self, user_id: &str) -> Result<Option<TokenRecord>, IndexError> {
        self.query_one(KeySegment::user(user_id), KeyKind::Device)
            .await
    }

    /// Resolves the single active owner for a device, if any.
    pub async fn query_by_device(
        &self,
        device_token: &str,
    ) -> Result<Option<TokenRecord>, IndexError> {
        self.query_one(KeySegment::device(device_token), KeyKind::User)
            .await
    }

    /// Deletes both directional records and returns the prior by-device
    /// value, which carries the handles the caller needs for teardown.
    pub async fn delete(
        &self,
        device_token: &str,
        user_id: Option<&str>,
    ) -> Result<Option<TokenRecord>, IndexError> {
        let by_device = CompositeKey::by_device(device_token, user_id.unwrap_or(UNKNOWN_USER));
        let by_user = by_device.mirrored();

        let (device_delete, user_delete) = tokio::join!(
            self.store.delete(&by_device),
            self.store.delete(&by_user),
        );
        let prior_device = device_delete.map_err(IndexError::Store)?;
        let prior_user = user_delete.map_err(IndexError::Store)?;

        if prior_device.is_some() != prior_user.is_some() {
            warn!(
                event = events::INDEX_PAIR_DELETE_INCOMPLETE,
                component = COMPONENT,
                device_token,
                "delete found only one half of the record pair"
            );
        }

        Ok(prior_device.map(|attributes| TokenRecord::from_row(&by_device, &attributes)))
    }

    /// Classifies the health of one device's record pair. Diagnostic only;
    /// no repair is attempted.
    pub async fn check_pair(&self, device_token: &str) -> Result<PairHealth, IndexError> {
        let Some(by_device) = self.query_by_device(device_token).await? else {
            return Ok(PairHealth::Absent);
        };

        let mirror_key = CompositeKey::by_user(&by_device.user_id, device_token);
        let Some(mirror) = self.store.get(&mirror_key).await.map_err(IndexError::Store)? else {
            return Ok(PairHealth::DanglingByDevice {
                user_id: by_device.user_id,
            });
        };

        if mirror == by_device.attributes() {
            Ok(PairHealth::Intact)
        } else {
            Ok(PairHealth::Mismatched {
                user_id: by_device.user_id,
            })
        }
    }

    async fn query_one(
        &self,
        primary: KeySegment,
        secondary_kind: KeyKind,
    ) -> Result<Option<TokenRecord>, IndexError> {
        let prefix = format!("{}#", secondary_kind.tag());
        let rows = self
            .store
            .query_prefix(&primary, &prefix)
            .await
            .map_err(IndexError::Store)?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        Ok(Some(Self::decode_row(&row)?))
    }

    fn decode_row(row: &RawRow) -> Result<TokenRecord, IndexError> {
        let key = CompositeKey {
            primary: KeySegment::parse(&row.primary)?,
            secondary: KeySegment::parse(&row.secondary)?,
        };
        Ok(TokenRecord::from_row(&key, &row.attributes))
    }
}
