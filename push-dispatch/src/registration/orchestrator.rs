//! Registration state machine driving the token index and the registrar
//! together.

use crate::observability::{events, fields};
use crate::registration::registrar::{EndpointRegistrar, RegistrarError};
use crate::token_index::{IndexError, Platform, TokenIndex, TokenRecord, UNKNOWN_USER};
use std::error::Error;
use std::fmt::{Display, Formatter};
use tracing::debug;

const COMPONENT: &str = "registration_orchestrator";

/// Failures raised by register/cancel transitions.
#[derive(Debug)]
pub enum RegistrationError {
    Index(IndexError),
    Registrar(RegistrarError),
    /// A deleted record is missing a handle it must carry; teardown cannot
    /// be skipped silently.
    MissingHandles { device_token: String },
}

impl Display for RegistrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationError::Index(err) => write!(f, "{err}"),
            RegistrationError::Registrar(err) => write!(f, "{err}"),
            RegistrationError::MissingHandles { device_token } => {
                write!(
                    f,
                    "deleted record for device '{}' lacks endpoint or subscription handle",
                    fields::format_device_token(device_token)
                )
            }
        }
    }
}

impl Error for RegistrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RegistrationError::Index(err) => Some(err),
            RegistrationError::Registrar(err) => Some(err),
            RegistrationError::MissingHandles { .. } => None,
        }
    }
}

impl From<IndexError> for RegistrationError {
    fn from(err: IndexError) -> Self {
        RegistrationError::Index(err)
    }
}

impl From<RegistrarError> for RegistrationError {
    fn from(err: RegistrarError) -> Self {
        RegistrationError::Registrar(err)
    }
}

/// Outcome of a register transition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RegisterOutcome {
    Registered(TokenRecord),
    /// The device already carries this exact registration; nothing was done.
    AlreadyRegistered,
}

/// Outcome of a cancel transition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CancelOutcome {
    Cancelled(TokenRecord),
    /// No record existed for the device; a non-fatal miss.
    TokenNotFound,
}

/// Drives REGISTER and CANCEL through their per-device state machine.
#[derive(Clone)]
pub struct RegistrationOrchestrator {
    index: TokenIndex,
    registrar: EndpointRegistrar,
}

impl RegistrationOrchestrator {
    pub fn new(index: TokenIndex, registrar: EndpointRegistrar) -> Self {
        Self { index, registrar }
    }

    /// Registers a device token, deciding between the fresh, no-op, claim
    /// and evict transitions based on the current owner.
    pub async fn register(
        &self,
        device_token: &str,
        platform: Platform,
        user_id: Option<&str>,
    ) -> Result<RegisterOutcome, RegistrationError> {
        let requested_owner = user_id.unwrap_or(UNKNOWN_USER);
        let current = self.index.query_by_device(device_token).await?;

        match current {
            None => self.register_fresh(device_token, platform, user_id).await,
            Some(record) if record.user_id == requested_owner => {
                debug!(
                    event = events::REGISTER_NOOP,
                    component = COMPONENT,
                    device_token = fields::format_device_token(device_token).as_str(),
                    user_id = requested_owner,
                    "device already registered to this owner"
                );
                Ok(RegisterOutcome::AlreadyRegistered)
            }
            Some(record) if record.owned_by_unknown() => {
                // Claim: the pair is rewritten under the new owner but the
                // remote endpoint and subscription are reused as-is.
                debug!(
                    event = events::REGISTER_OWNER_CLAIMED,
                    component = COMPONENT,
                    device_token = fields::format_device_token(device_token).as_str(),
                    user_id = requested_owner,
                    "unknown-owned device claimed by user"
                );
                self.index.delete(device_token, Some(UNKNOWN_USER)).await?;
                let stored = self
                    .index
                    .put(
                        requested_owner,
                        device_token,
                        platform,
                        &record.endpoint_arn,
                        &record.subscription_arn,
                    )
                    .await?;
                Ok(RegisterOutcome::Registered(stored))
            }
            Some(record) => {
                // Latest registration wins: the previous owner's pair is torn
                // down completely and the device is treated as fresh.
                debug!(
                    event = events::REGISTER_OWNER_EVICTED,
                    component = COMPONENT,
                    device_token = fields::format_device_token(device_token).as_str(),
                    previous_owner = record.user_id.as_str(),
                    user_id = requested_owner,
                    "device re-registered by a different owner"
                );
                let deleted = self.index.delete(device_token, Some(&record.user_id)).await?;
                if let Some(prior) = deleted {
                    self.registrar
                        .teardown(&prior.endpoint_arn, &prior.subscription_arn)
                        .await;
                }
                self.register_fresh(device_token, platform, user_id).await
            }
        }
    }

    /// Removes a device's registration and tears down its handles.
    pub async fn cancel(
        &self,
        device_token: &str,
        user_id: Option<&str>,
    ) -> Result<CancelOutcome, RegistrationError> {
        let Some(deleted) = self.index.delete(device_token, user_id).await? else {
            debug!(
                event = events::CANCEL_TOKEN_NOT_FOUND,
                component = COMPONENT,
                device_token = fields::format_device_token(device_token).as_str(),
                "no record to cancel"
            );
            return Ok(CancelOutcome::TokenNotFound);
        };

        if deleted.endpoint_arn.is_empty() || deleted.subscription_arn.is_empty() {
            return Err(RegistrationError::MissingHandles {
                device_token: device_token.to_string(),
            });
        }

        self.registrar
            .teardown(&deleted.endpoint_arn, &deleted.subscription_arn)
            .await;

        Ok(CancelOutcome::Cancelled(deleted))
    }

    /// Resolves the current owner of a device, if any.
    pub async fn resolve_owner(
        &self,
        device_token: &str,
    ) -> Result<Option<TokenRecord>, RegistrationError> {
        Ok(self.index.query_by_device(device_token).await?)
    }

    /// Absent -> Active transition: create the endpoint, subscribe it, then
    /// write the record pair. A later step failing rolls the earlier remote
    /// handles back best-effort; the index itself is only written last.
    async fn register_fresh(
        &self,
        device_token: &str,
        platform: Platform,
        user_id: Option<&str>,
    ) -> Result<RegisterOutcome, RegistrationError> {
        let endpoint_arn = self
            .registrar
            .create_endpoint(device_token, platform, user_id)
            .await?;

        let subscription_arn = match self.registrar.subscribe(&endpoint_arn).await {
            Ok(subscription_arn) => subscription_arn,
            Err(err) => {
                self.registrar.delete_endpoint(&endpoint_arn).await;
                return Err(err.into());
            }
        };

        let owner = user_id.unwrap_or(UNKNOWN_USER);
        match self
            .index
            .put(owner, device_token, platform, &endpoint_arn, &subscription_arn)
            .await
        {
            Ok(stored) => Ok(RegisterOutcome::Registered(stored)),
            Err(err) => {
                self.registrar.teardown(&endpoint_arn, &subscription_arn).await;
                Err(err.into())
            }
        }
    }
}
