//! Outward service facade tying the orchestrator, the dispatcher and the
//! side-channel collaborators together.
//!
//! The facade owns action-level concerns the inner components stay free of:
//! audit phase emission around every action, operation-name error wrapping,
//! and the fire-once webhook after a completed send.

use crate::audit::{Action, AuditEntry, AuditSink, Phase, Service};
use crate::clients::{KeyValueStore, PushTransport};
use crate::config::ServiceConfig;
use crate::fanout::{FanoutDispatcher, PushMessage};
use crate::observability::{events, fields};
use crate::registration::{
    CancelOutcome, EndpointRegistrar, RegisterOutcome, RegistrationOrchestrator,
};
use crate::token_index::{Platform, TokenIndex};
use crate::webhook::{DeliveryNotice, WebhookNotifier};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "push_service";

/// Identifier the broadcast audit trail carries instead of user ids.
const ALL_USERS: &str = "all";

/// Per-request context propagated from the ingress boundary.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestContext {
    pub transaction_id: String,
    pub service: Service,
}

impl RequestContext {
    pub fn new(transaction_id: &str, service: Service) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            service,
        }
    }
}

/// A core action that failed, wrapped with the operation name so the ingress
/// boundary can log it and answer with a generic failure.
#[derive(Debug)]
pub struct ServiceError {
    operation: &'static str,
    source: Box<dyn Error + Send + Sync>,
}

impl ServiceError {
    fn wrap(operation: &'static str, source: impl Error + Send + Sync + 'static) -> Self {
        Self {
            operation,
            source: Box::new(source),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {}", self.operation, self.source)
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref() as &(dyn Error + 'static))
    }
}

/// The push-dispatch service: token lifecycle plus fan-out sends.
#[derive(Clone)]
pub struct PushService {
    index: TokenIndex,
    orchestrator: RegistrationOrchestrator,
    dispatcher: FanoutDispatcher,
    audit: Arc<dyn AuditSink>,
    webhook: Arc<dyn WebhookNotifier>,
}

impl PushService {
    pub fn new(
        config: Arc<ServiceConfig>,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn PushTransport>,
        audit: Arc<dyn AuditSink>,
        webhook: Arc<dyn WebhookNotifier>,
    ) -> Self {
        let index = TokenIndex::new(store);
        let registrar = EndpointRegistrar::new(transport.clone(), config.clone());
        let orchestrator = RegistrationOrchestrator::new(index.clone(), registrar);
        let dispatcher = FanoutDispatcher::new(index.clone(), transport, config);

        Self {
            index,
            orchestrator,
            dispatcher,
            audit,
            webhook,
        }
    }

    /// Registers a device token for an owner (or the unknown sentinel).
    pub async fn register(
        &self,
        ctx: &RequestContext,
        device_token: &str,
        platform: Platform,
        user_id: Option<&str>,
    ) -> Result<RegisterOutcome, ServiceError> {
        let user_ids: Vec<String> = user_id.map(str::to_string).into_iter().collect();
        debug!(
            event = events::REGISTER_START,
            component = COMPONENT,
            transaction_id = ctx.transaction_id.as_str(),
            device_token = fields::format_device_token(device_token).as_str(),
            user_id = fields::format_optional(user_id).as_str(),
            "register requested"
        );
        self.record_audit(self.token_entry(
            ctx,
            Action::Register,
            Phase::Start,
            platform,
            device_token,
            user_ids.clone(),
        ))
        .await;

        match self
            .orchestrator
            .register(device_token, platform, user_id)
            .await
        {
            Ok(outcome) => {
                debug!(
                    event = events::REGISTER_OK,
                    component = COMPONENT,
                    transaction_id = ctx.transaction_id.as_str(),
                    device_token = fields::format_device_token(device_token).as_str(),
                    "register completed"
                );
                self.record_audit(self.token_entry(
                    ctx,
                    Action::Register,
                    Phase::Success,
                    platform,
                    device_token,
                    user_ids,
                ))
                .await;
                Ok(outcome)
            }
            Err(err) => {
                warn!(
                    event = events::REGISTER_FAILED,
                    component = COMPONENT,
                    transaction_id = ctx.transaction_id.as_str(),
                    device_token = fields::format_device_token(device_token).as_str(),
                    err = %err,
                    "register failed"
                );
                self.record_audit(self.token_entry(
                    ctx,
                    Action::Register,
                    Phase::Fail,
                    platform,
                    device_token,
                    user_ids,
                ))
                .await;
                Err(ServiceError::wrap("register", err))
            }
        }
    }

    /// Cancels a device registration and tears its handles down.
    pub async fn cancel(
        &self,
        ctx: &RequestContext,
        device_token: &str,
        platform: Platform,
        user_id: Option<&str>,
    ) -> Result<CancelOutcome, ServiceError> {
        let user_ids: Vec<String> = user_id.map(str::to_string).into_iter().collect();
        debug!(
            event = events::CANCEL_START,
            component = COMPONENT,
            transaction_id = ctx.transaction_id.as_str(),
            device_token = fields::format_device_token(device_token).as_str(),
            "cancel requested"
        );
        self.record_audit(self.token_entry(
            ctx,
            Action::Cancel,
            Phase::Start,
            platform,
            device_token,
            user_ids.clone(),
        ))
        .await;

        match self.orchestrator.cancel(device_token, user_id).await {
            Ok(outcome) => {
                debug!(
                    event = events::CANCEL_OK,
                    component = COMPONENT,
                    transaction_id = ctx.transaction_id.as_str(),
                    device_token = fields::format_device_token(device_token).as_str(),
                    "cancel completed"
                );
                self.record_audit(self.token_entry(
                    ctx,
                    Action::Cancel,
                    Phase::Success,
                    platform,
                    device_token,
                    user_ids,
                ))
                .await;
                Ok(outcome)
            }
            Err(err) => {
                warn!(
                    event = events::CANCEL_FAILED,
                    component = COMPONENT,
                    transaction_id = ctx.transaction_id.as_str(),
                    device_token = fields::format_device_token(device_token).as_str(),
                    err = %err,
                    "cancel failed"
                );
                self.record_audit(self.token_entry(
                    ctx,
                    Action::Cancel,
                    Phase::Fail,
                    platform,
                    device_token,
                    user_ids,
                ))
                .await;
                Err(ServiceError::wrap("cancel", err))
            }
        }
    }

    /// Implicit unregistration driven by a transport delivery-failure
    /// notice: record the failed message id, then run the cancel path under
    /// the resolved owner.
    pub async fn unregister_failed_delivery(
        &self,
        ctx: &RequestContext,
        device_token: &str,
        message_id: &str,
    ) -> Result<CancelOutcome, ServiceError> {
        let Some(record) = self
            .orchestrator
            .resolve_owner(device_token)
            .await
            .map_err(|err| ServiceError::wrap("unregister", err))?
        else {
            return Ok(CancelOutcome::TokenNotFound);
        };

        debug!(
            event = events::DELIVERY_FAILURE_UNREGISTER,
            component = COMPONENT,
            transaction_id = ctx.transaction_id.as_str(),
            device_token = fields::format_device_token(device_token).as_str(),
            user_id = record.user_id.as_str(),
            message_id,
            "unregistering token after delivery failure"
        );

        let mut failure_entry = self.token_entry(
            ctx,
            Action::Send,
            Phase::Fail,
            record.platform,
            device_token,
            vec![record.user_id.clone()],
        );
        failure_entry.message_ids = vec![message_id.to_string()];
        self.record_audit(failure_entry).await;

        self.cancel(ctx, device_token, record.platform, Some(&record.user_id))
            .await
    }

    /// Fans one message out to every requested user with a live device and
    /// returns the transport message ids that were issued.
    pub async fn send_to_users(
        &self,
        ctx: &RequestContext,
        user_ids: &[String],
        message: &PushMessage,
    ) -> Result<Vec<String>, ServiceError> {
        let report = match self.dispatcher.send_to_users(user_ids, message).await {
            Ok(report) => report,
            Err(err) => {
                self.record_audit(self.send_entry(
                    ctx,
                    Action::Send,
                    Phase::Fail,
                    message,
                    tag_user_ids(user_ids),
                    Vec::new(),
                ))
                .await;
                return Err(ServiceError::wrap("send", err));
            }
        };

        if report.targets == 0 {
            return Ok(report.message_ids);
        }

        self.record_audit(self.send_entry(
            ctx,
            Action::Send,
            Phase::Success,
            message,
            tag_user_ids(user_ids),
            report.message_ids.clone(),
        ))
        .await;

        self.notify_webhook(DeliveryNotice {
            service: ctx.service,
            user_ids: user_ids.to_vec(),
            title: message.title.clone(),
            content: message.content.clone(),
            category: message.category,
            deep_link: message.deep_link.clone(),
            web_link: message.web_link.clone(),
            message_ids: report.message_ids.clone(),
        })
        .await;

        Ok(report.message_ids)
    }

    /// Publishes one message to the broadcast topic.
    pub async fn send_to_all(
        &self,
        ctx: &RequestContext,
        message: &PushMessage,
    ) -> Result<String, ServiceError> {
        let message_id = match self.dispatcher.send_to_all(message).await {
            Ok(message_id) => message_id,
            Err(err) => {
                self.record_audit(self.send_entry(
                    ctx,
                    Action::SendAll,
                    Phase::Fail,
                    message,
                    vec![ALL_USERS.to_string()],
                    Vec::new(),
                ))
                .await;
                return Err(ServiceError::wrap("sendAll", err));
            }
        };

        self.record_audit(self.send_entry(
            ctx,
            Action::SendAll,
            Phase::Success,
            message,
            vec![ALL_USERS.to_string()],
            vec![message_id.clone()],
        ))
        .await;

        self.notify_webhook(DeliveryNotice {
            service: ctx.service,
            user_ids: Vec::new(),
            title: message.title.clone(),
            content: message.content.clone(),
            category: message.category,
            deep_link: message.deep_link.clone(),
            web_link: message.web_link.clone(),
            message_ids: vec![message_id.clone()],
        })
        .await;

        Ok(message_id)
    }

    /// Read-only pair-consistency probe, exposed for operational checks.
    pub fn token_index(&self) -> &TokenIndex {
        &self.index
    }

    fn token_entry(
        &self,
        ctx: &RequestContext,
        action: Action,
        phase: Phase,
        platform: Platform,
        device_token: &str,
        user_ids: Vec<String>,
    ) -> AuditEntry {
        AuditEntry::token_action(
            &ctx.transaction_id,
            action,
            phase,
            ctx.service,
            platform,
            device_token,
            user_ids,
        )
    }

    fn send_entry(
        &self,
        ctx: &RequestContext,
        action: Action,
        phase: Phase,
        message: &PushMessage,
        user_ids: Vec<String>,
        message_ids: Vec<String>,
    ) -> AuditEntry {
        AuditEntry::send_action(
            &ctx.transaction_id,
            action,
            phase,
            ctx.service,
            user_ids,
            message_ids,
            &message.title,
            &message.content,
            message.category,
            message.deep_link.as_deref(),
            message.web_link.as_deref(),
        )
    }

    /// Audit writes are fire-and-forget: a sink failure is logged and never
    /// unwinds the action that produced the entry.
    async fn record_audit(&self, entry: AuditEntry) {
        if let Err(err) = self.audit.append(&entry).await {
            warn!(
                event = events::AUDIT_APPEND_FAILED,
                component = COMPONENT,
                transaction_id = entry.transaction_id.as_str(),
                err = %err,
                "audit append failed"
            );
        }
    }

    /// Fire-once webhook; a failed POST never unwinds the completed send.
    async fn notify_webhook(&self, notice: DeliveryNotice) {
        if let Err(err) = self.webhook.notify(&notice).await {
            warn!(
                event = events::WEBHOOK_POST_FAILED,
                component = COMPONENT,
                err = %err,
                "webhook notification failed"
            );
        }
    }
}

/// Audit rows carry user ids in their stored key form.
fn tag_user_ids(user_ids: &[String]) -> Vec<String> {
    user_ids.iter().map(|user_id| format!("u#{user_id}")).collect()
}
