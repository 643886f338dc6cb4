//! Event forwarding to the collector.
//!
//! Every submission is spawned onto the current tokio runtime and its handle
//! handed back to the caller, who queues it on the request's tracking context.
//! A failed send is logged (when `printErrors` is on) inside the task and
//! never reaches the host.

pub mod payload;
pub mod redact;

use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PluginConfig;
use crate::error::ForwardError;
use crate::host::{InboundEvent, Transition};
use crate::platform::{CollectorPlatform, Platform};
use crate::services::collector::{CollectorTransport, Submission, SubmissionKind};
use crate::tracking::context::{PendingSend, RequestIdentity};
use crate::tracking::events::{IntentInput, TrackedEvent};
use crate::tracking::filter::should_track;

/// Resolved collector route for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub platform: Platform,
    pub collector: CollectorPlatform,
    pub api_key: Option<String>,
}

pub struct Forwarder {
    config: Arc<PluginConfig>,
    transport: Arc<dyn CollectorTransport>,
}

impl Forwarder {
    pub fn new(config: Arc<PluginConfig>, transport: Arc<dyn CollectorTransport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn channel(&self, platform_name: &str) -> Result<Channel, ForwardError> {
        let platform: Platform = platform_name
            .parse()
            .map_err(ForwardError::UnsupportedPlatform)?;
        Ok(Channel {
            platform,
            collector: platform.collector(),
            api_key: self.config.api_key_for(platform).map(str::to_string),
        })
    }

    /// Submit the raw request. Callers gate on the filter and attach first.
    pub fn forward_incoming(&self, event: &dyn InboundEvent) -> Option<PendingSend> {
        let identity = match event.tracking().get() {
            Some(ctx) => ctx.identity().clone(),
            None => RequestIdentity::from_event(event),
        };
        let channel = self.resolve(&identity, event.platform(), SubmissionKind::Incoming)?;

        let mut raw = event.raw_event().clone();
        if channel.platform.has_user_storage() {
            payload::augment_incoming_storage(&mut raw, &identity.user_id);
        }

        let body = payload::incoming_body(channel.collector, raw, &identity);
        self.dispatch(&identity, channel, SubmissionKind::Incoming, body)
    }

    /// Submit the reply copy, at most once per request. The send is queued on
    /// the request's context; returns whether anything was issued.
    pub fn forward_outgoing(
        &self,
        event: &dyn InboundEvent,
        mut reply: Value,
        transition: Option<&Transition>,
        inputs: Option<Vec<IntentInput>>,
    ) -> bool {
        if !should_track(event, &self.config) {
            return false;
        }
        let Some(ctx) = event.tracking().get() else {
            return false;
        };
        if ctx.is_closed() || !ctx.claim_outgoing() {
            debug!(request_id = %ctx.identity().request_id, "Outgoing already forwarded");
            return false;
        }

        let identity = ctx.identity();
        let Some(channel) = self.resolve(identity, event.platform(), SubmissionKind::Outgoing)
        else {
            return false;
        };

        if let Some(name) = transition.and_then(Transition::intent_name) {
            payload::annotate_intent(&mut reply, name, inputs.or_else(|| ctx.inputs()));
        }
        if channel.platform.has_user_storage() {
            let storage = payload::merge_user_storage(event.user_storage().as_deref(), &identity.user_id);
            payload::set_outgoing_storage(&mut reply, storage);
        }

        let body = payload::outgoing_body(channel.collector, event.raw_event().clone(), reply, identity);
        match self.dispatch(identity, channel, SubmissionKind::Outgoing, body) {
            Some(send) => {
                ctx.enqueue(send);
                true
            }
            None => false,
        }
    }

    /// Custom analytics event for the given request.
    pub fn forward_event(&self, identity: &RequestIdentity, event: &TrackedEvent) -> Option<PendingSend> {
        let channel = self.resolve(identity, &identity.platform, SubmissionKind::Event)?;
        let body = payload::event_body(event, identity);
        self.dispatch(identity, channel, SubmissionKind::Event, body)
    }

    fn resolve(&self, identity: &RequestIdentity, platform_name: &str, kind: SubmissionKind) -> Option<Channel> {
        match self.channel(platform_name) {
            Ok(channel) => Some(channel),
            Err(e) => {
                report_failure(self.config.print_errors, identity.request_id, kind, &e);
                None
            }
        }
    }

    fn dispatch(
        &self,
        identity: &RequestIdentity,
        channel: Channel,
        kind: SubmissionKind,
        mut body: Value,
    ) -> Option<PendingSend> {
        if self.config.redact {
            redact::redact_value(&mut body);
        }

        let request_id = identity.request_id;
        if self.config.debug {
            info!(%request_id, platform = channel.collector.as_str(), kind = kind.as_str(), "Sending to dashbot: {}", body);
        } else {
            debug!(%request_id, platform = channel.collector.as_str(), kind = kind.as_str(), "Sending to dashbot");
        }

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                report_failure(self.config.print_errors, request_id, kind, &ForwardError::NoRuntime);
                return None;
            }
        };

        let submission = Submission {
            platform: channel.collector,
            kind,
            api_key: channel.api_key,
            body,
        };
        let transport = Arc::clone(&self.transport);
        let print_errors = self.config.print_errors;

        Some(runtime.spawn(async move {
            let result = transport.submit(submission).await;
            if let Err(e) = &result {
                report_failure(print_errors, request_id, kind, e);
            }
            result
        }))
    }
}

fn report_failure(print_errors: bool, request_id: Uuid, kind: SubmissionKind, error: &ForwardError) {
    if print_errors {
        warn!(%request_id, kind = kind.as_str(), "Dashbot submission failed: {}", error);
    }
}
