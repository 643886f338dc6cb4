//! Hook binding.
//!
//! `register` wires one `Tracker` into the host's lifecycle. Dedupe is keyed
//! on the request's tracking context, never on how many hooks fire, so a
//! request is counted once no matter how many bound hooks see it.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{PluginConfig, PluginOptions, SessionEndedMode};
use crate::error::ConfigError;
use crate::forwarder::{payload, Forwarder};
use crate::host::{HostApp, InboundEvent, LifecycleHandler, OutgoingReply, SharedHandler, Transition};
use crate::platform::PlatformEvent;
use crate::services::collector::client::HttpCollector;
use crate::services::collector::CollectorTransport;
use crate::tracking::context::{attach, FlushReport};
use crate::tracking::filter::should_track;

pub const SESSION_ENDED_REQUEST: &str = "SessionEndedRequest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookRole {
    RequestStarted,
    BeforeReply,
    SessionEnded,
    Platform(PlatformEvent),
}

pub struct Tracker {
    forwarder: Arc<Forwarder>,
}

impl Tracker {
    pub fn new(config: PluginConfig, transport: Arc<dyn CollectorTransport>) -> Self {
        Self {
            forwarder: Arc::new(Forwarder::new(Arc::new(config), transport)),
        }
    }

    pub fn config(&self) -> &PluginConfig {
        self.forwarder.config()
    }

    pub fn forwarder(&self) -> &Arc<Forwarder> {
        &self.forwarder
    }

    /// Attach the context and forward the incoming request. Returns whether
    /// an incoming submission was issued.
    pub fn request_started(&self, event: &dyn InboundEvent) -> bool {
        if !should_track(event, self.config()) {
            debug!(user_id = event.user_id(), "Tracking skipped for request");
            return false;
        }
        if !attach(event, &self.forwarder) {
            return false;
        }
        let Some(ctx) = event.tracking().get() else {
            return false;
        };
        match self.forwarder.forward_incoming(event) {
            Some(send) => {
                ctx.enqueue(send);
                true
            }
            None => false,
        }
    }

    /// Forward the reply copy, then join every pending send for the request.
    /// `None` when this call did not finalize tracking for the request.
    pub async fn before_reply(
        &self,
        event: &dyn InboundEvent,
        reply: &mut dyn OutgoingReply,
        transition: Option<&Transition>,
        role: HookRole,
    ) -> Option<FlushReport> {
        if !should_track(event, self.config()) {
            return None;
        }
        let ctx = event.tracking().get()?;
        if ctx.is_closed() {
            return None;
        }

        let mut copy = reply.to_value();
        if role == HookRole::SessionEnded {
            match self.config().session_ended {
                SessionEndedMode::Guarded if event.request_type() != SESSION_ENDED_REQUEST => {
                    return None;
                }
                SessionEndedMode::Placeholder if !reply.has_speech() => {
                    if let Ok(channel) = self.forwarder.channel(event.platform()) {
                        payload::add_placeholder_speech(channel.collector, &mut copy);
                    }
                }
                _ => {}
            }
        }

        let issued = self.forwarder.forward_outgoing(event, copy, transition, None);
        if issued {
            if let Ok(channel) = self.forwarder.channel(event.platform()) {
                if channel.platform.has_user_storage() {
                    let storage = payload::merge_user_storage(event.user_storage().as_deref(), event.user_id());
                    reply.set_user_storage(&storage);
                }
            }
        }

        let report = ctx.flush().await;
        ctx.close();
        debug!(
            request_id = %ctx.identity().request_id,
            delivered = report.delivered,
            failed = report.failed,
            "Tracking finalized"
        );
        Some(report)
    }
}

struct TrackingHook {
    tracker: Arc<Tracker>,
    role: HookRole,
}

#[async_trait]
impl LifecycleHandler for TrackingHook {
    async fn handle(
        &self,
        event: &dyn InboundEvent,
        reply: Option<&mut dyn OutgoingReply>,
        transition: Option<&Transition>,
    ) {
        match (self.role, reply) {
            (HookRole::RequestStarted, _) | (HookRole::Platform(_), None) => {
                self.tracker.request_started(event);
            }
            (HookRole::Platform(_), Some(reply)) => {
                self.tracker.request_started(event);
                self.tracker.before_reply(event, reply, transition, self.role).await;
            }
            (HookRole::BeforeReply | HookRole::SessionEnded, Some(reply)) => {
                self.tracker.before_reply(event, reply, transition, self.role).await;
            }
            (role, None) => {
                debug!(?role, "Reply hook fired without a reply");
            }
        }
    }
}

fn hook(tracker: &Arc<Tracker>, role: HookRole) -> SharedHandler {
    Arc::new(TrackingHook {
        tracker: Arc::clone(tracker),
        role,
    })
}

/// Register tracking against the host with the HTTP collector.
pub fn register<A>(app: &mut A, options: PluginOptions) -> Result<Arc<Tracker>, ConfigError>
where
    A: HostApp + ?Sized,
{
    let config = PluginConfig::from_options(options)?;
    let transport = Arc::new(HttpCollector::new(config.endpoint.clone(), config.timeout));
    Ok(register_with_transport(app, config, transport))
}

pub fn register_with_transport<A>(
    app: &mut A,
    config: PluginConfig,
    transport: Arc<dyn CollectorTransport>,
) -> Arc<Tracker>
where
    A: HostApp + ?Sized,
{
    let transport_name = transport.name();
    let tracker = Arc::new(Tracker::new(config, transport));

    app.on_request_started(hook(&tracker, HookRole::RequestStarted));
    app.on_before_reply_sent(hook(&tracker, HookRole::BeforeReply));
    app.on_session_ended(hook(&tracker, HookRole::SessionEnded));

    let mut bound = 0;
    for event in PlatformEvent::CATALOG {
        if app.supports(event) {
            app.on_platform_event(event, hook(&tracker, HookRole::Platform(event)));
            bound += 1;
        } else {
            debug!("Host does not expose {}", event.registration_name());
        }
    }

    info!(transport = transport_name, platform_hooks = bound, "Dashbot tracking registered");
    tracker
}
