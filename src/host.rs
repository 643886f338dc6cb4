//! Seams the host voice framework implements.
//!
//! The tracker never owns the request/reply model. It reads through these
//! traits and registers handlers through `HostApp`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::platform::PlatformEvent;
use crate::tracking::context::TrackingSlot;

pub trait InboundEvent: Send + Sync {
    fn user_id(&self) -> &str;
    fn session_id(&self) -> &str;
    /// Platform name, e.g. `"alexa"` or `"google"`.
    fn platform(&self) -> &str;
    fn request_type(&self) -> &str;
    /// Wire payload exactly as received.
    fn raw_event(&self) -> &Value;

    /// Live serialized user storage. Only the google platform has one.
    fn user_storage(&self) -> Option<String> {
        None
    }

    /// Extension slot holding the per-request tracking context.
    fn tracking(&self) -> &TrackingSlot;
}

pub trait OutgoingReply: Send + Sync {
    /// Plain structured copy of the reply.
    fn to_value(&self) -> Value;

    fn has_speech(&self) -> bool;

    /// Persist tracking metadata into the real outgoing user storage.
    fn set_user_storage(&mut self, _serialized: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Say {
    One(String),
    Many(Vec<String>),
}

/// Next-state decision for the turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub say: Option<Say>,
}

impl Transition {
    pub fn say(say: impl Into<String>) -> Self {
        Self { say: Some(Say::One(say.into())) }
    }

    pub fn say_many<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            say: Some(Say::Many(names.into_iter().map(Into::into).collect())),
        }
    }

    /// Reported intent name: the say directive, comma-joined.
    pub fn intent_name(&self) -> Option<String> {
        match self.say.as_ref()? {
            Say::One(name) if !name.is_empty() => Some(name.clone()),
            Say::Many(names) if !names.is_empty() => Some(names.join(",")),
            _ => None,
        }
    }
}

#[async_trait]
pub trait LifecycleHandler: Send + Sync {
    async fn handle(
        &self,
        event: &dyn InboundEvent,
        reply: Option<&mut dyn OutgoingReply>,
        transition: Option<&Transition>,
    );
}

pub type SharedHandler = Arc<dyn LifecycleHandler>;

pub trait HostApp {
    fn on_request_started(&mut self, handler: SharedHandler);
    fn on_before_reply_sent(&mut self, handler: SharedHandler);
    fn on_session_ended(&mut self, handler: SharedHandler);

    /// Whether the host exposes a registration point for this event.
    fn supports(&self, event: PlatformEvent) -> bool;

    fn on_platform_event(&mut self, event: PlatformEvent, handler: SharedHandler);
}
