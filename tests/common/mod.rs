#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use dashbot_tracking::error::ForwardError;
use dashbot_tracking::host::{HostApp, InboundEvent, OutgoingReply, SharedHandler, Transition};
use dashbot_tracking::platform::PlatformEvent;
use dashbot_tracking::services::collector::{CollectorTransport, Submission, SubmissionKind};
use dashbot_tracking::TrackingSlot;

// ── Collector ───────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingCollector {
    pub submissions: Mutex<Vec<Submission>>,
    pub fail: bool,
}

impl RecordingCollector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { fail: true, ..Default::default() })
    }

    pub fn all(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn of_kind(&self, kind: SubmissionKind) -> Vec<Submission> {
        self.all().into_iter().filter(|s| s.kind == kind).collect()
    }
}

#[async_trait]
impl CollectorTransport for RecordingCollector {
    async fn submit(&self, submission: Submission) -> Result<(), ForwardError> {
        self.submissions.lock().unwrap().push(submission);
        if self.fail {
            return Err(ForwardError::Status { status: 500, body: "boom".to_string() });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Panics inside the send task, so the pending handle resolves to a join error.
pub struct PanickingCollector;

#[async_trait]
impl CollectorTransport for PanickingCollector {
    async fn submit(&self, _submission: Submission) -> Result<(), ForwardError> {
        panic!("collector exploded");
    }

    fn name(&self) -> &'static str {
        "panicking"
    }
}

// ── Host model ──────────────────────────────────────────────────

pub struct FakeEvent {
    pub user_id: String,
    pub session_id: String,
    pub platform: String,
    pub request_type: String,
    pub raw: Value,
    pub user_storage: Option<String>,
    pub slot: TrackingSlot,
}

impl FakeEvent {
    pub fn alexa(user_id: &str, request_type: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            session_id: "some".to_string(),
            platform: "alexa".to_string(),
            request_type: request_type.to_string(),
            raw: json!({
                "version": "1.0",
                "session": {
                    "new": true,
                    "sessionId": "some",
                    "application": { "applicationId": "appId" },
                    "user": { "userId": user_id }
                },
                "request": { "type": request_type, "locale": "en-us" }
            }),
            user_storage: None,
            slot: TrackingSlot::new(),
        }
    }

    pub fn google(user_id: &str, storage: Option<&str>) -> Self {
        let mut user = json!({ "userId": user_id, "locale": "en-US" });
        if let Some(storage) = storage {
            user["userStorage"] = json!(storage);
        }
        Self {
            user_id: user_id.to_string(),
            session_id: "projects/p/agent/sessions/abc".to_string(),
            platform: "google".to_string(),
            request_type: "IntentRequest".to_string(),
            raw: json!({
                "responseId": "r-1",
                "session": "projects/p/agent/sessions/abc",
                "queryResult": { "queryText": "GOOGLE_ASSISTANT_WELCOME" },
                "originalDetectIntentRequest": {
                    "source": "google",
                    "payload": { "user": user }
                }
            }),
            user_storage: storage.map(str::to_string),
            slot: TrackingSlot::new(),
        }
    }
}

impl InboundEvent for FakeEvent {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn platform(&self) -> &str {
        &self.platform
    }

    fn request_type(&self) -> &str {
        &self.request_type
    }

    fn raw_event(&self) -> &Value {
        &self.raw
    }

    fn user_storage(&self) -> Option<String> {
        self.user_storage.clone()
    }

    fn tracking(&self) -> &TrackingSlot {
        &self.slot
    }
}

#[derive(Debug, Clone)]
pub struct FakeReply {
    pub body: Value,
    pub stored: Option<String>,
}

impl FakeReply {
    pub fn speech(text: &str) -> Self {
        Self {
            body: json!({
                "version": "1.0",
                "response": { "outputSpeech": { "type": "SSML", "ssml": format!("<speak>{}</speak>", text) } },
                "sessionAttributes": { "state": "entry" }
            }),
            stored: None,
        }
    }

    pub fn silent() -> Self {
        Self {
            body: json!({ "version": "1.0", "response": {} }),
            stored: None,
        }
    }
}

impl OutgoingReply for FakeReply {
    fn to_value(&self) -> Value {
        self.body.clone()
    }

    fn has_speech(&self) -> bool {
        self.body.pointer("/response/outputSpeech").is_some()
    }

    fn set_user_storage(&mut self, serialized: &str) {
        self.stored = Some(serialized.to_string());
    }
}

#[derive(Default)]
pub struct FakeApp {
    pub request_started: Vec<SharedHandler>,
    pub before_reply: Vec<SharedHandler>,
    pub session_ended: Vec<SharedHandler>,
    pub platform: HashMap<PlatformEvent, Vec<SharedHandler>>,
    pub supported: HashSet<PlatformEvent>,
}

impl FakeApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn supporting(events: &[PlatformEvent]) -> Self {
        Self {
            supported: events.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn bound_platform_hooks(&self) -> usize {
        self.platform.values().map(Vec::len).sum()
    }

    /// Drive one request through the lifecycle the way a host would.
    pub async fn execute<F>(
        &self,
        event: &FakeEvent,
        mut reply: FakeReply,
        transition: Option<Transition>,
        business: F,
    ) -> FakeReply
    where
        F: FnOnce(&FakeEvent),
    {
        for handler in &self.request_started {
            handler.handle(event, None, None).await;
        }

        let platform_event = PlatformEvent::from_request_type(&event.request_type);
        let platform_handlers = platform_event
            .and_then(|e| self.platform.get(&e))
            .cloned()
            .unwrap_or_default();

        for handler in &platform_handlers {
            handler.handle(event, None, None).await;
        }

        business(event);

        for handler in &platform_handlers {
            handler
                .handle(event, Some(&mut reply as &mut dyn OutgoingReply), transition.as_ref())
                .await;
        }

        if event.request_type == "SessionEndedRequest" {
            for handler in &self.session_ended {
                handler
                    .handle(event, Some(&mut reply as &mut dyn OutgoingReply), transition.as_ref())
                    .await;
            }
        }

        for handler in &self.before_reply {
            handler
                .handle(event, Some(&mut reply as &mut dyn OutgoingReply), transition.as_ref())
                .await;
        }

        reply
    }
}

impl HostApp for FakeApp {
    fn on_request_started(&mut self, handler: SharedHandler) {
        self.request_started.push(handler);
    }

    fn on_before_reply_sent(&mut self, handler: SharedHandler) {
        self.before_reply.push(handler);
    }

    fn on_session_ended(&mut self, handler: SharedHandler) {
        self.session_ended.push(handler);
    }

    fn supports(&self, event: PlatformEvent) -> bool {
        self.supported.contains(&event)
    }

    fn on_platform_event(&mut self, event: PlatformEvent, handler: SharedHandler) {
        self.platform.entry(event).or_default().push(handler);
    }
}
