//! Replays a captured request (and optionally its reply) through the tracker.
//!
//! Usage: dashbot-replay <platform> <options.json> <request.json> [reply.json]

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dashbot_tracking::binder::HookRole;
use dashbot_tracking::host::{InboundEvent, OutgoingReply};
use dashbot_tracking::services::collector::client::HttpCollector;
use dashbot_tracking::{PluginConfig, PluginOptions, Tracker, TrackingSlot};

const USER_ID_PATHS: &[&str] = &[
    "/session/user/userId",
    "/context/System/user/userId",
    "/originalDetectIntentRequest/payload/user/userId",
    "/user/userId",
    "/from/id",
];

const SESSION_ID_PATHS: &[&str] = &[
    "/session/sessionId",
    "/session",
    "/conversation/conversationId",
    "/conversation/id",
];

struct ReplayEvent {
    user_id: String,
    session_id: String,
    platform: String,
    request_type: String,
    raw: Value,
    user_storage: Option<String>,
    slot: TrackingSlot,
}

impl InboundEvent for ReplayEvent {
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

struct ReplayReply(Value);

impl OutgoingReply for ReplayReply {
    fn to_value(&self) -> Value {
        self.0.clone()
    }

    fn has_speech(&self) -> bool {
        self.0.pointer("/response/outputSpeech").is_some() || self.0.get("speech").is_some()
    }
}

fn first_str(raw: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .find_map(|p| raw.pointer(p).and_then(Value::as_str))
        .map(str::to_string)
}

/// The storage the reply is about to persist, else what the request carried in.
fn live_user_storage(reply: &Value, raw: &Value) -> Option<String> {
    first_str(reply, &["/payload/google/userStorage"]).or_else(|| {
        first_str(
            raw,
            &["/originalDetectIntentRequest/payload/user/userStorage", "/user/userStorage"],
        )
    })
}

fn read_json(path: &str) -> Result<Value> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        bail!("usage: dashbot-replay <platform> <options.json> <request.json> [reply.json]");
    }

    let options = PluginOptions::from_path(&args[1])?;
    let config = PluginConfig::from_options(options)?;
    let raw = read_json(&args[2])?;
    let reply = match args.get(3) {
        Some(path) => read_json(path)?,
        None => serde_json::json!({}),
    };

    let transport = Arc::new(HttpCollector::new(config.endpoint.clone(), config.timeout));
    let tracker = Tracker::new(config, transport);

    let event = ReplayEvent {
        user_id: first_str(&raw, USER_ID_PATHS).unwrap_or_else(|| "replay-user".to_string()),
        session_id: first_str(&raw, SESSION_ID_PATHS).unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        platform: args[0].clone(),
        request_type: first_str(&raw, &["/request/type"]).unwrap_or_default(),
        user_storage: live_user_storage(&reply, &raw),
        raw,
        slot: TrackingSlot::new(),
    };
    tracing::info!(user_id = %event.user_id, platform = %event.platform, "Replaying request");

    tracker.request_started(&event);
    let mut reply = ReplayReply(reply);
    match tracker.before_reply(&event, &mut reply, None, HookRole::BeforeReply).await {
        Some(report) => tracing::info!(delivered = report.delivered, failed = report.failed, "Replay finished"),
        None => tracing::info!("Request was not tracked"),
    }

    Ok(())
}
