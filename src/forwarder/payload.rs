//! Collector body shapes and continuity metadata.

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::platform::CollectorPlatform;
use crate::tracking::context::RequestIdentity;
use crate::tracking::events::{IntentInput, TrackedEvent};

pub const STORAGE_MARKER: &str = "dashbotUser";
pub const PLACEHOLDER_SPEECH: &str = "<speak>SessionEndedRequest</speak>";

const DIALOGFLOW_USER: &str = "/originalDetectIntentRequest/payload/user";
const CONVERSATION_USER: &str = "/user";

fn timestamp() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn incoming_body(channel: CollectorPlatform, raw: Value, identity: &RequestIdentity) -> Value {
    match channel {
        CollectorPlatform::Alexa => json!({
            "dashbot_timestamp": timestamp(),
            "event": raw,
        }),
        CollectorPlatform::Google => json!({
            "dashbot_timestamp": timestamp(),
            "request_body": raw,
        }),
        CollectorPlatform::Facebook => raw,
        CollectorPlatform::Generic => json!({
            "text": text_of(&raw),
            "userId": identity.user_id,
            "conversationId": identity.session_id,
            "platformJson": raw,
        }),
    }
}

pub fn outgoing_body(
    channel: CollectorPlatform,
    raw: Value,
    reply: Value,
    identity: &RequestIdentity,
) -> Value {
    match channel {
        CollectorPlatform::Alexa => json!({
            "dashbot_timestamp": timestamp(),
            "event": raw,
            "response": reply,
        }),
        CollectorPlatform::Google => json!({
            "dashbot_timestamp": timestamp(),
            "request_body": raw,
            "message": reply,
        }),
        CollectorPlatform::Facebook => json!({
            "dashbot_timestamp": timestamp(),
            "json": {
                "recipient": { "id": identity.user_id },
                "message": reply,
            },
        }),
        CollectorPlatform::Generic => {
            let mut body = json!({
                "text": text_of(&reply),
                "userId": identity.user_id,
                "conversationId": identity.session_id,
            });
            if let (Some(intent), Some(map)) = (reply.get("intent").cloned(), body.as_object_mut()) {
                map.insert("intent".to_string(), intent);
            }
            if let Some(map) = body.as_object_mut() {
                map.insert("platformJson".to_string(), reply);
            }
            body
        }
    }
}

/// Event fields plus the request's user and conversation ids.
pub fn event_body(event: &TrackedEvent, identity: &RequestIdentity) -> Value {
    let mut body = serde_json::to_value(event).unwrap_or_else(|_| json!({}));
    if let Some(map) = body.as_object_mut() {
        map.insert("userId".to_string(), Value::String(identity.user_id.clone()));
        map.insert(
            "conversationId".to_string(),
            Value::String(identity.session_id.clone()),
        );
    }
    body
}

pub fn annotate_intent(reply: &mut Value, name: String, inputs: Option<Vec<IntentInput>>) {
    let Some(map) = reply.as_object_mut() else {
        return;
    };
    let mut intent = Map::new();
    intent.insert("name".to_string(), Value::String(name));
    if let Some(inputs) = inputs {
        intent.insert("input".to_string(), json!(inputs));
    }
    map.insert("intent".to_string(), Value::Object(intent));
}

/// Merge `dashbotUser.userId` into a serialized storage blob, keeping every other key.
/// A missing or malformed blob counts as empty.
pub fn merge_user_storage(blob: Option<&str>, user_id: &str) -> String {
    let mut storage = match blob.map(serde_json::from_str::<Value>) {
        Some(Ok(Value::Object(map))) => map,
        Some(Ok(_)) | None => Map::new(),
        Some(Err(e)) => {
            debug!("Discarding malformed user storage: {}", e);
            Map::new()
        }
    };

    let marker = storage
        .entry(STORAGE_MARKER.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !marker.is_object() {
        *marker = Value::Object(Map::new());
    }
    if let Some(marker) = marker.as_object_mut() {
        marker.insert("userId".to_string(), Value::String(user_id.to_string()));
    }

    Value::Object(storage).to_string()
}

/// Rewrite the incoming request's user storage in place.
pub fn augment_incoming_storage(raw: &mut Value, user_id: &str) {
    let path = if raw.pointer(DIALOGFLOW_USER).is_some_and(Value::is_object) {
        DIALOGFLOW_USER
    } else if raw.pointer(CONVERSATION_USER).is_some_and(Value::is_object) {
        CONVERSATION_USER
    } else {
        return;
    };

    let Some(Value::Object(user)) = raw.pointer_mut(path) else {
        return;
    };
    let merged = merge_user_storage(user.get("userStorage").and_then(Value::as_str), user_id);
    user.insert("userStorage".to_string(), Value::String(merged));
}

pub fn set_outgoing_storage(reply: &mut Value, serialized: String) {
    if let Some(google) = object_at(reply, &["payload", "google"]) {
        google.insert("userStorage".to_string(), Value::String(serialized));
    }
}

pub fn add_placeholder_speech(channel: CollectorPlatform, reply: &mut Value) {
    match channel {
        CollectorPlatform::Alexa => {
            if let Some(response) = object_at(reply, &["response"]) {
                response.entry("outputSpeech").or_insert_with(|| {
                    json!({ "type": "SSML", "ssml": PLACEHOLDER_SPEECH })
                });
            }
        }
        _ => {
            if let Some(map) = reply.as_object_mut() {
                map.entry("speech")
                    .or_insert_with(|| Value::String(PLACEHOLDER_SPEECH.to_string()));
            }
        }
    }
}

fn text_of(value: &Value) -> String {
    ["text", "speech"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Walk (creating as needed) to the object at `path`.
fn object_at<'a>(root: &'a mut Value, path: &[&str]) -> Option<&'a mut Map<String, Value>> {
    let mut current = root;
    for key in path {
        let map = current.as_object_mut()?;
        current = map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    current.as_object_mut()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_keeps_prior_keys() {
        let merged = merge_user_storage(Some(r#"{"foo":1}"#), "user-1");
        let parsed: Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(parsed, json!({ "foo": 1, "dashbotUser": { "userId": "user-1" } }));
    }

    #[test]
    fn test_merge_malformed_blob_is_empty() {
        let merged = merge_user_storage(Some("{not json"), "user-1");
        let parsed: Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(parsed, json!({ "dashbotUser": { "userId": "user-1" } }));
    }

    #[test]
    fn test_merge_keeps_other_marker_fields() {
        let merged = merge_user_storage(
            Some(r#"{"dashbotUser":{"userId":"old","seen":true}}"#),
            "new",
        );
        let parsed: Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(parsed["dashbotUser"], json!({ "userId": "new", "seen": true }));
    }

    #[test]
    fn test_augment_dialogflow_envelope() {
        let mut raw = json!({
            "originalDetectIntentRequest": {
                "payload": { "user": { "userStorage": "{\"data\":{}}" } }
            }
        });
        augment_incoming_storage(&mut raw, "u");
        let blob = raw
            .pointer("/originalDetectIntentRequest/payload/user/userStorage")
            .and_then(Value::as_str)
            .unwrap();
        let parsed: Value = serde_json::from_str(blob).unwrap();
        assert_eq!(parsed, json!({ "data": {}, "dashbotUser": { "userId": "u" } }));
    }

    #[test]
    fn test_augment_without_user_object_is_untouched() {
        let mut raw = json!({ "request": { "type": "LaunchRequest" } });
        let before = raw.clone();
        augment_incoming_storage(&mut raw, "u");
        assert_eq!(raw, before);
    }

    #[test]
    fn test_outgoing_storage_creates_path() {
        let mut reply = json!({ "fulfillmentText": "hi" });
        set_outgoing_storage(&mut reply, "{}".to_string());
        assert_eq!(reply["payload"]["google"]["userStorage"], json!("{}"));
        assert_eq!(reply["fulfillmentText"], json!("hi"));
    }

    #[test]
    fn test_placeholder_respects_existing_speech() {
        let mut reply = json!({ "response": { "outputSpeech": { "type": "PlainText", "text": "bye" } } });
        add_placeholder_speech(CollectorPlatform::Alexa, &mut reply);
        assert_eq!(reply["response"]["outputSpeech"]["text"], json!("bye"));

        let mut empty = json!({ "version": "1.0", "response": {} });
        add_placeholder_speech(CollectorPlatform::Alexa, &mut empty);
        assert_eq!(empty["response"]["outputSpeech"]["ssml"], json!(PLACEHOLDER_SPEECH));
    }
}
