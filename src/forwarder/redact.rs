//! PII scrubbing for forwarded bodies.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email pattern")
});

// Phone numbers, card numbers and other long digit runs.
static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\d[ -]?){6,}\d\b").expect("valid number pattern")
});

pub const EMAIL_MASK: &str = "[REDACTED_EMAIL]";
pub const NUMBER_MASK: &str = "[REDACTED_NUMBER]";

pub fn redact_text(text: &str) -> String {
    let masked = EMAIL.replace_all(text, EMAIL_MASK);
    NUMBER.replace_all(&masked, NUMBER_MASK).into_owned()
}

/// Scrub user-authored text in place. Only strings under a user-text field are
/// touched; session paths, context names and reference numbers pass through.
pub fn redact_value(value: &mut Value) {
    match value {
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if is_user_text(key) {
                    scrub(child);
                } else {
                    redact_value(child);
                }
            }
        }
        _ => {}
    }
}

fn scrub(value: &mut Value) {
    match value {
        Value::String(s) => *s = redact_text(s),
        Value::Array(items) => items.iter_mut().for_each(scrub),
        Value::Object(map) => map.values_mut().for_each(scrub),
        _ => {}
    }
}

// Utterances, slot values and spoken or displayed reply text.
const USER_TEXT_FIELDS: &[&str] = &[
    "text",
    "querytext",
    "query",
    "value",
    "parameters",
    "speech",
    "ssml",
    "fulfillmenttext",
    "texttospeech",
    "displaytext",
];

fn is_user_text(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    USER_TEXT_FIELDS.contains(&key.as_str())
}
