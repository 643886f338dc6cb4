use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ad-hoc analytics events business logic can submit during a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrackedEvent {
    #[serde(rename = "customEvent", rename_all = "camelCase")]
    Custom {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extra_info: Option<Value>,
    },

    #[serde(rename = "revenueEvent", rename_all = "camelCase")]
    Revenue {
        name: String,
        amount: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference_number: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Value>,
    },

    #[serde(rename = "pageLaunchEvent", rename_all = "camelCase")]
    PageLaunch {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extra_info: Option<Value>,
    },

    #[serde(rename = "shareEvent", rename_all = "camelCase")]
    Share {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shared_message: Option<Value>,
    },

    // Collector field names are mixed-case here, keep them verbatim.
    #[serde(rename = "referralEvent")]
    Referral {
        name: String,
        #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ad_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        referer_uri: Option<String>,
    },
}

impl TrackedEvent {
    pub fn custom(name: impl Into<String>) -> Self {
        TrackedEvent::Custom { name: name.into(), extra_info: None }
    }

    pub fn name(&self) -> &str {
        match self {
            TrackedEvent::Custom { name, .. }
            | TrackedEvent::Revenue { name, .. }
            | TrackedEvent::PageLaunch { name, .. }
            | TrackedEvent::Share { name, .. }
            | TrackedEvent::Referral { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentInput {
    pub name: String,
    pub value: Value,
}

impl IntentInput {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Accepted shapes for `add_inputs`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InputAnnotation {
    List { input: Vec<IntentInput> },
    Pair(IntentInput),
}

impl InputAnnotation {
    pub fn into_inputs(self) -> Vec<IntentInput> {
        match self {
            InputAnnotation::List { input } => input,
            InputAnnotation::Pair(pair) => vec![pair],
        }
    }
}

impl From<IntentInput> for InputAnnotation {
    fn from(pair: IntentInput) -> Self {
        InputAnnotation::Pair(pair)
    }
}

impl From<Vec<IntentInput>> for InputAnnotation {
    fn from(input: Vec<IntentInput>) -> Self {
        InputAnnotation::List { input }
    }
}
