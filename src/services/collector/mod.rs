//! Transport to the Dashbot tracker.

pub mod client;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ForwardError;
use crate::platform::CollectorPlatform;

pub const CLIENT_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-rust");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Incoming,
    Outgoing,
    Event,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::Incoming => "incoming",
            SubmissionKind::Outgoing => "outgoing",
            SubmissionKind::Event => "event",
        }
    }
}

/// One POST to the collector.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub platform: CollectorPlatform,
    pub kind: SubmissionKind,
    /// Resolved key. `None` fails at submission time.
    pub api_key: Option<String>,
    pub body: Value,
}

#[async_trait]
pub trait CollectorTransport: Send + Sync {
    async fn submit(&self, submission: Submission) -> Result<(), ForwardError>;

    fn name(&self) -> &'static str;
}
