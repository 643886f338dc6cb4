//! Per-request tracking state.
//!
//! A `TrackingContext` lives in the event's `TrackingSlot` from request start
//! until the reply is finalized. The slot is set-once, which is what keeps
//! every hook firing for the same request from double counting.

use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::events::{InputAnnotation, IntentInput, TrackedEvent};
use crate::error::ForwardError;
use crate::forwarder::Forwarder;
use crate::host::InboundEvent;

pub type PendingSend = JoinHandle<Result<(), ForwardError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    /// Log correlation only, never sent.
    pub request_id: Uuid,
    pub user_id: String,
    pub session_id: String,
    pub platform: String,
}

impl RequestIdentity {
    pub fn from_event(event: &dyn InboundEvent) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: event.user_id().to_string(),
            session_id: event.session_id().to_string(),
            platform: event.platform().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct TrackingContext {
    identity: RequestIdentity,
    forwarder: Arc<Forwarder>,
    pending: Mutex<Vec<PendingSend>>,
    inputs: Mutex<Option<Vec<IntentInput>>>,
    outgoing_claimed: AtomicBool,
    closed: AtomicBool,
}

impl TrackingContext {
    pub fn new(identity: RequestIdentity, forwarder: Arc<Forwarder>) -> Self {
        Self {
            identity,
            forwarder,
            pending: Mutex::new(Vec::new()),
            inputs: Mutex::new(None),
            outgoing_claimed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn identity(&self) -> &RequestIdentity {
        &self.identity
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Submit a custom analytics event tagged with this request's user and session.
    pub fn track_event(&self, event: TrackedEvent) {
        if self.is_closed() {
            debug!(request_id = %self.identity.request_id, "track_event after reply sent, ignoring '{}'", event.name());
            return;
        }
        if let Some(send) = self.forwarder.forward_event(&self.identity, &event) {
            self.enqueue(send);
        }
    }

    /// Last writer wins.
    pub fn add_inputs(&self, data: impl Into<InputAnnotation>) {
        if self.is_closed() {
            debug!(request_id = %self.identity.request_id, "add_inputs after reply sent, ignoring");
            return;
        }
        let inputs = data.into().into_inputs();
        *self.inputs.lock().unwrap_or_else(PoisonError::into_inner) = Some(inputs);
    }

    pub fn inputs(&self) -> Option<Vec<IntentInput>> {
        self.inputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn enqueue(&self, send: PendingSend) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(send);
    }

    pub fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True exactly once per request: the caller owns the outgoing forward.
    pub fn claim_outgoing(&self) -> bool {
        !self.outgoing_claimed.swap(true, Ordering::AcqRel)
    }

    /// Await every pending send. Failures are counted, never returned.
    pub async fn flush(&self) -> FlushReport {
        let sends: Vec<PendingSend> = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );

        let mut report = FlushReport::default();
        for outcome in join_all(sends).await {
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(_)) => report.failed += 1,
                Err(e) => {
                    if self.forwarder.config().print_errors {
                        warn!(request_id = %self.identity.request_id, "Send task aborted: {}", e);
                    }
                    report.failed += 1;
                }
            }
        }
        report
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Extension slot the host keeps on each inbound event.
#[derive(Default)]
pub struct TrackingSlot {
    cell: OnceLock<TrackingContext>,
}

impl TrackingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&TrackingContext> {
        self.cell.get()
    }

    pub fn is_attached(&self) -> bool {
        self.cell.get().is_some()
    }

    /// No-op when tracking is disabled for this request.
    pub fn track_event(&self, event: TrackedEvent) {
        if let Some(ctx) = self.get() {
            ctx.track_event(event);
        }
    }

    /// No-op when tracking is disabled for this request.
    pub fn add_inputs(&self, data: impl Into<InputAnnotation>) {
        if let Some(ctx) = self.get() {
            ctx.add_inputs(data);
        }
    }

    fn set(&self, ctx: TrackingContext) -> bool {
        self.cell.set(ctx).is_ok()
    }
}

/// Attach a fresh context to the event. Returns false if one is already there.
pub fn attach(event: &dyn InboundEvent, forwarder: &Arc<Forwarder>) -> bool {
    let slot = event.tracking();
    if slot.is_attached() {
        return false;
    }
    let identity = RequestIdentity::from_event(event);
    debug!(request_id = %identity.request_id, user_id = %identity.user_id, "Attaching tracking context");
    slot.set(TrackingContext::new(identity, Arc::clone(forwarder)))
}
