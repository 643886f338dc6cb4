pub mod binder;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod host;
pub mod platform;
pub mod services;
pub mod tracking;

pub use binder::{register, register_with_transport, Tracker};
pub use config::{IgnoreUser, PluginConfig, PluginOptions, SessionEndedMode};
pub use tracking::context::TrackingSlot;
pub use tracking::events::{InputAnnotation, IntentInput, TrackedEvent};
