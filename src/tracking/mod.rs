//! Tracking decision and per-request state.

pub mod context;
pub mod events;
pub mod filter;
