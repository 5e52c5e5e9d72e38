//! `tracechain-auth` — capability-based authorization for the registry.
//!
//! This crate is intentionally decoupled from transport and storage: callers
//! arrive already authenticated, and the store here only answers "does this
//! identity hold this capability right now?".

pub mod access;
pub mod capability;

pub use access::{AccessControl, CapabilityChange};
pub use capability::Capability;
