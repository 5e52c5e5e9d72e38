//! `tracechain-events` — audit events, the append-only audit log and its
//! fan-out bus.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod log;

pub use bus::{EventBus, Subscription};
pub use envelope::{AuditEntry, AuditRecord};
pub use event::{AuditEvent, AuditOutcome, Event};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use log::{AuditLog, AuditSink};
