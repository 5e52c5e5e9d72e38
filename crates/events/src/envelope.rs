use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tracechain_core::Identity;

use crate::event::{AuditEvent, AuditOutcome};

/// An audit event ready to be appended (not yet assigned a sequence number).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub actor: Identity,
    pub outcome: AuditOutcome,
    pub recorded_at: DateTime<Utc>,
    pub event: AuditEvent,
}

impl AuditEntry {
    /// Entry for a successfully applied state change.
    pub fn applied(actor: Identity, recorded_at: DateTime<Utc>, event: AuditEvent) -> Self {
        Self {
            actor,
            outcome: AuditOutcome::Applied,
            recorded_at,
            event,
        }
    }
}

/// Envelope for an appended audit event.
///
/// This is the unit observers read and subscribe to.
///
/// Notes:
/// - **Append-only**: `sequence` starts at 1 and increases by exactly 1 per record.
/// - `event_id` is globally unique (UUIDv7) for de-duplication downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    sequence: u64,
    event_id: Uuid,
    actor: Identity,
    outcome: AuditOutcome,
    recorded_at: DateTime<Utc>,
    event: AuditEvent,
}

impl AuditRecord {
    pub fn new(sequence: u64, event_id: Uuid, entry: AuditEntry) -> Self {
        Self {
            sequence,
            event_id,
            actor: entry.actor,
            outcome: entry.outcome,
            recorded_at: entry.recorded_at,
            event: entry.event,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn actor(&self) -> Identity {
        self.actor
    }

    pub fn outcome(&self) -> AuditOutcome {
        self.outcome
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn event(&self) -> &AuditEvent {
        &self.event
    }

    pub fn into_event(self) -> AuditEvent {
        self.event
    }
}
