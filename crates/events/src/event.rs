use serde::{Deserialize, Serialize};

use tracechain_core::{Identity, ProductId};

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - designed to be **append-only**
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "registry.product.registered").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;
}

/// Externally observable audit payload.
///
/// Field order and presence are part of the public contract: indexers read
/// the JSON form (`{"kind": "Registered", "product_id": ..., "owner": ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AuditEvent {
    Registered {
        product_id: ProductId,
        owner: Identity,
    },
    StatusChanged {
        product_id: ProductId,
        active: bool,
    },
    /// The subject is the raw lookup key, which may name no product at all.
    Verified {
        product_id: String,
        valid: bool,
        verifier: Identity,
    },
    ManufacturerGranted {
        account: Identity,
        admin: Identity,
    },
    ManufacturerRevoked {
        account: Identity,
        admin: Identity,
    },
}

impl AuditEvent {
    /// Batch code this event is about, if any.
    pub fn subject(&self) -> Option<&str> {
        match self {
            AuditEvent::Registered { product_id, .. } => Some(product_id.as_str()),
            AuditEvent::StatusChanged { product_id, .. } => Some(product_id.as_str()),
            AuditEvent::Verified { product_id, .. } => Some(product_id.as_str()),
            AuditEvent::ManufacturerGranted { .. } | AuditEvent::ManufacturerRevoked { .. } => {
                None
            }
        }
    }
}

impl Event for AuditEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AuditEvent::Registered { .. } => "registry.product.registered",
            AuditEvent::StatusChanged { .. } => "registry.product.status_changed",
            AuditEvent::Verified { .. } => "registry.product.verified",
            AuditEvent::ManufacturerGranted { .. } => "auth.manufacturer.granted",
            AuditEvent::ManufacturerRevoked { .. } => "auth.manufacturer.revoked",
        }
    }

    fn version(&self) -> u32 {
        1
    }
}

/// Result recorded alongside an audit event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// A state change was applied.
    Applied,
    /// A verification found an active record.
    Valid,
    /// A verification found no active record.
    Invalid,
}

impl AuditOutcome {
    pub fn of_verification(valid: bool) -> Self {
        if valid {
            AuditOutcome::Valid
        } else {
            AuditOutcome::Invalid
        }
    }
}
