//! Append-only audit log.

use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::bus::{EventBus, Subscription};
use crate::envelope::{AuditEntry, AuditRecord};
use crate::in_memory_bus::InMemoryEventBus;

/// Destination for audit entries.
///
/// The registry calls `append` only after an operation succeeded, while it
/// still holds its write guard, so append order is operation order.
/// Implementations must never drop, reorder or rewrite appended records.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: AuditEntry) -> AuditRecord;
}

impl<S> AuditSink for Arc<S>
where
    S: AuditSink + ?Sized,
{
    fn append(&self, entry: AuditEntry) -> AuditRecord {
        (**self).append(entry)
    }
}

/// In-memory audit log with live fan-out to subscribers.
#[derive(Debug, Default)]
pub struct AuditLog {
    records: RwLock<Vec<AuditRecord>>,
    bus: InMemoryEventBus<AuditRecord>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.read(|records| records.to_vec())
    }

    /// Records with a sequence number strictly greater than `sequence`.
    ///
    /// `since(0)` returns everything; observers resume from the last
    /// sequence they processed.
    pub fn since(&self, sequence: u64) -> Vec<AuditRecord> {
        // Sequences are 1-based and gap-free, so the index is sequence itself.
        let start = usize::try_from(sequence).unwrap_or(usize::MAX);
        self.read(|records| records.get(start..).map(<[_]>::to_vec).unwrap_or_default())
    }

    /// Records whose subject is `product_id`, oldest first.
    pub fn for_product(&self, product_id: &str) -> Vec<AuditRecord> {
        self.read(|records| {
            records
                .iter()
                .filter(|r| r.event().subject() == Some(product_id))
                .cloned()
                .collect()
        })
    }

    pub fn len(&self) -> usize {
        self.read(|records| records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live stream of records appended after this call.
    pub fn subscribe(&self) -> Subscription<AuditRecord> {
        self.bus.subscribe()
    }

    /// Export as newline-delimited JSON, one record per line.
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        self.read(|records| -> Result<String, serde_json::Error> {
            let mut out = String::new();
            for record in records {
                out.push_str(&serde_json::to_string(record)?);
                out.push('\n');
            }
            Ok(out)
        })
    }

    fn read<T>(&self, f: impl FnOnce(&[AuditRecord]) -> T) -> T {
        // Appends are a single push, so a poisoned guard still holds a valid log.
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        f(&records)
    }
}

impl AuditSink for AuditLog {
    fn append(&self, entry: AuditEntry) -> AuditRecord {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let sequence = records.len() as u64 + 1;
        let record = AuditRecord::new(sequence, Uuid::now_v7(), entry);
        records.push(record.clone());

        // Publish under the guard so subscribers see append order.
        if let Err(err) = self.bus.publish(record.clone()) {
            tracing::warn!(sequence, error = ?err, "failed to publish audit record");
        }

        tracing::debug!(
            sequence,
            event_type = crate::Event::event_type(record.event()),
            actor = %record.actor(),
            "audit record appended"
        );

        record
    }
}
