//! Owned record storage with compare-and-set on batch-code presence.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};

use tracechain_core::{DomainError, DomainResult, Identity, ProductId, execute};

use crate::product::{
    ProductCommand, ProductEvent, ProductRecord, RegisterProduct, UpdateProductStatus,
};

/// Product records keyed by batch code.
///
/// A key is present iff its record is registered; entries are never removed.
/// Callers serialize access (the registry holds a write guard across every
/// mutating call).
#[derive(Debug, Clone, Default)]
pub struct ProductStore {
    records: HashMap<ProductId, ProductRecord>,
}

impl ProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, product_id: &str) -> Option<&ProductRecord> {
        self.records.get(product_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records owned by `owner`, ordered by batch code.
    pub fn owned_by(&self, owner: Identity) -> Vec<&ProductRecord> {
        let mut owned: Vec<&ProductRecord> = self
            .records
            .values()
            .filter(|r| r.owner() == owner)
            .collect();
        owned.sort_by(|a, b| a.product_id().cmp(b.product_id()));
        owned
    }

    /// Insert a new record, failing with `Conflict` if the key is taken.
    pub fn register(&mut self, cmd: RegisterProduct) -> DomainResult<Vec<ProductEvent>> {
        match self.records.entry(cmd.product_id.clone()) {
            Entry::Occupied(slot) => Err(DomainError::conflict(format!(
                "product '{}' already registered",
                slot.key()
            ))),
            Entry::Vacant(slot) => {
                let mut record = ProductRecord::empty(cmd.product_id.clone());
                let events = execute(&mut record, &ProductCommand::RegisterProduct(cmd))?;
                slot.insert(record);
                Ok(events)
            }
        }
    }

    /// Overwrite `active` on an existing record owned by `caller`.
    pub fn update_status(
        &mut self,
        caller: Identity,
        product_id: &str,
        active: bool,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<ProductEvent>> {
        let record = self
            .records
            .get_mut(product_id)
            .ok_or_else(|| DomainError::not_found(format!("product '{product_id}'")))?;

        let cmd = UpdateProductStatus {
            product_id: record.product_id().clone(),
            caller,
            active,
            occurred_at,
        };
        execute(record, &ProductCommand::UpdateProductStatus(cmd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(id: &str, owner: Identity, name: &str) -> RegisterProduct {
        RegisterProduct {
            product_id: ProductId::parse(id).unwrap(),
            product_name: name.to_string(),
            off_chain_reference: "cid:x".to_string(),
            quality_info: "Grade B".to_string(),
            owner,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn second_registration_conflicts_and_keeps_first_record() {
        let mut store = ProductStore::new();
        let first = Identity::new();
        store.register(cmd("LOT-9", first, "first")).unwrap();

        let err = store.register(cmd("LOT-9", Identity::new(), "second")).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let record = store.get("LOT-9").unwrap();
        assert_eq!(record.product_name(), "first");
        assert_eq!(record.owner(), first);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_on_missing_key_is_not_found() {
        let mut store = ProductStore::new();
        let err = store
            .update_status(Identity::new(), "nope", false, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn rejected_update_leaves_record_untouched() {
        let mut store = ProductStore::new();
        let owner = Identity::new();
        store.register(cmd("LOT-1", owner, "x")).unwrap();
        let before = store.get("LOT-1").cloned();

        let err = store
            .update_status(Identity::new(), "LOT-1", false, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        assert_eq!(store.get("LOT-1").cloned(), before);
    }

    #[test]
    fn owned_by_lists_only_owner_records_sorted() {
        let mut store = ProductStore::new();
        let a = Identity::new();
        let b = Identity::new();
        store.register(cmd("LOT-2", a, "x")).unwrap();
        store.register(cmd("LOT-1", a, "y")).unwrap();
        store.register(cmd("LOT-3", b, "z")).unwrap();

        let ids: Vec<&str> = store.owned_by(a).iter().map(|r| r.product_id().as_str()).collect();
        assert_eq!(ids, vec!["LOT-1", "LOT-2"]);
    }
}
