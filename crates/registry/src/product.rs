use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tracechain_core::{Aggregate, AggregateRoot, DomainError, Identity, ProductId};
use tracechain_events::{AuditEvent, Event};

/// Aggregate root: one registered product batch.
///
/// Existence is tracked by the explicit `registered` flag. No other field
/// (in particular not `created_at`) doubles as a presence marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecord {
    product_id: ProductId,
    product_name: String,
    quality_info: String,
    off_chain_reference: String,
    active: bool,
    created_at: DateTime<Utc>,
    owner: Identity,
    #[serde(skip)]
    registered: bool,
    #[serde(skip)]
    version: u64,
}

impl ProductRecord {
    /// Create an empty, not-yet-registered record.
    pub fn empty(product_id: ProductId) -> Self {
        Self {
            product_id,
            product_name: String::new(),
            quality_info: String::new(),
            off_chain_reference: String::new(),
            active: false,
            created_at: DateTime::<Utc>::default(),
            owner: Identity::zero(),
            registered: false,
            version: 0,
        }
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quality_info(&self) -> &str {
        &self.quality_info
    }

    pub fn off_chain_reference(&self) -> &str {
        &self.off_chain_reference
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn owner(&self) -> Identity {
        self.owner
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Public verification view of this record.
    pub fn verify(&self) -> Verification {
        if !self.registered || !self.active {
            return Verification::invalid();
        }
        Verification {
            valid: true,
            product_name: self.product_name.clone(),
            quality_info: self.quality_info.clone(),
            off_chain_reference: self.off_chain_reference.clone(),
            owner: self.owner,
            created_at: self.created_at,
        }
    }
}

impl AggregateRoot for ProductRecord {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.product_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Result of a public authenticity lookup.
///
/// An absent or inactive record yields `valid = false` with every other
/// field at its zero value (empty strings, zero identity, Unix epoch).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Verification {
    pub valid: bool,
    pub product_name: String,
    pub quality_info: String,
    pub off_chain_reference: String,
    pub owner: Identity,
    pub created_at: DateTime<Utc>,
}

impl Verification {
    pub fn invalid() -> Self {
        Self::default()
    }
}

/// Command: RegisterProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterProduct {
    pub product_id: ProductId,
    pub product_name: String,
    pub off_chain_reference: String,
    pub quality_info: String,
    pub owner: Identity,
    pub created_at: DateTime<Utc>,
}

/// Command: UpdateProductStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProductStatus {
    pub product_id: ProductId,
    pub caller: Identity,
    pub active: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    RegisterProduct(RegisterProduct),
    UpdateProductStatus(UpdateProductStatus),
}

/// Event: ProductRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRegistered {
    pub product_id: ProductId,
    pub product_name: String,
    pub off_chain_reference: String,
    pub quality_info: String,
    pub owner: Identity,
    pub created_at: DateTime<Utc>,
}

/// Event: ProductStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStatusChanged {
    pub product_id: ProductId,
    pub active: bool,
    pub changed_by: Identity,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductRegistered(ProductRegistered),
    ProductStatusChanged(ProductStatusChanged),
}

impl ProductEvent {
    /// Projection onto the externally published audit payload.
    pub fn to_audit(&self) -> AuditEvent {
        match self {
            ProductEvent::ProductRegistered(e) => AuditEvent::Registered {
                product_id: e.product_id.clone(),
                owner: e.owner,
            },
            ProductEvent::ProductStatusChanged(e) => AuditEvent::StatusChanged {
                product_id: e.product_id.clone(),
                active: e.active,
            },
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductRegistered(e) => e.created_at,
            ProductEvent::ProductStatusChanged(e) => e.occurred_at,
        }
    }
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductRegistered(_) => "registry.product.registered",
            ProductEvent::ProductStatusChanged(_) => "registry.product.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }
}

impl Aggregate for ProductRecord {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductRegistered(e) => {
                self.product_id = e.product_id.clone();
                self.product_name = e.product_name.clone();
                self.off_chain_reference = e.off_chain_reference.clone();
                self.quality_info = e.quality_info.clone();
                self.owner = e.owner;
                self.created_at = e.created_at;
                self.active = true;
                self.registered = true;
            }
            ProductEvent::ProductStatusChanged(e) => {
                self.active = e.active;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::RegisterProduct(cmd) => self.handle_register(cmd),
            ProductCommand::UpdateProductStatus(cmd) => self.handle_update_status(cmd),
        }
    }
}

impl ProductRecord {
    fn ensure_product_id(&self, product_id: &ProductId) -> Result<(), DomainError> {
        if &self.product_id != product_id {
            return Err(DomainError::invalid_input("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.registered {
            return Err(DomainError::conflict(format!(
                "product '{}' already registered",
                self.product_id
            )));
        }
        self.ensure_product_id(&cmd.product_id)?;

        Ok(vec![ProductEvent::ProductRegistered(ProductRegistered {
            product_id: cmd.product_id.clone(),
            product_name: cmd.product_name.clone(),
            off_chain_reference: cmd.off_chain_reference.clone(),
            quality_info: cmd.quality_info.clone(),
            owner: cmd.owner,
            created_at: cmd.created_at,
        })])
    }

    fn handle_update_status(
        &self,
        cmd: &UpdateProductStatus,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.registered {
            return Err(DomainError::not_found(format!(
                "product '{}'",
                cmd.product_id
            )));
        }
        self.ensure_product_id(&cmd.product_id)?;

        if cmd.caller != self.owner {
            return Err(DomainError::forbidden(format!(
                "only the owner may update product '{}'",
                self.product_id
            )));
        }

        // Emitted even when `active` already has the requested value.
        Ok(vec![ProductEvent::ProductStatusChanged(ProductStatusChanged {
            product_id: cmd.product_id.clone(),
            active: cmd.active,
            changed_by: cmd.caller,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracechain_core::execute;

    fn test_product_id() -> ProductId {
        ProductId::parse("BATCH-001").unwrap()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn register_cmd(owner: Identity) -> RegisterProduct {
        RegisterProduct {
            product_id: test_product_id(),
            product_name: "Organic Cocoa".to_string(),
            off_chain_reference: "cid:abc123".to_string(),
            quality_info: "Grade A".to_string(),
            owner,
            created_at: test_time(),
        }
    }

    fn status_cmd(caller: Identity, active: bool) -> UpdateProductStatus {
        UpdateProductStatus {
            product_id: test_product_id(),
            caller,
            active,
            occurred_at: test_time(),
        }
    }

    fn registered(owner: Identity) -> ProductRecord {
        let mut record = ProductRecord::empty(test_product_id());
        execute(&mut record, &ProductCommand::RegisterProduct(register_cmd(owner))).unwrap();
        record
    }

    #[test]
    fn register_emits_product_registered_event() {
        let record = ProductRecord::empty(test_product_id());
        let owner = Identity::new();
        let cmd = register_cmd(owner);

        let events = record.handle(&ProductCommand::RegisterProduct(cmd.clone())).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            ProductEvent::ProductRegistered(e) => {
                assert_eq!(e.product_id, cmd.product_id);
                assert_eq!(e.product_name, "Organic Cocoa");
                assert_eq!(e.off_chain_reference, "cid:abc123");
                assert_eq!(e.quality_info, "Grade A");
                assert_eq!(e.owner, owner);
                assert_eq!(e.created_at, cmd.created_at);
            }
            _ => panic!("Expected ProductRegistered event"),
        }
    }

    #[test]
    fn registered_record_is_active_and_owned() {
        let owner = Identity::new();
        let record = registered(owner);

        assert!(record.is_registered());
        assert!(record.is_active());
        assert_eq!(record.owner(), owner);
        assert_eq!(record.version(), 1);
    }

    #[test]
    fn register_rejects_duplicate_registration() {
        let record = registered(Identity::new());

        let err = record
            .handle(&ProductCommand::RegisterProduct(register_cmd(Identity::new())))
            .unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for duplicate registration"),
        }
    }

    #[test]
    fn update_status_by_owner_toggles_active() {
        let owner = Identity::new();
        let mut record = registered(owner);

        execute(&mut record, &ProductCommand::UpdateProductStatus(status_cmd(owner, false))).unwrap();
        assert!(!record.is_active());

        execute(&mut record, &ProductCommand::UpdateProductStatus(status_cmd(owner, true))).unwrap();
        assert!(record.is_active());
        assert_eq!(record.version(), 3);
    }

    #[test]
    fn update_status_with_same_value_still_emits_event() {
        let owner = Identity::new();
        let record = registered(owner);

        let events = record
            .handle(&ProductCommand::UpdateProductStatus(status_cmd(owner, true)))
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ProductEvent::ProductStatusChanged(ProductStatusChanged { active: true, .. })
        ));
    }

    #[test]
    fn update_status_rejects_non_owner() {
        let record = registered(Identity::new());

        let err = record
            .handle(&ProductCommand::UpdateProductStatus(status_cmd(Identity::new(), false)))
            .unwrap_err();
        match err {
            DomainError::Forbidden(_) => {}
            _ => panic!("Expected Forbidden error for non-owner"),
        }
        assert!(record.is_active());
    }

    #[test]
    fn update_status_rejects_unregistered_record() {
        let record = ProductRecord::empty(test_product_id());

        let err = record
            .handle(&ProductCommand::UpdateProductStatus(status_cmd(Identity::new(), false)))
            .unwrap_err();
        match err {
            DomainError::NotFound(_) => {}
            _ => panic!("Expected NotFound error for unregistered record"),
        }
    }

    #[test]
    fn verify_reflects_active_flag() {
        let owner = Identity::new();
        let mut record = registered(owner);

        let v = record.verify();
        assert!(v.valid);
        assert_eq!(v.product_name, "Organic Cocoa");
        assert_eq!(v.owner, owner);

        execute(&mut record, &ProductCommand::UpdateProductStatus(status_cmd(owner, false))).unwrap();
        assert_eq!(record.verify(), Verification::invalid());
    }

    #[test]
    fn epoch_creation_time_is_still_a_registered_record() {
        let owner = Identity::new();
        let mut record = ProductRecord::empty(test_product_id());
        let cmd = RegisterProduct {
            created_at: DateTime::<Utc>::default(),
            ..register_cmd(owner)
        };
        execute(&mut record, &ProductCommand::RegisterProduct(cmd)).unwrap();

        assert!(record.is_registered());
        assert!(record.verify().valid);
    }

    #[test]
    fn invalid_verification_has_zero_fields() {
        let v = Verification::invalid();
        assert!(!v.valid);
        assert!(v.product_name.is_empty());
        assert!(v.quality_info.is_empty());
        assert!(v.off_chain_reference.is_empty());
        assert!(v.owner.is_zero());
        assert_eq!(v.created_at.timestamp(), 0);
    }

    #[test]
    fn serialized_record_omits_bookkeeping() {
        let record = registered(Identity::new());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["product_id"], "BATCH-001");
        assert_eq!(json["active"], true);
        assert!(json.get("registered").is_none());
        assert!(json.get("version").is_none());
    }

    #[test]
    fn audit_projection_keeps_contract_fields() {
        let owner = Identity::new();
        let events = ProductRecord::empty(test_product_id())
            .handle(&ProductCommand::RegisterProduct(register_cmd(owner)))
            .unwrap();

        assert_eq!(
            events[0].to_audit(),
            AuditEvent::Registered {
                product_id: test_product_id(),
                owner,
            }
        );
        assert_eq!(events[0].event_type(), "registry.product.registered");
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let owner = Identity::new();
        let record = registered(owner);
        let before = record.clone();

        let _ = record.handle(&ProductCommand::UpdateProductStatus(status_cmd(owner, false)));
        let _ = record.handle(&ProductCommand::UpdateProductStatus(status_cmd(Identity::new(), false)));
        let _ = record.handle(&ProductCommand::RegisterProduct(register_cmd(owner)));

        assert_eq!(record, before);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: any non-empty batch code registers and verifies
            /// with exactly the stored fields.
            #[test]
            fn register_then_verify_returns_stored_fields(
                product_id in ".{1,40}",
                name in ".{0,60}",
                reference in ".{0,60}",
                quality in ".{0,60}",
            ) {
                let owner = Identity::new();
                let created_at = Utc::now();
                let product_id = ProductId::parse(product_id).unwrap();
                let mut record = ProductRecord::empty(product_id.clone());

                execute(&mut record, &ProductCommand::RegisterProduct(RegisterProduct {
                    product_id,
                    product_name: name.clone(),
                    off_chain_reference: reference.clone(),
                    quality_info: quality.clone(),
                    owner,
                    created_at,
                })).unwrap();

                let v = record.verify();
                prop_assert!(v.valid);
                prop_assert_eq!(v.product_name, name);
                prop_assert_eq!(v.off_chain_reference, reference);
                prop_assert_eq!(v.quality_info, quality);
                prop_assert_eq!(v.owner, owner);
                prop_assert_eq!(v.created_at, created_at);
            }

            /// Property: status toggles never touch metadata, and the final
            /// active flag equals the last requested value.
            #[test]
            fn status_toggles_preserve_metadata(toggles in proptest::collection::vec(any::<bool>(), 1..20)) {
                let owner = Identity::new();
                let mut record = registered(owner);
                let original = record.clone();

                for active in &toggles {
                    execute(&mut record, &ProductCommand::UpdateProductStatus(status_cmd(owner, *active))).unwrap();
                }

                let last = *toggles.last().unwrap();
                prop_assert_eq!(record.is_active(), last);
                prop_assert_eq!(record.product_name(), original.product_name());
                prop_assert_eq!(record.off_chain_reference(), original.off_chain_reference());
                prop_assert_eq!(record.quality_info(), original.quality_info());
                prop_assert_eq!(record.created_at(), original.created_at());
                prop_assert_eq!(record.owner(), owner);
                prop_assert_eq!(record.version(), 1 + toggles.len() as u64);
            }
        }
    }
}
