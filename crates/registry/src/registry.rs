//! Registry service: authorization gate → record store → audit log.
//!
//! Every mutating call runs under one write guard spanning the capability
//! check, the record check and the write, and appends its audit entry before
//! the guard is released:
//!
//! ```text
//! caller ─▶ AccessControl::require ─▶ ProductStore (compare-and-set) ─▶ AuditSink::append
//!           └──────────────── single RwLock write guard ────────────────┘
//! ```
//!
//! Reads take the read guard only, so they run concurrently with each other
//! and observe either the state before or after a write, never a mix.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::instrument;

use tracechain_auth::{AccessControl, Capability, CapabilityChange};
use tracechain_core::{Clock, DomainError, DomainResult, Identity, ProductId, SystemClock};
use tracechain_events::{AuditEntry, AuditEvent, AuditLog, AuditOutcome, AuditSink};

use crate::config::RegistryConfig;
use crate::product::{ProductEvent, ProductRecord, RegisterProduct, Verification};
use crate::store::ProductStore;

#[derive(Debug)]
struct RegistryState {
    access: AccessControl,
    products: ProductStore,
}

/// Traceability registry for product batches.
#[derive(Debug)]
pub struct TraceRegistry<A = AuditLog, C = SystemClock> {
    state: RwLock<RegistryState>,
    audit: A,
    clock: C,
    config: RegistryConfig,
}

impl TraceRegistry {
    /// Registry with an in-memory audit log and wall-clock time.
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_parts(config, AuditLog::new(), SystemClock)
    }
}

impl<A, C> TraceRegistry<A, C>
where
    A: AuditSink,
    C: Clock,
{
    pub fn with_parts(config: RegistryConfig, audit: A, clock: C) -> Self {
        tracing::info!(
            admin = %config.admin,
            audit_verifications = config.audit_verifications,
            "registry initialized"
        );
        Self {
            state: RwLock::new(RegistryState {
                access: AccessControl::new(config.admin),
                products: ProductStore::new(),
            }),
            audit,
            clock,
            config,
        }
    }

    pub fn audit(&self) -> &A {
        &self.audit
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────
    // Access control
    // ─────────────────────────────────────────────────────────────────────

    #[instrument(level = "debug", skip(self), fields(caller = %caller, target = %target))]
    pub fn grant_manufacturer(&self, caller: Identity, target: Identity) -> DomainResult<()> {
        let mut state = self.write();
        let change = state
            .access
            .grant_manufacturer(caller, target)
            .inspect_err(|err| log_rejection("grant_manufacturer", caller, err))?;

        if change.is_changed() {
            self.record(caller, AuditEvent::ManufacturerGranted {
                account: target,
                admin: caller,
            });
            tracing::info!(%target, "manufacturer granted");
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self), fields(caller = %caller, target = %target))]
    pub fn revoke_manufacturer(&self, caller: Identity, target: Identity) -> DomainResult<()> {
        let mut state = self.write();
        let change = state
            .access
            .revoke_manufacturer(caller, target)
            .inspect_err(|err| log_rejection("revoke_manufacturer", caller, err))?;

        if change.is_changed() {
            self.record(caller, AuditEvent::ManufacturerRevoked {
                account: target,
                admin: caller,
            });
            tracing::info!(%target, "manufacturer revoked");
        }
        Ok(())
    }

    /// Drop the caller's own `manufacturer` capability. Never fails.
    #[instrument(level = "debug", skip(self), fields(caller = %caller))]
    pub fn renounce_manufacturer(&self, caller: Identity) {
        let mut state = self.write();
        if state.access.renounce_manufacturer(caller) == CapabilityChange::Changed {
            self.record(caller, AuditEvent::ManufacturerRevoked {
                account: caller,
                admin: caller,
            });
            tracing::info!("manufacturer renounced");
        }
    }

    pub fn has_capability(&self, identity: Identity, capability: Capability) -> bool {
        self.read().access.has_capability(identity, capability)
    }

    pub fn admin(&self) -> Identity {
        self.read().access.admin()
    }

    /// Identities currently holding `manufacturer`, sorted.
    pub fn manufacturers(&self) -> Vec<Identity> {
        self.read().access.holders(Capability::Manufacturer)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Products
    // ─────────────────────────────────────────────────────────────────────

    /// Register a new batch owned by `caller`.
    ///
    /// Fails with `Unauthorized` (caller lacks `manufacturer`), `InvalidInput`
    /// (empty batch code) or `Conflict` (batch code taken), checked in that
    /// order.
    #[instrument(level = "debug", skip(self, product_name, off_chain_reference, quality_info), fields(caller = %caller))]
    pub fn register_product(
        &self,
        caller: Identity,
        product_id: &str,
        product_name: &str,
        off_chain_reference: &str,
        quality_info: &str,
    ) -> DomainResult<()> {
        let mut state = self.write();
        let result = state
            .access
            .require(caller, Capability::Manufacturer)
            .and_then(|()| ProductId::parse(product_id))
            .and_then(|product_id| {
                state.products.register(RegisterProduct {
                    product_id,
                    product_name: product_name.to_string(),
                    off_chain_reference: off_chain_reference.to_string(),
                    quality_info: quality_info.to_string(),
                    owner: caller,
                    created_at: self.clock.now(),
                })
            });
        let events = result.inspect_err(|err| log_rejection("register_product", caller, err))?;

        self.record_all(caller, &events);
        tracing::info!(product_id, owner = %caller, "product registered");
        Ok(())
    }

    /// Set the `active` flag of a batch owned by `caller`.
    ///
    /// Fails with `Unauthorized` (caller lacks `manufacturer`, even when they
    /// own the record), `NotFound` or `Forbidden` (caller is not the owner),
    /// checked in that order. Succeeds and is audited even when the flag
    /// already has the requested value.
    #[instrument(level = "debug", skip(self), fields(caller = %caller))]
    pub fn update_product_status(
        &self,
        caller: Identity,
        product_id: &str,
        active: bool,
    ) -> DomainResult<()> {
        let mut state = self.write();
        let result = state
            .access
            .require(caller, Capability::Manufacturer)
            .and_then(|()| {
                state
                    .products
                    .update_status(caller, product_id, active, self.clock.now())
            });
        let events =
            result.inspect_err(|err| log_rejection("update_product_status", caller, err))?;

        self.record_all(caller, &events);
        tracing::info!(product_id, active, "product status updated");
        Ok(())
    }

    /// Public authenticity lookup. Never fails.
    pub fn verify_product(&self, product_id: &str) -> Verification {
        self.verify_product_as(Identity::zero(), product_id)
    }

    /// Authenticity lookup attributed to `verifier` in the audit log (when
    /// verification auditing is enabled).
    pub fn verify_product_as(&self, verifier: Identity, product_id: &str) -> Verification {
        let state = self.read();
        let verification = state
            .products
            .get(product_id)
            .map(ProductRecord::verify)
            .unwrap_or_else(Verification::invalid);

        if self.config.audit_verifications {
            self.audit.append(AuditEntry {
                actor: verifier,
                outcome: AuditOutcome::of_verification(verification.valid),
                recorded_at: self.clock.now(),
                event: AuditEvent::Verified {
                    product_id: product_id.to_string(),
                    valid: verification.valid,
                    verifier,
                },
            });
        }
        drop(state);

        tracing::debug!(product_id, valid = verification.valid, "product verified");
        verification
    }

    /// Full record regardless of its `active` flag.
    pub fn product(&self, product_id: &str) -> Option<ProductRecord> {
        self.read().products.get(product_id).cloned()
    }

    /// Records owned by `owner`, ordered by batch code.
    pub fn products_owned_by(&self, owner: Identity) -> Vec<ProductRecord> {
        self.read()
            .products
            .owned_by(owner)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn product_count(&self) -> usize {
        self.read().products.len()
    }

    fn record_all(&self, actor: Identity, events: &[ProductEvent]) {
        for event in events {
            self.audit.append(AuditEntry::applied(
                actor,
                event.occurred_at(),
                event.to_audit(),
            ));
        }
    }

    fn record(&self, actor: Identity, event: AuditEvent) {
        self.audit.append(AuditEntry::applied(actor, self.clock.now(), event));
    }

    // Writes happen only after every check passes and each is a single
    // insert or overwrite, so a poisoned guard still holds consistent state.
    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn log_rejection(operation: &'static str, caller: Identity, err: &DomainError) {
    match err {
        DomainError::Unauthorized(_) | DomainError::Forbidden(_) => {
            tracing::warn!(operation, %caller, kind = err.kind(), error = %err, "operation rejected");
        }
        _ => {
            tracing::debug!(operation, %caller, kind = err.kind(), error = %err, "operation rejected");
        }
    }
}
