//! Capability store and authorization checks.

use std::collections::{BTreeSet, HashMap};

use tracechain_core::{DomainError, DomainResult, Identity};

use crate::Capability;

/// Outcome of a grant/revoke that passed authorization.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CapabilityChange {
    /// The capability set was modified.
    Changed,
    /// The identity was already in the requested state.
    Unchanged,
}

impl CapabilityChange {
    pub fn is_changed(self) -> bool {
        self == CapabilityChange::Changed
    }

    fn from_bool(changed: bool) -> Self {
        if changed {
            CapabilityChange::Changed
        } else {
            CapabilityChange::Unchanged
        }
    }
}

/// Identity → capability-set lookup.
///
/// - No IO, no locking (callers serialize access)
/// - No caching: every check reads the current set
/// - `admin` is granted once in `new` and never moves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControl {
    admin: Identity,
    grants: HashMap<Identity, BTreeSet<Capability>>,
}

impl AccessControl {
    /// Initialize with the identity performing system setup as `admin`.
    pub fn new(admin: Identity) -> Self {
        let mut grants = HashMap::new();
        grants.insert(admin, BTreeSet::from([Capability::Admin]));
        Self { admin, grants }
    }

    pub fn admin(&self) -> Identity {
        self.admin
    }

    pub fn has_capability(&self, identity: Identity, capability: Capability) -> bool {
        self.grants
            .get(&identity)
            .is_some_and(|caps| caps.contains(&capability))
    }

    /// Fail with `Unauthorized` unless `identity` currently holds `capability`.
    pub fn require(&self, identity: Identity, capability: Capability) -> DomainResult<()> {
        if self.has_capability(identity, capability) {
            Ok(())
        } else {
            Err(DomainError::unauthorized(capability.as_str()))
        }
    }

    /// Capabilities currently held by `identity` (sorted).
    pub fn capabilities_of(&self, identity: Identity) -> Vec<Capability> {
        self.grants
            .get(&identity)
            .map(|caps| caps.iter().copied().collect())
            .unwrap_or_default()
    }

    /// All identities holding `capability`, sorted.
    pub fn holders(&self, capability: Capability) -> Vec<Identity> {
        let mut holders: Vec<Identity> = self
            .grants
            .iter()
            .filter(|(_, caps)| caps.contains(&capability))
            .map(|(identity, _)| *identity)
            .collect();
        holders.sort();
        holders
    }

    pub fn grant_manufacturer(
        &mut self,
        caller: Identity,
        target: Identity,
    ) -> DomainResult<CapabilityChange> {
        self.require(caller, Capability::Admin)?;
        let changed = self
            .grants
            .entry(target)
            .or_default()
            .insert(Capability::Manufacturer);
        Ok(CapabilityChange::from_bool(changed))
    }

    pub fn revoke_manufacturer(
        &mut self,
        caller: Identity,
        target: Identity,
    ) -> DomainResult<CapabilityChange> {
        self.require(caller, Capability::Admin)?;
        Ok(self.remove(target, Capability::Manufacturer))
    }

    /// Drop the caller's own `manufacturer` capability. Needs no other capability.
    pub fn renounce_manufacturer(&mut self, caller: Identity) -> CapabilityChange {
        self.remove(caller, Capability::Manufacturer)
    }

    fn remove(&mut self, identity: Identity, capability: Capability) -> CapabilityChange {
        let Some(caps) = self.grants.get_mut(&identity) else {
            return CapabilityChange::Unchanged;
        };
        let changed = caps.remove(&capability);
        if caps.is_empty() {
            self.grants.remove(&identity);
        }
        CapabilityChange::from_bool(changed)
    }
}
