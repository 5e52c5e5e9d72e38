//! Product traceability registry.
//!
//! Manufacturers register product batches (metadata plus an opaque pointer
//! to off-chain certification data); anyone can look a batch code up to
//! confirm authenticity and provenance. Every successful change is recorded
//! in an append-only audit log.
//!
//! ```ignore
//! let registry = TraceRegistry::new(RegistryConfig::new(admin));
//! registry.grant_manufacturer(admin, maker)?;
//! registry.register_product(maker, "BATCH-001", "Organic Cocoa", "cid:abc123", "Grade A")?;
//! assert!(registry.verify_product("BATCH-001").valid);
//! ```

pub mod config;
pub mod product;
pub mod registry;
pub mod store;

pub use config::RegistryConfig;
pub use product::{
    ProductCommand, ProductEvent, ProductRecord, ProductRegistered, ProductStatusChanged,
    RegisterProduct, UpdateProductStatus, Verification,
};
pub use registry::TraceRegistry;
pub use store::ProductStore;

pub use tracechain_auth::Capability;
pub use tracechain_core::{DomainError, DomainResult, Identity, ProductId};
