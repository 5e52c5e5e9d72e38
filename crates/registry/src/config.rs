//! Registry configuration.

use anyhow::{Context, bail};

use tracechain_core::Identity;

/// Environment variable holding the admin identity (UUID).
pub const ADMIN_ENV: &str = "TRACECHAIN_ADMIN";

/// Environment variable toggling `Verified` audit entries.
pub const AUDIT_VERIFICATIONS_ENV: &str = "TRACECHAIN_AUDIT_VERIFICATIONS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Identity granted `admin` at initialization.
    pub admin: Identity,
    /// Append a `Verified` audit entry for every lookup.
    pub audit_verifications: bool,
}

impl RegistryConfig {
    pub fn new(admin: Identity) -> Self {
        Self {
            admin,
            audit_verifications: false,
        }
    }

    pub fn with_audit_verifications(mut self, enabled: bool) -> Self {
        self.audit_verifications = enabled;
        self
    }

    /// Load from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let admin = lookup(ADMIN_ENV).with_context(|| format!("{ADMIN_ENV} must be set"))?;
        let admin: Identity = admin
            .trim()
            .parse()
            .with_context(|| format!("{ADMIN_ENV} is not a valid identity"))?;
        if admin.is_zero() {
            bail!("{ADMIN_ENV} cannot be the zero identity");
        }

        let audit_verifications = match lookup(AUDIT_VERIFICATIONS_ENV) {
            Some(raw) => parse_flag(&raw)
                .with_context(|| format!("{AUDIT_VERIFICATIONS_ENV} has invalid value '{raw}'"))?,
            None => false,
        };

        Ok(Self {
            admin,
            audit_verifications,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
