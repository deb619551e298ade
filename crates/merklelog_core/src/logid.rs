//! Tenant log identifiers.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use uuid::Uuid;

/// Prefix of every tenant identity string.
pub const TENANT_PREFIX: &str = "tenant/";

/// Opaque bytes identifying a tenant's log inside trie keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogId(Vec<u8>);

impl LogId {
    /// Wraps raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The 16 UUID bytes of a `tenant/<uuid>` identity.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidLogId`] if the tenant has no UUID suffix.
    pub fn from_tenant_uuid(tenant: &str) -> CoreResult<Self> {
        let uuid = tenant_uuid(tenant)?;
        Ok(Self(uuid.as_bytes().to_vec()))
    }

    /// Parses a log id given either as a tenant identity, a bare UUID or hex.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidLogId`] if none of the forms match.
    pub fn parse(text: &str) -> CoreResult<Self> {
        if text.starts_with(TENANT_PREFIX) {
            return Self::from_tenant_uuid(text);
        }
        if let Ok(uuid) = Uuid::parse_str(text) {
            return Ok(Self(uuid.as_bytes().to_vec()));
        }
        hex::decode(text)
            .map(Self)
            .map_err(|_| CoreError::InvalidLogId(text.to_string()))
    }

    /// Every encoding a tenant's log id might have been written with.
    ///
    /// UUID bytes first when the identity carries a parseable UUID, then the
    /// raw identity string bytes.
    #[must_use]
    pub fn candidates(tenant: &str) -> Vec<Self> {
        let mut out = Vec::with_capacity(2);
        if let Ok(id) = Self::from_tenant_uuid(tenant) {
            out.push(id);
        }
        out.push(Self(tenant.as_bytes().to_vec()));
        out
    }

    /// The raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Extracts the UUID from a `tenant/<uuid>` identity.
///
/// # Errors
///
/// Returns [`CoreError::InvalidLogId`] if the prefix or UUID is missing.
pub fn tenant_uuid(tenant: &str) -> CoreResult<Uuid> {
    let rest = tenant
        .strip_prefix(TENANT_PREFIX)
        .ok_or_else(|| CoreError::InvalidLogId(tenant.to_string()))?;
    Uuid::parse_str(rest).map_err(|_| CoreError::InvalidLogId(tenant.to_string()))
}

/// Formats the tenant identity for a UUID.
#[must_use]
pub fn tenant_identity(uuid: &Uuid) -> String {
    format!("{TENANT_PREFIX}{uuid}")
}
