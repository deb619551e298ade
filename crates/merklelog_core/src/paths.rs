//! Storage paths for massifs and seals.
//!
//! ```text
//! v1/mmrs/<tenant>/0/massifs/<index:016>.log
//! v1/mmrs/<tenant>/0/massifseals/<index:016>.sth
//! ```
//!
//! The same relative paths are used by remote stores and local replicas.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Root of every log path.
pub const MMRS_PREFIX: &str = "v1/mmrs/";
/// Log configuration segment.
const LOG_CONFIG: &str = "0";
const MASSIFS_DIR: &str = "massifs";
const SEALS_DIR: &str = "massifseals";
const MASSIF_EXT: &str = ".log";
const SEAL_EXT: &str = ".sth";

/// Which of a tenant's two blob series a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Massif blobs.
    Massif,
    /// Seal (checkpoint) blobs.
    Seal,
}

impl LogKind {
    fn dir(self) -> &'static str {
        match self {
            Self::Massif => MASSIFS_DIR,
            Self::Seal => SEALS_DIR,
        }
    }

    fn ext(self) -> &'static str {
        match self {
            Self::Massif => MASSIF_EXT,
            Self::Seal => SEAL_EXT,
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Massif => write!(f, "massif"),
            Self::Seal => write!(f, "seal"),
        }
    }
}

/// Prefix covering everything stored for `tenant`.
#[must_use]
pub fn tenant_prefix(tenant: &str) -> String {
    format!("{MMRS_PREFIX}{tenant}/{LOG_CONFIG}/")
}

/// Prefix of one of a tenant's blob series.
#[must_use]
pub fn kind_prefix(tenant: &str, kind: LogKind) -> String {
    format!("{}{}/", tenant_prefix(tenant), kind.dir())
}

/// Path of a blob.
#[must_use]
pub fn blob_path(tenant: &str, kind: LogKind, index: u32) -> String {
    format!("{}{index:016}{}", kind_prefix(tenant, kind), kind.ext())
}

/// Path of massif `index` for `tenant`.
#[must_use]
pub fn massif_path(tenant: &str, index: u32) -> String {
    blob_path(tenant, LogKind::Massif, index)
}

/// Path of the seal for massif `index` of `tenant`.
#[must_use]
pub fn seal_path(tenant: &str, index: u32) -> String {
    blob_path(tenant, LogKind::Seal, index)
}

/// A parsed log path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedPath {
    /// Tenant identity, e.g. `tenant/<uuid>`.
    pub tenant: String,
    /// Massif index.
    pub number: u32,
    /// Blob series.
    pub kind: LogKind,
}

/// Parses a massif or seal path.
///
/// # Errors
///
/// Returns [`CoreError::MalformedPath`] for a wrong prefix, directory or
/// extension, or an unparseable number.
pub fn parse_path(path: &str) -> CoreResult<ParsedPath> {
    let rest = path
        .strip_prefix(MMRS_PREFIX)
        .ok_or_else(|| CoreError::malformed_path(path, "missing v1/mmrs/ prefix"))?;
    let mut parts = rest.rsplitn(4, '/');
    let file = parts.next().unwrap_or_default();
    let dir = parts.next().unwrap_or_default();
    let config = parts.next().unwrap_or_default();
    let tenant = parts.next().unwrap_or_default();

    if tenant.is_empty() {
        return Err(CoreError::malformed_path(path, "missing tenant"));
    }
    if config != LOG_CONFIG {
        return Err(CoreError::malformed_path(path, "unknown log configuration"));
    }
    let kind = match dir {
        MASSIFS_DIR => LogKind::Massif,
        SEALS_DIR => LogKind::Seal,
        _ => return Err(CoreError::malformed_path(path, "unknown blob directory")),
    };
    let stem = file
        .strip_suffix(kind.ext())
        .ok_or_else(|| CoreError::malformed_path(path, "wrong extension"))?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::malformed_path(path, "unparseable number"));
    }
    let number = stem
        .parse::<u32>()
        .map_err(|_| CoreError::malformed_path(path, "unparseable number"))?;
    Ok(ParsedPath {
        tenant: tenant.to_string(),
        number,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TENANT: &str = "tenant/84e0e9e9-d479-4d4e-9e8c-afc19a8fc185";

    #[test]
    fn formats_paths() {
        assert_eq!(
            massif_path(TENANT, 3),
            format!("v1/mmrs/{TENANT}/0/massifs/0000000000000003.log")
        );
        assert_eq!(
            seal_path(TENANT, 12),
            format!("v1/mmrs/{TENANT}/0/massifseals/0000000000000012.sth")
        );
    }

    #[test]
    fn parses_what_it_formats() {
        for kind in [LogKind::Massif, LogKind::Seal] {
            let parsed = parse_path(&blob_path(TENANT, kind, 77)).unwrap();
            assert_eq!(
                parsed,
                ParsedPath {
                    tenant: TENANT.to_string(),
                    number: 77,
                    kind
                }
            );
        }
    }

    #[test]
    fn rejects_malformed() {
        let bad = [
            "v2/mmrs/tenant/x/0/massifs/0000000000000001.log",
            "v1/mmrs/0/massifs/0000000000000001.log",
            "v1/mmrs/tenant/x/1/massifs/0000000000000001.log",
            "v1/mmrs/tenant/x/0/other/0000000000000001.log",
            "v1/mmrs/tenant/x/0/massifs/0000000000000001.sth",
            "v1/mmrs/tenant/x/0/massifseals/0000000000000001.log",
            "v1/mmrs/tenant/x/0/massifs/00000000000000x1.log",
            "v1/mmrs/tenant/x/0/massifs/.log",
            "v1/mmrs/tenant/x/0/massifs/99999999999999999999.log",
        ];
        for path in bad {
            assert!(
                matches!(parse_path(path), Err(CoreError::MalformedPath { .. })),
                "{path}"
            );
        }
    }
}
