//! Property-based test generators using proptest.

use proptest::prelude::*;
use uuid::Uuid;

/// Strategy for tenant identities `tenant/<uuid>`.
pub fn tenant_strategy() -> impl Strategy<Value = String> {
    prop::array::uniform16(any::<u8>())
        .prop_map(|bytes| format!("tenant/{}", Uuid::from_bytes(bytes)))
}

/// Strategy for well-formed massif and seal paths over a small tenant pool.
///
/// A small pool makes collisions between tenants likely, which is what
/// collation tests need.
pub fn log_path_strategy(tenants: Vec<String>) -> impl Strategy<Value = String> {
    (prop::sample::select(tenants), any::<bool>(), 0u32..64).prop_map(|(tenant, seal, n)| {
        if seal {
            merklelog_core::paths::seal_path(&tenant, n)
        } else {
            merklelog_core::paths::massif_path(&tenant, n)
        }
    })
}

/// Strategy for paths that do not parse as log paths.
pub fn malformed_path_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,12}".prop_map(|s| format!("v1/mmrs/{s}")),
        "[a-z]{1,12}".prop_map(|s| format!("v1/mmrs/tenant/{s}/0/massifs/{s}.log")),
        (0u32..100).prop_map(|n| format!("v2/mmrs/tenant/x/0/massifs/{n:016}.log")),
    ]
}

/// Strategy for arbitrary entry payloads.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}
