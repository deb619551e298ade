//! # merklelog testkit
//!
//! Test utilities for merklelog.
//!
//! This crate provides:
//! - [`TestLog`], an in-memory log writer that builds real massifs and
//!   signed seals and publishes them into any blob store
//! - Temporary replica directories
//! - Property-based strategies for tenants and listing paths
//!
//! ## Usage
//!
//! ```rust
//! use merklelog_storage::InMemoryStore;
//! use merklelog_testkit::TestLog;
//!
//! let mut log = TestLog::new("tenant/6ea5cd00-c711-3649-6914-7b125928bbb4", 3);
//! for n in 0..10u32 {
//!     log.append(format!("app-{n}").as_bytes(), b"payload");
//! }
//! let remote = InMemoryStore::new();
//! log.publish(&remote).unwrap();
//! assert_eq!(log.massif_count(), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
