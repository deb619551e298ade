//! # merklelog storage
//!
//! Blob store abstraction for merklelog.
//!
//! Stores are **opaque blob stores**: they read, atomically replace and list
//! whole blobs addressed by relative `/`-separated paths. They do not
//! interpret massif or seal bytes.
//!
//! ## Available Backends
//!
//! - [`InMemoryStore`] - For testing and ephemeral use
//! - [`FileStore`] - A directory on the local filesystem (local replicas)
//! - [`HttpStore`] - Read-only remote store over an [`HttpClient`]
//!
//! [`StoreBackend`] picks one of these from a location string.
//!
//! ## Example
//!
//! ```rust
//! use merklelog_storage::{BlobStore, StoreBackend};
//!
//! let store = StoreBackend::open("memory:", None).unwrap();
//! store.put("v1/a.log", b"hello").unwrap();
//! assert_eq!(store.list("v1/", None, 10).unwrap().entries.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod http;
mod memory;
mod store;

pub use backend::{StoreBackend, MEMORY_LOCATION};
pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use http::{HttpClient, HttpResponse, HttpStore};
pub use memory::InMemoryStore;
pub use store::{BlobStore, ListEntry, ListPage};
