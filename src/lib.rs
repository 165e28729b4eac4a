//! rtdb-proxy: a CRUD proxy for realtime databases
//!
//! This crate forwards create, read, update and delete calls to a
//! remote store and reports every failure as a single error kind,
//! `DatabaseError`, carrying the store's original error as its cause.

pub mod core;
pub mod proxy;
pub mod server;
pub mod storage;

// Re-export the main types for convenience
pub use crate::core::path::Path;
pub use crate::core::value::Value;
pub use crate::core::store::RemoteStore;
pub use crate::core::errors::{BoxError, DatabaseError, StoreError};
pub use proxy::{CrudProxy, Operation};
pub use storage::{MemoryStore, PersistentStore, RestConfig, RestStore};
