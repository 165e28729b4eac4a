//! CRUD proxy over a remote store
//!
//! Every operation makes a single call to the injected store. Success
//! values come back untouched; any failure is wrapped once into a
//! `DatabaseError` whose cause is the store's own error.

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::core::errors::DatabaseError;
use crate::core::store::RemoteStore;
use crate::core::value::Value;

/// The four proxied operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    /// Message of the error reported when this operation fails at `path`
    pub fn failure_message(&self, path: &str) -> String {
        match self {
            Operation::Create => format!("Error while creating an entry at {}", path),
            Operation::Read => format!("Error while reading data from {}", path),
            Operation::Update => format!("Error while updating data at {}", path),
            Operation::Delete => format!("Error while deleting data from {}", path),
        }
    }

    fn wrap<E>(self, path: &str) -> impl FnOnce(E) -> DatabaseError + '_
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        move |error| {
            debug!("{} at {} failed: {}", self, path, error);
            DatabaseError::with_cause(self.failure_message(path), error)
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        write!(f, "{}", name)
    }
}

/// Result type for proxy operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Main API: create, read, update and delete through a remote store
pub struct CrudProxy<S> {
    store: Arc<S>,
}

impl<S> Clone for CrudProxy<S> {
    fn clone(&self) -> Self {
        CrudProxy {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RemoteStore> CrudProxy<S> {
    /// Create a proxy owning the given store
    pub fn new(store: S) -> Self {
        CrudProxy {
            store: Arc::new(store),
        }
    }

    /// Create a proxy over a store shared with other components
    pub fn from_shared(store: Arc<S>) -> Self {
        CrudProxy { store }
    }

    /// Access the underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create an entry at the given path, replacing whatever was there
    pub async fn create(&self, path: &str, data: Value) -> Result<()> {
        debug!("create at {}", path);
        self.store
            .set_value(path, data)
            .await
            .map_err(Operation::Create.wrap(path))
    }

    /// Read the data at the given path; `None` if the path holds nothing
    pub async fn read(&self, path: &str) -> Result<Option<Value>> {
        debug!("read from {}", path);
        self.store
            .read_once(path)
            .await
            .map_err(Operation::Read.wrap(path))
    }

    /// Merge the children of `new_data` into the data at the given path
    pub async fn update(&self, path: &str, new_data: Value) -> Result<()> {
        debug!("update at {}", path);
        self.store
            .merge_update(path, new_data)
            .await
            .map_err(Operation::Update.wrap(path))
    }

    /// Delete the data at the given path
    pub async fn delete(&self, path: &str) -> Result<()> {
        debug!("delete from {}", path);
        self.store
            .remove_value(path)
            .await
            .map_err(Operation::Delete.wrap(path))
    }
}
