//! In-memory store for rtdb-proxy
//!
//! This module provides a simple in-memory implementation
//! of the remote store, holding the whole tree behind a lock.

use async_trait::async_trait;
use log::debug;
use tokio::sync::RwLock;

use crate::core::errors::StoreError;
use crate::core::path::Path;
use crate::core::store::RemoteStore;
use crate::core::tree;
use crate::core::value::Value;

/// An in-memory realtime database
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Root of the tree, `None` when the database is empty
    root: RwLock<Option<Value>>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        MemoryStore {
            root: RwLock::new(None),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    type Error = StoreError;

    async fn set_value(&self, path: &str, data: Value) -> Result<(), StoreError> {
        let path: Path = path.parse()?;
        let value = tree::normalize(data, &path)?;

        debug!("MemoryStore: setting value at {}", path);
        let mut root = self.root.write().await;
        tree::set_at(&mut root, path.segments(), value);

        Ok(())
    }

    async fn read_once(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let path: Path = path.parse()?;

        let root = self.root.read().await;
        let value = tree::get((*root).as_ref(), path.segments())
            .cloned()
            .map(tree::denormalize);

        Ok(value)
    }

    async fn merge_update(&self, path: &str, partial: Value) -> Result<(), StoreError> {
        let path: Path = path.parse()?;
        let writes = tree::prepare_update(&path, partial)?;

        debug!("MemoryStore: updating {} children at {}", writes.len(), path);
        let mut root = self.root.write().await;
        for (target, value) in writes {
            tree::set_at(&mut root, target.segments(), value);
        }

        Ok(())
    }

    async fn remove_value(&self, path: &str) -> Result<(), StoreError> {
        let path: Path = path.parse()?;

        debug!("MemoryStore: removing value at {}", path);
        let mut root = self.root.write().await;
        tree::set_at(&mut root, path.segments(), None);

        Ok(())
    }
}
