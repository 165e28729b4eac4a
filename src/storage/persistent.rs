// src/storage/persistent.rs

//! Persistent store on sled
//!
//! Every leaf lives under its full path ("users/alice/name"), encoded
//! with bincode. Reading a path that holds an object rebuilds it from a
//! prefix scan. Writes are staged into one sled batch so a set or an
//! update lands atomically.

use std::path::PathBuf;

use async_trait::async_trait;
use bincode::{serialize, deserialize};
use log::debug;
use sled::{Batch, Db};
use tokio::sync::Mutex;

use crate::core::errors::StoreError;
use crate::core::path::Path;
use crate::core::store::RemoteStore;
use crate::core::tree;
use crate::core::value::Value;

/// A persistent store for the database using sled
pub struct PersistentStore {
    /// The underlying sled database
    db: Db,
    /// Serializes writers so staged batches never interleave
    write_lock: Mutex<()>,
}

impl PersistentStore {
    /// Open a persistent store at the given path
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path.into())?;
        Ok(Self::from_db(db))
    }

    /// Open a store that is deleted when dropped
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self::from_db(db))
    }

    fn from_db(db: Db) -> Self {
        PersistentStore {
            db,
            write_lock: Mutex::new(()),
        }
    }

    /// Number of leaves stored
    pub fn leaf_count(&self) -> usize {
        self.db.len()
    }

    /// Key prefix shared by every leaf strictly below `path`
    fn child_prefix(path: &Path) -> String {
        if path.is_root() {
            String::new()
        } else {
            format!("{}/", path.storage_key())
        }
    }

    /// Queue the writes replacing the value at `path` with `value`
    fn stage_write(&self, batch: &mut Batch, path: &Path, value: Option<&Value>) -> Result<(), StoreError> {
        // Leaves above the target would shadow the new subtree
        for depth in 0..path.len() {
            batch.remove(path.segments()[..depth].join("/").as_bytes());
        }

        batch.remove(path.storage_key().as_bytes());
        for item in self.db.scan_prefix(Self::child_prefix(path).as_bytes()) {
            let (key, _) = item?;
            batch.remove(key);
        }

        if let Some(value) = value {
            let mut leaves = Vec::new();
            tree::flatten(path, value, &mut leaves)?;

            for (leaf_path, leaf) in leaves {
                batch.insert(leaf_path.storage_key().as_bytes(), serialize(&leaf)?);
            }
        }

        Ok(())
    }

    async fn commit(&self, batch: Batch) -> Result<(), StoreError> {
        self.db.apply_batch(batch)?;
        self.db.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for PersistentStore {
    type Error = StoreError;

    async fn set_value(&self, path: &str, data: Value) -> Result<(), StoreError> {
        let path: Path = path.parse()?;
        let value = tree::normalize(data, &path)?;

        debug!("PersistentStore: setting value at {}", path);
        let _guard = self.write_lock.lock().await;
        let mut batch = Batch::default();
        self.stage_write(&mut batch, &path, value.as_ref())?;
        self.commit(batch).await
    }

    async fn read_once(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let path: Path = path.parse()?;

        if let Some(bytes) = self.db.get(path.storage_key().as_bytes())? {
            return Ok(Some(deserialize(&bytes)?));
        }

        let prefix = Self::child_prefix(&path);
        let mut node = None;

        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (key_bytes, value_bytes) = item?;
            let key = std::str::from_utf8(&key_bytes)
                .map_err(|e| StoreError::Internal(format!("Invalid key in database: {}", e)))?;

            let relative: Path = key[prefix.len()..].parse()?;
            let leaf: Value = deserialize(&value_bytes)?;
            tree::set_at(&mut node, relative.segments(), Some(leaf));
        }

        Ok(node.map(tree::denormalize))
    }

    async fn merge_update(&self, path: &str, partial: Value) -> Result<(), StoreError> {
        let path: Path = path.parse()?;
        let writes = tree::prepare_update(&path, partial)?;

        debug!("PersistentStore: updating {} children at {}", writes.len(), path);
        let _guard = self.write_lock.lock().await;
        let mut batch = Batch::default();
        // Targets never overlap, so staging them against the same snapshot is safe
        for (target, value) in &writes {
            self.stage_write(&mut batch, target, value.as_ref())?;
        }
        self.commit(batch).await
    }

    async fn remove_value(&self, path: &str) -> Result<(), StoreError> {
        let path: Path = path.parse()?;

        debug!("PersistentStore: removing value at {}", path);
        let _guard = self.write_lock.lock().await;
        let mut batch = Batch::default();
        self.stage_write(&mut batch, &path, None)?;
        self.commit(batch).await
    }
}
