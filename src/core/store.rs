use async_trait::async_trait;

use crate::core::value::Value;

/// Trait defining the capability of a remote realtime database.
///
/// Paths are passed exactly as the caller wrote them; interpreting and
/// rejecting them is up to the implementation.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Error raised by every operation of this store
    type Error: std::error::Error + Send + Sync + 'static;

    /// Replace the value at the given path
    async fn set_value(&self, path: &str, data: Value) -> Result<(), Self::Error>;

    /// Read the value at the given path once; `None` if nothing is stored there
    async fn read_once(&self, path: &str) -> Result<Option<Value>, Self::Error>;

    /// Merge the children of `partial` into the value at the given path
    async fn merge_update(&self, path: &str, partial: Value) -> Result<(), Self::Error>;

    /// Remove the value at the given path
    async fn remove_value(&self, path: &str) -> Result<(), Self::Error>;
}
