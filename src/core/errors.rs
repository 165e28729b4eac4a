//! Error types for rtdb-proxy
//!
//! `DatabaseError` is the single error kind handed to callers of the
//! CRUD proxy. `StoreError` is what the bundled stores raise; it ends up
//! as the `cause` of a `DatabaseError`.

use std::error::Error as StdError;
use thiserror::Error;
use crate::core::path::PathError;

/// Boxed error as surfaced by a remote store
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Uniform failure of a CRUD operation
#[derive(Error, Debug)]
#[error("{message}")]
pub struct DatabaseError {
    message: String,
    code: u16,
    #[source]
    cause: Option<BoxError>,
}

impl DatabaseError {
    /// Discriminator identifying this error kind
    pub const NAME: &'static str = "DatabaseError";

    /// Status code attached when none is given
    pub const DEFAULT_CODE: u16 = 500;

    /// Message used by `Default`
    pub const DEFAULT_MESSAGE: &'static str = "An error occurred while performing CRUD operations";

    /// Create an error without a cause
    pub fn new(message: impl Into<String>) -> Self {
        DatabaseError {
            message: message.into(),
            code: Self::DEFAULT_CODE,
            cause: None,
        }
    }

    /// Create an error wrapping the failure that caused it.
    ///
    /// The cause is kept as-is; downcast it to get the concrete store error back.
    pub fn with_cause(message: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        DatabaseError {
            message: message.into(),
            code: Self::DEFAULT_CODE,
            cause: Some(cause.into()),
        }
    }

    /// Override the status code
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    /// The original failure, if any
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl Default for DatabaseError {
    fn default() -> Self {
        DatabaseError::new(Self::DEFAULT_MESSAGE)
    }
}

/// Errors raised by the bundled remote stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Path error: {0}")]
    PathError(#[from] PathError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Remote store responded with status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether the request itself was at fault (bad path or payload)
    pub fn is_client_error(&self) -> bool {
        matches!(self, StoreError::PathError(_) | StoreError::InvalidData(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let error = DatabaseError::default();

        assert_eq!(error.name(), "DatabaseError");
        assert_eq!(error.message(), DatabaseError::DEFAULT_MESSAGE);
        assert_eq!(error.code(), 500);
        assert!(error.cause().is_none());
        assert!(error.source().is_none());
    }

    #[test]
    fn test_any_message_is_accepted() {
        let error = DatabaseError::new("");
        assert_eq!(error.message(), "");
        assert_eq!(error.to_string(), "");
    }

    #[test]
    fn test_cause_is_kept_untouched() {
        let cause = StoreError::Remote { status: 401, message: "Permission denied".to_string() };
        let error = DatabaseError::with_cause("Error while reading data from a/b", cause);

        assert_eq!(error.to_string(), "Error while reading data from a/b");
        assert_eq!(error.code(), 500);

        let source = error.source().expect("source is set");
        assert_eq!(source.to_string(), "Remote store responded with status 401: Permission denied");

        let store_error = error.cause().and_then(|c| c.downcast_ref::<StoreError>());
        assert!(matches!(store_error, Some(StoreError::Remote { status: 401, .. })));
    }

    #[test]
    fn test_code_override() {
        let error = DatabaseError::new("gone").with_code(404);
        assert_eq!(error.code(), 404);
    }

    #[test]
    fn test_distinguishable_by_type() {
        let wrapped: anyhow::Error = DatabaseError::with_cause("Error while deleting data from x", "boom").into();
        let plain = anyhow::anyhow!("Error while deleting data from x");

        assert!(wrapped.downcast_ref::<DatabaseError>().is_some());
        assert!(plain.downcast_ref::<DatabaseError>().is_none());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(StoreError::InvalidData("x".to_string()).is_client_error());
        assert!(StoreError::from(PathError::EmptyKey).is_client_error());
        assert!(!StoreError::Internal("x".to_string()).is_client_error());
    }
}
