//! Error types and result types for adapter operations.
//!
//! This module provides the error taxonomy shared by the compilers, the storage service
//! and every executor backend. Use [`AdapterResult<T>`] as the return type for fallible
//! operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur while serving a CRUD request.
///
/// Client input faults ([`AdapterError::BadRequest`], [`AdapterError::UnsupportedOperator`],
/// [`AdapterError::NotFound`]) are raised by the core. Every other variant comes from an
/// executor backend and is passed through the storage service untouched.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The request payload is missing a required field or carries an invalid one.
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// A filter node used an operator tag the compiler does not know.
    #[error("Filter of type {0} is not supported.")]
    UnsupportedOperator(String),
    /// The referenced item does not exist in the collection.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Serialization/deserialization error when converting between item formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during executor initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// Invalid adapter configuration.
    #[error("Configuration error: {0}")]
    Config(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Coarse classification of an [`AdapterError`], used by transport layers to pick a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something the adapter cannot serve.
    BadRequest,
    /// The referenced record does not exist.
    NotFound,
    /// The store or its connection failed.
    Store,
}

impl AdapterError {
    /// Shorthand for the error raised when a required payload field is absent.
    pub fn missing(field: &str) -> Self {
        AdapterError::BadRequest(format!("Missing {field} in request body"))
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::BadRequest(_) | AdapterError::UnsupportedOperator(_) => ErrorKind::BadRequest,
            AdapterError::NotFound(_) => ErrorKind::NotFound,
            AdapterError::Serialization(_)
            | AdapterError::Initialization(_)
            | AdapterError::Config(_)
            | AdapterError::Backend(_) => ErrorKind::Store,
        }
    }
}

/// A specialized `Result` type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

impl From<BsonError> for AdapterError {
    fn from(err: BsonError) -> Self {
        AdapterError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for AdapterError {
    fn from(err: SerdeJsonError) -> Self {
        AdapterError::Serialization(err.to_string())
    }
}
