//! Error types for R-tree operations.

use std::io;
use thiserror::Error;

/// Coarse classification of an [`RTreeError`], useful for matching without
/// destructuring the error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Dimensionality, capacity or page size outside the supported range
    Configuration,
    /// Delete target absent, or a node reference that no longer resolves
    NotFound,
    /// Read or write failure on the backing page file
    StorageIo,
    /// A child reference failed validation before being dereferenced
    InvalidReference,
    /// A page or header could not be encoded or decoded
    Serialization,
    /// The request is not valid for the current tree state
    InvalidOperation,
}

/// Errors that can occur in R-tree operations
#[derive(Debug, Error)]
pub enum RTreeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    StorageIo(#[from] io::Error),

    #[error("Invalid child reference: {0}")]
    InvalidReference(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl RTreeError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RTreeError::Configuration(_) => ErrorKind::Configuration,
            RTreeError::NotFound(_) => ErrorKind::NotFound,
            RTreeError::StorageIo(_) => ErrorKind::StorageIo,
            RTreeError::InvalidReference(_) => ErrorKind::InvalidReference,
            RTreeError::Serialization(_) => ErrorKind::Serialization,
            RTreeError::InvalidOperation(_) => ErrorKind::InvalidOperation,
        }
    }

    /// Builds a `StorageIo` error for page data that does not decode to a
    /// well-formed node.
    pub(crate) fn corrupted(message: impl Into<String>) -> Self {
        RTreeError::StorageIo(io::Error::new(io::ErrorKind::InvalidData, message.into()))
    }
}

impl From<bincode::error::EncodeError> for RTreeError {
    fn from(err: bincode::error::EncodeError) -> Self {
        RTreeError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for RTreeError {
    fn from(err: bincode::error::DecodeError) -> Self {
        RTreeError::Serialization(err.to_string())
    }
}

/// Result type for R-tree operations
pub type RTreeResult<T> = Result<T, RTreeError>;
