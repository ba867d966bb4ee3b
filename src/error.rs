//! Error types for ChestKV
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::value::ShapeError;

/// Result type alias using ChestError
pub type Result<T> = std::result::Result<T, ChestError>;

/// Unified error type for ChestKV operations
#[derive(Debug, Error)]
pub enum ChestError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Operation Errors (returned to the caller, never fatal)
    // -------------------------------------------------------------------------
    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("member not found in set {key}")]
    MemberNotFound { key: String },

    #[error("type mismatch on key {key}: {source}")]
    TypeMismatch {
        key: String,
        #[source]
        source: ShapeError,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("store is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("invalid snapshot path {}: is a directory", .0.display())]
    InvalidPath(PathBuf),

    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("server error: {0}")]
    Remote(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChestError {
    pub(crate) fn type_mismatch(key: &str, source: ShapeError) -> Self {
        ChestError::TypeMismatch {
            key: key.to_string(),
            source,
        }
    }
}
