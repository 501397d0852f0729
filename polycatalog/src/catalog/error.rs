// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the catalog

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A mutation referenced an id or name that does not exist.
    ///
    /// Read paths never produce this; snapshot lookups return `Option`.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Name conflict: {0}")]
    NameConflict(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Referential error: {0}")]
    ReferentialError(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Namespace {namespace_id} is not a {expected} namespace")]
    NamespaceTypeMismatch { namespace_id: u64, expected: String },

    #[error("Catalog is closed")]
    CatalogClosed,

    #[error("Catalog is not initialized")]
    NotInitialized,

    /// The handle outlived its namespace catalogs, e.g. across a rollback
    #[error("Stale catalog handle; obtain a new one from the catalog")]
    StaleHandle,

    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Corrupt catalog image: {0}")]
    CorruptImage(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl CatalogError {
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        CatalogError::NotFound(format!("{} {}", kind, id))
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for CatalogError {
    fn from(err: bincode::Error) -> Self {
        CatalogError::SerializationError(err.to_string())
    }
}

impl From<crate::storage::StorageDriverError> for CatalogError {
    fn from(err: crate::storage::StorageDriverError) -> Self {
        CatalogError::StorageError(err.to_string())
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
