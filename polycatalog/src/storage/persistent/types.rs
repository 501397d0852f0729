// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver types and error handling

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which key-value engine backs the catalog store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Sled - pure Rust embedded database, survives restarts
    Sled,

    /// Memory - process-local, used by tests and throwaway catalogs
    Memory,
}

impl Default for StorageType {
    fn default() -> Self {
        StorageType::Sled
    }
}

impl std::str::FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sled" => Ok(StorageType::Sled),
            "memory" => Ok(StorageType::Memory),
            _ => Err(format!(
                "Unknown storage type: {}. Valid options: sled, memory",
                s
            )),
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StorageType::Sled => "sled",
            StorageType::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

/// Failure inside a storage driver
#[derive(Error, Debug)]
pub enum StorageDriverError {
    /// File system or lock failure
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The requested backend is not compiled in
    #[error("Unsupported storage backend: {0}")]
    Unsupported(String),

    #[error("Storage driver error: {0}")]
    BackendSpecific(String),
}

pub type StorageResult<T> = Result<T, StorageDriverError>;
