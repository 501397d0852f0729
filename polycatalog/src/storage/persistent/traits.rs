// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver traits
//!
//! The catalog store only keeps a couple of opaque blobs per named tree, so
//! the driver surface is limited to point reads and writes.

use super::types::{StorageResult, StorageType};
use std::path::Path;

/// A named collection of key-value pairs within a storage driver
pub trait StorageTree: Send + Sync {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    fn contains_key(&self, key: &[u8]) -> StorageResult<bool>;

    /// Insert several pairs; either all land or none do
    fn batch_insert(&self, entries: &[(&[u8], &[u8])]) -> StorageResult<()>;

    fn flush(&self) -> StorageResult<()>;
}

pub trait StorageDriver: Send + Sync {
    type Tree: StorageTree;

    /// Open or create a storage driver at the given path
    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self>
    where
        Self: Sized;

    /// Open or create a named tree
    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree>;

    /// Flush all pending writes to disk
    fn flush(&self) -> StorageResult<()>;

    fn storage_type(&self) -> StorageType;
}

impl StorageTree for Box<dyn StorageTree> {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        (**self).insert(key, value)
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn contains_key(&self, key: &[u8]) -> StorageResult<bool> {
        (**self).contains_key(key)
    }

    fn batch_insert(&self, entries: &[(&[u8], &[u8])]) -> StorageResult<()> {
        (**self).batch_insert(entries)
    }

    fn flush(&self) -> StorageResult<()> {
        (**self).flush()
    }
}
