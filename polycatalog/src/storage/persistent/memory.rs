// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory storage driver

use super::traits::{StorageDriver, StorageTree};
use super::types::{StorageResult, StorageType};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

type TreeData = Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>;

/// In-memory storage driver; every handle to the same tree shares its data
#[derive(Default)]
pub struct MemoryStorageDriver {
    trees: Arc<RwLock<HashMap<String, TreeData>>>,
}

pub struct MemoryTree {
    data: TreeData,
}

impl MemoryStorageDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageTree for MemoryTree {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn contains_key(&self, key: &[u8]) -> StorageResult<bool> {
        Ok(self.data.read().contains_key(key))
    }

    fn batch_insert(&self, entries: &[(&[u8], &[u8])]) -> StorageResult<()> {
        let mut data = self.data.write();
        for (key, value) in entries {
            data.insert(key.to_vec(), value.to_vec());
        }
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl StorageDriver for MemoryStorageDriver {
    type Tree = Box<dyn StorageTree>;

    fn open<P: AsRef<Path>>(_path: P) -> StorageResult<Self> {
        Ok(Self::new())
    }

    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree> {
        let data = self
            .trees
            .write()
            .entry(name.to_string())
            .or_default()
            .clone();
        Ok(Box::new(MemoryTree { data }) as Box<dyn StorageTree>)
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_handles_share_data() {
        let driver = MemoryStorageDriver::new();
        let a = driver.open_tree("catalog").unwrap();
        let b = driver.open_tree("catalog").unwrap();
        a.insert(b"image", b"blob").unwrap();
        assert_eq!(b.get(b"image").unwrap(), Some(b"blob".to_vec()));
        assert!(b.contains_key(b"image").unwrap());
    }

    #[test]
    fn test_each_driver_starts_empty() {
        let first = MemoryStorageDriver::open("/ignored").unwrap();
        first.open_tree("catalog").unwrap().insert(b"k", b"v").unwrap();
        let second = MemoryStorageDriver::open("/ignored").unwrap();
        assert_eq!(second.open_tree("catalog").unwrap().get(b"k").unwrap(), None);
    }
}
