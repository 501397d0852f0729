// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver factory

use super::traits::{StorageDriver, StorageTree};
use super::types::{StorageResult, StorageType};
use std::path::Path;

pub type BoxedStorageDriver = Box<dyn StorageDriver<Tree = Box<dyn StorageTree>>>;

/// Create a storage driver based on configuration
///
/// # Arguments
/// * `storage_type` - The type of storage driver to create
/// * `path` - The filesystem path where the database should be stored; ignored by `Memory`
///
/// # Returns
/// A boxed trait object that implements StorageDriver
pub fn create_storage_driver<P: AsRef<Path>>(
    storage_type: StorageType,
    path: P,
) -> StorageResult<BoxedStorageDriver> {
    log::debug!(
        "Opening {} storage driver at {}",
        storage_type,
        path.as_ref().display()
    );
    match storage_type {
        #[cfg(feature = "sled-backend")]
        StorageType::Sled => {
            use crate::storage::persistent::sled::SledDriver;
            let driver = SledDriver::open(path)?;
            Ok(Box::new(driver) as BoxedStorageDriver)
        }
        #[cfg(not(feature = "sled-backend"))]
        StorageType::Sled => Err(super::types::StorageDriverError::Unsupported(
            "sled (crate built without the sled-backend feature)".to_string(),
        )),
        StorageType::Memory => {
            use crate::storage::persistent::memory::MemoryStorageDriver;
            let driver = MemoryStorageDriver::open(path)?;
            Ok(Box::new(driver) as BoxedStorageDriver)
        }
    }
}
