// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog persistence
//!
//! This module provides:
//! - Pluggable key-value backends (Sled, in-memory)
//! - Checksummed binary framing of catalog images
//! - The catalog store that saves and loads images on commit and startup

pub mod catalog_store;
pub mod codec;
mod persistent;

pub use catalog_store::{CatalogStore, StoredHeader};
pub use codec::{decode_image, encode_image, FORMAT_VERSION, MAGIC};
pub use persistent::{
    create_storage_driver, BoxedStorageDriver, StorageDriver, StorageDriverError, StorageResult,
    StorageTree, StorageType,
};
