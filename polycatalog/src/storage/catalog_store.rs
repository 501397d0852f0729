// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog store
//!
//! Keeps the encoded catalog image in the `catalog` tree of a storage driver.
//! The image blob and a small JSON header describing it are written in one
//! batch so a reader never sees one without the other.

use super::codec::{decode_image, encode_image, FORMAT_VERSION};
use super::persistent::{create_storage_driver, BoxedStorageDriver, StorageTree, StorageType};
use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::image::{CatalogImage, ImageHeader};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

const CATALOG_TREE: &str = "catalog";
const IMAGE_KEY: &[u8] = b"catalog_image_current";
const HEADER_KEY: &[u8] = b"catalog_image_header";

/// Human-readable summary stored next to the image blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredHeader {
    pub format_version: u16,
    pub header: ImageHeader,
    pub namespace_count: usize,
    pub blob_len: usize,
}

pub struct CatalogStore {
    driver: BoxedStorageDriver,
    tree: Box<dyn StorageTree>,
}

impl CatalogStore {
    /// Open (or create) a store of the given backend type at `path`
    pub fn open<P: AsRef<Path>>(storage_type: StorageType, path: P) -> CatalogResult<Self> {
        let driver = create_storage_driver(storage_type, path.as_ref())?;
        let tree = driver.open_tree(CATALOG_TREE)?;
        info!(
            "Opened {} catalog store at {}",
            storage_type,
            path.as_ref().display()
        );
        Ok(Self { driver, tree })
    }

    pub fn storage_type(&self) -> StorageType {
        self.driver.storage_type()
    }

    /// Persist a full image, replacing whatever was stored before
    pub fn save(&self, image: &CatalogImage) -> CatalogResult<()> {
        let blob = encode_image(image)?;
        let header = StoredHeader {
            format_version: FORMAT_VERSION,
            header: image.header.clone(),
            namespace_count: image.namespaces.len(),
            blob_len: blob.len(),
        };
        let header_json = serde_json::to_vec(&header)?;

        self.tree
            .batch_insert(&[(IMAGE_KEY, blob.as_slice()), (HEADER_KEY, header_json.as_slice())])?;
        self.driver.flush()?;
        debug!(
            "Saved catalog image generation {} ({} bytes)",
            image.header.generation,
            blob.len()
        );
        Ok(())
    }

    /// Load the stored image, `None` if nothing was ever saved
    pub fn load(&self) -> CatalogResult<Option<CatalogImage>> {
        match self.tree.get(IMAGE_KEY)? {
            Some(blob) => {
                let image = decode_image(&blob)?;
                debug!(
                    "Loaded catalog image generation {} with {} namespaces",
                    image.header.generation,
                    image.namespaces.len()
                );
                Ok(Some(image))
            }
            None => Ok(None),
        }
    }

    /// Header of the stored image without decoding the blob
    pub fn stored_header(&self) -> CatalogResult<Option<StoredHeader>> {
        match self.tree.get(HEADER_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn has_image(&self) -> CatalogResult<bool> {
        Ok(self.tree.contains_key(IMAGE_KEY)?)
    }

    /// Overwrite the stored blob as-is. Used to inject damaged images in tests.
    #[doc(hidden)]
    pub fn write_raw(&self, blob: &[u8]) -> CatalogResult<()> {
        self.tree.insert(IMAGE_KEY, blob)?;
        self.driver.flush()?;
        Ok(())
    }

    pub fn flush(&self) -> CatalogResult<()> {
        self.tree.flush()?;
        self.driver.flush().map_err(CatalogError::from)
    }
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogStore")
            .field("storage_type", &self.driver.storage_type())
            .finish()
    }
}
