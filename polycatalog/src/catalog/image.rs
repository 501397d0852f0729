// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Full in-memory image of a catalog
//!
//! One image holds everything needed to rebuild a catalog: namespaces with their
//! logical, allocation and physical contents, the registry and the id counters.
//! It is what gets persisted on commit, kept as the rollback point and fed to
//! the snapshot builder.

use super::allocation::AllocationImage;
use super::entity::LogicalNamespace;
use super::id::IdCounters;
use super::logical::LogicalImage;
use super::physical::PhysicalImage;
use super::registry::RegistryImage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHeader {
    /// Stable identity of the catalog instance across restarts
    pub catalog_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
    /// Number of commits that produced this image
    pub generation: u64,
}

impl ImageHeader {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            catalog_id: Uuid::new_v4(),
            created_at: now,
            saved_at: now,
            generation: 0,
        }
    }
}

impl Default for ImageHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceImage {
    pub namespace: LogicalNamespace,
    pub logical: LogicalImage,
    pub allocation: AllocationImage,
    pub physical: PhysicalImage,
}

impl NamespaceImage {
    pub fn empty(namespace: LogicalNamespace) -> Self {
        Self {
            logical: LogicalImage::empty(namespace.data_model),
            namespace,
            allocation: AllocationImage::default(),
            physical: PhysicalImage::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogImage {
    pub header: ImageHeader,
    pub ids: IdCounters,
    pub registry: RegistryImage,
    /// Sorted by namespace id
    pub namespaces: Vec<NamespaceImage>,
}

impl CatalogImage {
    pub fn empty() -> Self {
        Self {
            header: ImageHeader::new(),
            ids: IdCounters::default(),
            registry: RegistryImage::default(),
            namespaces: Vec::new(),
        }
    }

    /// Contents equality, ignoring header timestamps and generation
    pub fn same_contents(&self, other: &CatalogImage) -> bool {
        self.registry == other.registry && self.namespaces == other.namespaces
    }
}
