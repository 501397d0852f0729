// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog configuration

use crate::catalog::entity::DataModel;
use crate::catalog::error::{CatalogError, CatalogResult};
use crate::storage::StorageType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for opening a [`Catalog`](crate::Catalog)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Backend the catalog image is persisted with
    pub storage_type: StorageType,

    /// Where the backend keeps its files; no persistence when `None`
    pub storage_path: Option<PathBuf>,

    /// Whether `commit()` writes the image to the store
    pub persist_on_commit: bool,

    /// Create the default user and namespace when no image was loaded
    pub bootstrap_defaults: bool,

    /// Refuse to commit while a relational table has no primary key
    pub require_primary_keys: bool,

    pub default_user: String,

    /// Password of the default user
    pub default_password: String,

    pub default_namespace: String,

    /// Data model of the default namespace
    pub default_namespace_model: DataModel,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Sled,
            storage_path: None,
            persist_on_commit: true,
            bootstrap_defaults: true,
            require_primary_keys: false,
            default_user: "system".to_string(),
            default_password: String::new(),
            default_namespace: "public".to_string(),
            default_namespace_model: DataModel::Relational,
        }
    }
}

impl CatalogConfig {
    /// Purely in-memory catalog without any store
    pub fn in_memory() -> Self {
        Self {
            storage_type: StorageType::Memory,
            storage_path: None,
            persist_on_commit: false,
            ..Self::default()
        }
    }

    /// Catalog persisted with the given backend at `path`
    pub fn persistent<P: AsRef<Path>>(storage_type: StorageType, path: P) -> Self {
        Self {
            storage_type,
            storage_path: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Skip the default user and namespace
    pub fn without_defaults(mut self) -> Self {
        self.bootstrap_defaults = false;
        self
    }

    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> CatalogResult<()> {
        if self.bootstrap_defaults
            && (self.default_user.trim().is_empty() || self.default_namespace.trim().is_empty())
        {
            return Err(CatalogError::InvalidParameters(
                "default user and namespace names must not be empty".to_string(),
            ));
        }
        if self.persist_on_commit && self.storage_path.is_none() {
            log::warn!("persist_on_commit is set but no storage path is configured");
        }
        Ok(())
    }

    /// Whether commits go to a store
    pub fn should_persist(&self) -> bool {
        self.persist_on_commit && self.storage_path.is_some()
    }
}
