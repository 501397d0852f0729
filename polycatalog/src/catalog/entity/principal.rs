// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Users and adapters registered with the catalog

use crate::catalog::id::{AdapterId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogUser {
    pub id: UserId,
    pub name: String,
    pub password: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl CatalogUser {
    pub fn new(id: UserId, name: &str, password: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            password: password.to_string(),
            created_at: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdapterType {
    /// Writable store
    Store,
    /// Read-only data source
    Source,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogAdapter {
    pub id: AdapterId,
    pub unique_name: String,
    pub adapter_name: String,
    pub adapter_type: AdapterType,
    pub settings: BTreeMap<String, String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub modified_at: chrono::DateTime<chrono::Utc>,
}

impl CatalogAdapter {
    pub fn new(
        id: AdapterId,
        unique_name: &str,
        adapter_name: &str,
        adapter_type: AdapterType,
        settings: BTreeMap<String, String>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id,
            unique_name: unique_name.to_string(),
            adapter_name: adapter_name.to_string(),
            adapter_type,
            settings,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_settings(&self, settings: BTreeMap<String, String>) -> Self {
        Self {
            settings,
            modified_at: chrono::Utc::now(),
            ..self.clone()
        }
    }
}
