// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog registry implementation
//!
//! This module provides the CatalogRegistry that tracks the catalog-wide
//! principals: users and the adapters (stores and sources) data can be placed on.

use super::entity::{AdapterType, CatalogAdapter, CatalogUser};
use super::error::{CatalogError, CatalogResult};
use super::id::{AdapterId, IdGenerator, UserId};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted form of the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryImage {
    pub users: Vec<CatalogUser>,
    pub adapters: Vec<CatalogAdapter>,
}

/// Central registry for users and adapters
///
/// Names are unique across the registry; the name check and the insert run under
/// one lock so two concurrent registrations cannot both succeed.
#[derive(Debug, Default)]
pub struct CatalogRegistry {
    users: DashMap<UserId, CatalogUser>,
    adapters: DashMap<AdapterId, CatalogAdapter>,
    names: Mutex<()>,
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new user
    ///
    /// # Arguments
    /// * `ids` - Generator the user id is drawn from
    /// * `name` - Unique user name
    /// * `password` - Opaque credential stored as given
    ///
    /// # Returns
    /// * `Ok(CatalogUser)` the registered user
    /// * `Err(CatalogError::NameConflict)` if a user with that name exists
    pub fn add_user(
        &self,
        ids: &IdGenerator,
        name: &str,
        password: &str,
    ) -> CatalogResult<CatalogUser> {
        let _names = self.names.lock();
        if self.user_by_name(name).is_some() {
            return Err(CatalogError::NameConflict(format!(
                "user '{}' already exists",
                name
            )));
        }
        let user = CatalogUser::new(ids.next_user_id(), name, password);
        self.users.insert(user.id, user.clone());
        log::info!("Registered user: {} ({})", name, user.id);
        Ok(user)
    }

    pub fn user(&self, id: UserId) -> Option<CatalogUser> {
        self.users.get(&id).map(|u| u.clone())
    }

    pub fn user_by_name(&self, name: &str) -> Option<CatalogUser> {
        self.users
            .iter()
            .find(|u| u.name == name)
            .map(|u| u.value().clone())
    }

    /// Register a new adapter
    ///
    /// # Arguments
    /// * `ids` - Generator the adapter id is drawn from
    /// * `unique_name` - Name the adapter is addressed by, unique in the registry
    /// * `adapter_name` - Name of the adapter implementation
    /// * `adapter_type` - Whether the adapter is a writable store or a read-only source
    /// * `settings` - Free-form adapter settings
    ///
    /// # Returns
    /// * `Ok(CatalogAdapter)` the registered adapter
    /// * `Err(CatalogError::NameConflict)` if the unique name is taken
    pub fn add_adapter(
        &self,
        ids: &IdGenerator,
        unique_name: &str,
        adapter_name: &str,
        adapter_type: AdapterType,
        settings: BTreeMap<String, String>,
    ) -> CatalogResult<CatalogAdapter> {
        let _names = self.names.lock();
        if self.adapter_by_name(unique_name).is_some() {
            return Err(CatalogError::NameConflict(format!(
                "adapter '{}' already exists",
                unique_name
            )));
        }
        let adapter = CatalogAdapter::new(
            ids.next_adapter_id(),
            unique_name,
            adapter_name,
            adapter_type,
            settings,
        );
        self.adapters.insert(adapter.id, adapter.clone());
        log::info!(
            "Registered adapter: {} ({}, {:?})",
            unique_name,
            adapter.id,
            adapter_type
        );
        Ok(adapter)
    }

    pub fn update_adapter_settings(
        &self,
        id: AdapterId,
        settings: BTreeMap<String, String>,
    ) -> CatalogResult<CatalogAdapter> {
        let mut adapter = self
            .adapters
            .get_mut(&id)
            .ok_or_else(|| CatalogError::not_found("adapter", id))?;
        *adapter = adapter.with_settings(settings);
        Ok(adapter.clone())
    }

    /// Remove an adapter; the caller has checked that nothing is placed on it
    pub fn remove_adapter(&self, id: AdapterId) -> CatalogResult<CatalogAdapter> {
        let (_, adapter) = self
            .adapters
            .remove(&id)
            .ok_or_else(|| CatalogError::not_found("adapter", id))?;
        log::info!("Removed adapter: {} ({})", adapter.unique_name, id);
        Ok(adapter)
    }

    pub fn adapter(&self, id: AdapterId) -> Option<CatalogAdapter> {
        self.adapters.get(&id).map(|a| a.clone())
    }

    pub fn adapter_by_name(&self, unique_name: &str) -> Option<CatalogAdapter> {
        self.adapters
            .iter()
            .find(|a| a.unique_name == unique_name)
            .map(|a| a.value().clone())
    }

    pub fn has_adapter(&self, id: AdapterId) -> bool {
        self.adapters.contains_key(&id)
    }

    pub fn image(&self) -> RegistryImage {
        let mut users: Vec<_> = self.users.iter().map(|u| u.value().clone()).collect();
        let mut adapters: Vec<_> = self.adapters.iter().map(|a| a.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        adapters.sort_by_key(|a| a.id);
        RegistryImage { users, adapters }
    }

    /// Replace the registry contents with a persisted image
    pub fn restore(&self, image: &RegistryImage) {
        let _names = self.names.lock();
        self.users.clear();
        self.adapters.clear();
        for user in &image.users {
            self.users.insert(user.id, user.clone());
        }
        for adapter in &image.adapters {
            self.adapters.insert(adapter.id, adapter.clone());
        }
        log::debug!(
            "Restored registry with {} users and {} adapters",
            image.users.len(),
            image.adapters.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_are_rejected() {
        let ids = IdGenerator::new();
        let registry = CatalogRegistry::new();
        registry.add_user(&ids, "tester", "").unwrap();
        assert!(matches!(
            registry.add_user(&ids, "tester", "x"),
            Err(CatalogError::NameConflict(_))
        ));

        let hsqldb = registry
            .add_adapter(&ids, "hsqldb", "HSQLDB", AdapterType::Store, BTreeMap::new())
            .unwrap();
        assert!(registry
            .add_adapter(&ids, "hsqldb", "HSQLDB", AdapterType::Store, BTreeMap::new())
            .is_err());
        assert_eq!(registry.adapter_by_name("hsqldb").map(|a| a.id), Some(hsqldb.id));
    }

    #[test]
    fn test_settings_update_and_restore() {
        let ids = IdGenerator::new();
        let registry = CatalogRegistry::new();
        let csv = registry
            .add_adapter(&ids, "csv", "CSV", AdapterType::Source, BTreeMap::new())
            .unwrap();
        let image = registry.image();

        let mut settings = BTreeMap::new();
        settings.insert("directory".to_string(), "/data".to_string());
        let updated = registry.update_adapter_settings(csv.id, settings).unwrap();
        assert_eq!(updated.settings.len(), 1);

        registry.restore(&image);
        assert!(registry.adapter(csv.id).unwrap().settings.is_empty());
        registry.remove_adapter(csv.id).unwrap();
        assert!(!registry.has_adapter(csv.id));
    }
}
