// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Logical catalog of a document namespace

use super::relational::sorted;
use super::{check_name, same_name, LogicalLookup};
use crate::catalog::context::{new_write_gate, CatalogContext, ReferenceTracker, WriteGate};
use crate::catalog::entity::{DataModel, EntityType, LogicalCollection, LogicalNamespace};
use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::events::{CatalogEvent, CatalogObject, ChangeAction};
use crate::catalog::id::{ColumnId, EntityId, NamespaceId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLogicalImage {
    pub collections: Vec<LogicalCollection>,
}

pub struct DocumentLogicalCatalog {
    ctx: CatalogContext,
    namespace_id: NamespaceId,
    case_sensitive: bool,
    gate: WriteGate,
    refs: Arc<ReferenceTracker>,
    collections: DashMap<EntityId, LogicalCollection>,
}

impl DocumentLogicalCatalog {
    pub fn new(
        ctx: CatalogContext,
        namespace: &LogicalNamespace,
        gate: WriteGate,
        refs: Arc<ReferenceTracker>,
    ) -> Self {
        Self::from_image(ctx, namespace, gate, refs, DocumentLogicalImage::default())
    }

    pub fn from_image(
        ctx: CatalogContext,
        namespace: &LogicalNamespace,
        gate: WriteGate,
        refs: Arc<ReferenceTracker>,
        image: DocumentLogicalImage,
    ) -> Self {
        Self {
            ctx,
            namespace_id: namespace.id,
            case_sensitive: namespace.case_sensitive,
            gate,
            refs,
            collections: image.collections.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    pub fn image(&self) -> DocumentLogicalImage {
        DocumentLogicalImage {
            collections: sorted(&self.collections, |c| c.id),
        }
    }

    pub fn copy(&self) -> Self {
        self.copy_sharing(
            self.ctx.detached(),
            new_write_gate(),
            Arc::new(self.refs.duplicate()),
        )
    }

    fn copy_sharing(
        &self,
        ctx: CatalogContext,
        gate: WriteGate,
        refs: Arc<ReferenceTracker>,
    ) -> Self {
        let namespace = LogicalNamespace {
            id: self.namespace_id,
            name: String::new(),
            data_model: DataModel::Document,
            case_sensitive: self.case_sensitive,
        };
        Self::from_image(ctx, &namespace, gate, refs, self.image())
    }

    pub fn collection(&self, id: EntityId) -> Option<LogicalCollection> {
        self.collections.get(&id).map(|c| c.clone())
    }

    pub fn collection_by_name(&self, name: &str) -> Option<LogicalCollection> {
        self.collections
            .iter()
            .find(|c| same_name(self.case_sensitive, &c.name, name))
            .map(|c| c.value().clone())
    }

    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    pub fn add_collection(
        &self,
        name: &str,
        entity_type: EntityType,
        modifiable: bool,
    ) -> CatalogResult<LogicalCollection> {
        check_name("collection", name)?;
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.ensure_name_free(name, None)?;

        let collection = LogicalCollection {
            id: self.ctx.ids().next_entity_id(),
            name: name.to_string(),
            namespace_id: self.namespace_id,
            entity_type,
            modifiable,
        };
        self.collections.insert(collection.id, collection.clone());
        self.emit(CatalogObject::Entity(collection.id), ChangeAction::Added);
        log::debug!(
            "Added collection {} ({}) to namespace {}",
            name,
            collection.id,
            self.namespace_id
        );
        Ok(collection)
    }

    pub fn rename_collection(&self, id: EntityId, name: &str) -> CatalogResult<LogicalCollection> {
        check_name("collection", name)?;
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.ensure_name_free(name, Some(id))?;
        let renamed = {
            let mut collection = self
                .collections
                .get_mut(&id)
                .ok_or_else(|| CatalogError::not_found("collection", id))?;
            collection.name = name.to_string();
            collection.clone()
        };
        self.emit(CatalogObject::Entity(id), ChangeAction::Updated);
        Ok(renamed)
    }

    pub fn delete_collection(&self, id: EntityId) -> CatalogResult<()> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let collection = self
            .collection(id)
            .ok_or_else(|| CatalogError::not_found("collection", id))?;
        let refs = self.refs.entity_refs(id);
        if refs > 0 {
            return Err(CatalogError::ConstraintViolation(format!(
                "collection '{}' is still referenced by {} allocation objects",
                collection.name, refs
            )));
        }
        self.collections.remove(&id);
        self.emit(CatalogObject::Entity(id), ChangeAction::Removed);
        Ok(())
    }

    fn ensure_name_free(&self, name: &str, except: Option<EntityId>) -> CatalogResult<()> {
        let taken = self
            .collections
            .iter()
            .any(|c| Some(c.id) != except && same_name(self.case_sensitive, &c.name, name));
        if taken {
            return Err(CatalogError::NameConflict(format!(
                "collection '{}' already exists in namespace {}",
                name, self.namespace_id
            )));
        }
        Ok(())
    }

    fn emit(&self, object: CatalogObject, action: ChangeAction) {
        self.ctx
            .emit(CatalogEvent::new(self.namespace_id, object, action));
    }
}

impl LogicalLookup for DocumentLogicalCatalog {
    fn namespace_id(&self) -> NamespaceId {
        self.namespace_id
    }

    fn data_model(&self) -> DataModel {
        DataModel::Document
    }

    fn has_entity(&self, id: EntityId) -> bool {
        self.collections.contains_key(&id)
    }

    fn column_table(&self, _column_id: ColumnId) -> Option<EntityId> {
        None
    }

    fn copy_lookup(
        &self,
        ctx: CatalogContext,
        gate: WriteGate,
        refs: Arc<ReferenceTracker>,
    ) -> Arc<dyn LogicalLookup> {
        Arc::new(self.copy_sharing(ctx, gate, refs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::id::IdGenerator;
    use crate::catalog::registry::CatalogRegistry;

    fn catalog() -> DocumentLogicalCatalog {
        let (tx, _rx) = std::sync::mpsc::channel();
        let ctx = CatalogContext::new(
            Arc::new(IdGenerator::new()),
            tx,
            Arc::new(CatalogRegistry::new()),
        );
        let namespace = LogicalNamespace {
            id: 3,
            name: "docs".to_string(),
            data_model: DataModel::Document,
            case_sensitive: true,
        };
        DocumentLogicalCatalog::new(ctx, &namespace, new_write_gate(), Arc::new(ReferenceTracker::new()))
    }

    #[test]
    fn test_collection_lifecycle() {
        let catalog = catalog();
        let users = catalog
            .add_collection("users", EntityType::Entity, true)
            .unwrap();
        // case sensitive namespace
        catalog
            .add_collection("Users", EntityType::Entity, true)
            .unwrap();
        assert!(catalog
            .add_collection("users", EntityType::Entity, true)
            .is_err());

        catalog.rename_collection(users.id, "people").unwrap();
        assert!(catalog.collection_by_name("people").is_some());

        catalog.refs.retain_entity(users.id);
        assert!(matches!(
            catalog.delete_collection(users.id),
            Err(CatalogError::ConstraintViolation(_))
        ));
        catalog.refs.release_entity(users.id);
        catalog.delete_collection(users.id).unwrap();
        assert_eq!(catalog.collection_count(), 1);
    }
}
