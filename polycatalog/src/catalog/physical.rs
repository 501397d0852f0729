// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Physical layer: what adapters report back about the storage objects they
//! created for allocation entities.

use super::allocation::AllocationCatalog;
use super::context::{CatalogContext, ReferenceTracker, WriteGate};
use super::entity::{AllocationEntity, LogicalColumn, LogicalNamespace, PhysicalColumn, PhysicalEntity};
use super::error::{CatalogError, CatalogResult};
use super::events::{CatalogEvent, CatalogObject, ChangeAction};
use super::id::{AdapterId, AllocationId, ColumnId, EntityId, NamespaceId};
use super::logical::relational::sorted;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Interface a storage adapter implements so the catalog can drive it.
///
/// Implementations report their own failures as [`CatalogError::Adapter`].
pub trait PhysicalAdapter: Send + Sync {
    /// Create the storage object for an allocation entity; `columns` are the
    /// logical columns in allocation order (empty for documents and graphs).
    fn create_physical(
        &self,
        namespace: &LogicalNamespace,
        allocation: &AllocationEntity,
        columns: &[LogicalColumn],
    ) -> CatalogResult<PhysicalEntity>;

    fn drop_physical(&self, allocation_id: AllocationId) -> CatalogResult<()>;

    fn add_physical_column(
        &self,
        physical: &PhysicalEntity,
        column: &LogicalColumn,
    ) -> CatalogResult<PhysicalColumn>;

    fn drop_physical_column(&self, physical: &PhysicalEntity, column_id: ColumnId)
        -> CatalogResult<()>;

    /// Re-attach to an object that already exists, e.g. after a restart
    fn restore_physical(
        &self,
        allocation: &AllocationEntity,
        saved: &PhysicalEntity,
    ) -> CatalogResult<PhysicalEntity>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalImage {
    pub entities: Vec<PhysicalEntity>,
}

/// Physical entities of one namespace, keyed by allocation id
pub struct PhysicalCatalog {
    ctx: CatalogContext,
    namespace_id: NamespaceId,
    gate: WriteGate,
    refs: Arc<ReferenceTracker>,
    allocation: AllocationCatalog,
    entities: DashMap<AllocationId, PhysicalEntity>,
}

impl PhysicalCatalog {
    pub fn from_image(
        ctx: CatalogContext,
        namespace_id: NamespaceId,
        gate: WriteGate,
        refs: Arc<ReferenceTracker>,
        allocation: AllocationCatalog,
        image: PhysicalImage,
    ) -> Self {
        for entity in &image.entities {
            refs.retain_allocation(entity.allocation_id);
        }
        Self {
            ctx,
            namespace_id,
            gate,
            refs,
            allocation,
            entities: image
                .entities
                .into_iter()
                .map(|e| (e.allocation_id, e))
                .collect(),
        }
    }

    pub fn image(&self) -> PhysicalImage {
        PhysicalImage {
            entities: sorted(&self.entities, |e| e.allocation_id),
        }
    }

    pub fn physical(&self, allocation_id: AllocationId) -> Option<PhysicalEntity> {
        self.entities.get(&allocation_id).map(|e| e.clone())
    }

    pub fn physicals_on(&self, adapter_id: AdapterId) -> Vec<PhysicalEntity> {
        let mut found: Vec<_> = self
            .entities
            .iter()
            .filter(|e| e.adapter_id == adapter_id)
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|e| e.allocation_id);
        found
    }

    pub fn physicals_for(&self, logical_id: EntityId) -> Vec<PhysicalEntity> {
        let mut found: Vec<_> = self
            .entities
            .iter()
            .filter(|e| e.logical_id == logical_id)
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|e| e.allocation_id);
        found
    }

    /// Record the entity an adapter created; the allocation must still exist
    /// and agree with what the adapter reported.
    pub fn add_physical(&self, entity: PhysicalEntity) -> CatalogResult<PhysicalEntity> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let allocation = self
            .allocation
            .provider()
            .allocation(entity.allocation_id)
            .ok_or_else(|| CatalogError::not_found("allocation", entity.allocation_id))?;
        if allocation.adapter_id() != entity.adapter_id
            || allocation.logical_id() != entity.logical_id
        {
            return Err(CatalogError::Adapter(format!(
                "adapter reported physical entity '{}' that does not match allocation {}",
                entity.name, entity.allocation_id
            )));
        }
        if self.entities.contains_key(&entity.allocation_id) {
            return Err(CatalogError::DuplicateEntry(format!(
                "allocation {} is already materialized",
                entity.allocation_id
            )));
        }

        self.entities.insert(entity.allocation_id, entity.clone());
        self.refs.retain_allocation(entity.allocation_id);
        self.emit(entity.allocation_id, ChangeAction::Added);
        Ok(entity)
    }

    /// Replace the record of an existing physical entity
    pub fn update_physical(&self, entity: PhysicalEntity) -> CatalogResult<PhysicalEntity> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        if !self.entities.contains_key(&entity.allocation_id) {
            return Err(CatalogError::not_found("physical entity", entity.allocation_id));
        }
        self.entities.insert(entity.allocation_id, entity.clone());
        self.emit(entity.allocation_id, ChangeAction::Updated);
        Ok(entity)
    }

    pub fn remove_physical(&self, allocation_id: AllocationId) -> CatalogResult<PhysicalEntity> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let (_, entity) = self
            .entities
            .remove(&allocation_id)
            .ok_or_else(|| CatalogError::not_found("physical entity", allocation_id))?;
        self.refs.release_allocation(allocation_id);
        self.emit(allocation_id, ChangeAction::Removed);
        Ok(entity)
    }

    fn emit(&self, allocation_id: AllocationId, action: ChangeAction) {
        self.ctx.emit(CatalogEvent::new(
            self.namespace_id,
            CatalogObject::Physical(allocation_id),
            action,
        ));
    }
}
