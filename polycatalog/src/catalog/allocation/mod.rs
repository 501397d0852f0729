// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Allocation catalogs
//!
//! The allocation layer maps logical entities onto adapters: placements bind an
//! entity to an adapter, partitions slice it, and one allocation entity exists
//! per (placement, partition) pair. Every specialisation shares
//! [`AllocationCore`] and exposes it through [`AllocationProvider`]; the
//! relational one adds allocation columns on top.

pub mod document;
pub mod graph;
pub mod relational;

pub use document::DocumentAllocationCatalog;
pub use graph::GraphAllocationCatalog;
pub use relational::RelationalAllocationCatalog;

use super::context::{CatalogContext, ReferenceTracker, WriteGate};
use super::entity::{
    AllocationColumn, AllocationEntity, AllocationHeader, AllocationPartition,
    AllocationPartitionGroup, AllocationPlacement, DataModel, DataPlacementRole, PartitionType,
    PlacementType,
};
use super::error::{CatalogError, CatalogResult};
use super::events::{CatalogEvent, CatalogObject, ChangeAction};
use super::id::{
    AdapterId, AllocationId, ColumnId, EntityId, NamespaceId, PartitionGroupId, PartitionId,
    PlacementId,
};
use super::logical::relational::{ids_where, sorted};
use super::logical::LogicalLookup;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Persisted form of an allocation catalog, every list sorted by id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationImage {
    pub placements: Vec<AllocationPlacement>,
    pub partition_groups: Vec<AllocationPartitionGroup>,
    pub partitions: Vec<AllocationPartition>,
    pub allocations: Vec<AllocationEntity>,
    /// Only relational namespaces place columns
    pub columns: Vec<AllocationColumn>,
}

/// Arguments of [`AllocationProvider::add_partition_group`]
#[derive(Debug, Clone)]
pub struct PartitionGroupSpec {
    pub logical_id: EntityId,
    pub name: String,
    pub partition_type: PartitionType,
    pub partition_count: u32,
    pub qualifiers: Vec<String>,
    pub unbound: bool,
}

/// Arguments of [`AllocationProvider::add_partition`]
#[derive(Debug, Clone)]
pub struct PartitionSpec {
    pub logical_id: EntityId,
    pub group_id: Option<PartitionGroupId>,
    pub name: Option<String>,
    pub unbound: bool,
    pub placement_type: PlacementType,
    pub role: DataPlacementRole,
    pub qualifiers: Vec<String>,
    pub partition_type: PartitionType,
}

impl PartitionSpec {
    /// The single partition of an unpartitioned entity
    pub fn unpartitioned(logical_id: EntityId) -> Self {
        Self {
            logical_id,
            group_id: None,
            name: None,
            unbound: true,
            placement_type: PlacementType::Automatic,
            role: DataPlacementRole::UpToDate,
            qualifiers: Vec::new(),
            partition_type: PartitionType::None,
        }
    }
}

/// Maps and validation shared by every allocation catalog specialisation
pub struct AllocationCore {
    ctx: CatalogContext,
    namespace_id: NamespaceId,
    data_model: DataModel,
    gate: WriteGate,
    refs: Arc<ReferenceTracker>,
    logical: Arc<dyn LogicalLookup>,
    placements: DashMap<PlacementId, AllocationPlacement>,
    partition_groups: DashMap<PartitionGroupId, AllocationPartitionGroup>,
    partitions: DashMap<PartitionId, AllocationPartition>,
    allocations: DashMap<AllocationId, AllocationEntity>,
    columns: DashMap<(PlacementId, ColumnId), AllocationColumn>,
}

impl AllocationCore {
    /// Build from an image, re-registering every reference with `refs`
    pub(crate) fn from_image(
        ctx: CatalogContext,
        gate: WriteGate,
        refs: Arc<ReferenceTracker>,
        logical: Arc<dyn LogicalLookup>,
        image: AllocationImage,
    ) -> Self {
        for p in &image.placements {
            refs.retain_entity(p.logical_id);
        }
        for g in &image.partition_groups {
            refs.retain_entity(g.logical_id);
        }
        for p in &image.partitions {
            refs.retain_entity(p.logical_id);
        }
        for a in &image.allocations {
            refs.retain_entity(a.logical_id());
        }
        for c in &image.columns {
            refs.retain_entity(c.logical_table_id);
            refs.retain_column(c.column_id);
        }

        Self {
            namespace_id: logical.namespace_id(),
            data_model: logical.data_model(),
            ctx,
            gate,
            refs,
            logical,
            placements: image.placements.into_iter().map(|p| (p.id, p)).collect(),
            partition_groups: image
                .partition_groups
                .into_iter()
                .map(|g| (g.id, g))
                .collect(),
            partitions: image.partitions.into_iter().map(|p| (p.id, p)).collect(),
            allocations: image.allocations.into_iter().map(|a| (a.id(), a)).collect(),
            columns: image.columns.into_iter().map(|c| (c.key(), c)).collect(),
        }
    }

    pub fn image(&self) -> AllocationImage {
        let mut columns: Vec<_> = self.columns.iter().map(|c| c.value().clone()).collect();
        columns.sort_by_key(|c| c.key());
        AllocationImage {
            placements: sorted(&self.placements, |p| p.id),
            partition_groups: sorted(&self.partition_groups, |g| g.id),
            partitions: sorted(&self.partitions, |p| p.id),
            allocations: sorted(&self.allocations, |a| a.id()),
            columns,
        }
    }

    /// Deep copy detached from the change channel. The logical layer is copied
    /// along with it onto the copy's own gate and reference counts, so the copy
    /// neither sees later logical changes nor pins anything in the original.
    pub(crate) fn copy(&self) -> Self {
        let ctx = self.ctx.detached();
        let gate = super::context::new_write_gate();
        let refs = Arc::new(ReferenceTracker::new());
        let _original = self.gate.lock();
        let logical = self.logical.copy_lookup(ctx.clone(), gate.clone(), refs.clone());
        Self::from_image(ctx, gate, refs, logical, self.image())
    }

    pub fn namespace_id(&self) -> NamespaceId {
        self.namespace_id
    }

    pub fn data_model(&self) -> DataModel {
        self.data_model
    }

    pub(crate) fn ctx(&self) -> &CatalogContext {
        &self.ctx
    }

    pub(crate) fn gate(&self) -> &WriteGate {
        &self.gate
    }

    pub(crate) fn refs(&self) -> &ReferenceTracker {
        &self.refs
    }

    pub(crate) fn logical(&self) -> &dyn LogicalLookup {
        self.logical.as_ref()
    }

    pub(crate) fn columns_map(&self) -> &DashMap<(PlacementId, ColumnId), AllocationColumn> {
        &self.columns
    }

    pub(crate) fn emit(&self, object: CatalogObject, action: ChangeAction) {
        self.ctx
            .emit(CatalogEvent::new(self.namespace_id, object, action));
    }

    fn require_logical(&self, logical_id: EntityId) -> CatalogResult<()> {
        if !self.logical.has_entity(logical_id) {
            return Err(CatalogError::NotFound(format!(
                "logical entity {} in namespace {}",
                logical_id, self.namespace_id
            )));
        }
        Ok(())
    }

    pub(crate) fn require_placement(&self, id: PlacementId) -> CatalogResult<AllocationPlacement> {
        self.placements
            .get(&id)
            .map(|p| p.clone())
            .ok_or_else(|| CatalogError::not_found("placement", id))
    }

    fn add_placement(
        &self,
        logical_id: EntityId,
        adapter_id: AdapterId,
    ) -> CatalogResult<AllocationPlacement> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_logical(logical_id)?;
        if !self.ctx.registry().has_adapter(adapter_id) {
            return Err(CatalogError::not_found("adapter", adapter_id));
        }
        if self
            .placements
            .iter()
            .any(|p| p.logical_id == logical_id && p.adapter_id == adapter_id)
        {
            return Err(CatalogError::DuplicateEntry(format!(
                "entity {} is already placed on adapter {}",
                logical_id, adapter_id
            )));
        }

        let placement = AllocationPlacement {
            id: self.ctx.ids().next_placement_id(),
            logical_id,
            namespace_id: self.namespace_id,
            adapter_id,
        };
        self.placements.insert(placement.id, placement.clone());
        self.refs.retain_entity(logical_id);
        self.emit(CatalogObject::Placement(placement.id), ChangeAction::Added);
        log::debug!(
            "Placed entity {} on adapter {} as placement {}",
            logical_id,
            adapter_id,
            placement.id
        );
        Ok(placement)
    }

    fn add_partition_group(
        &self,
        spec: PartitionGroupSpec,
    ) -> CatalogResult<AllocationPartitionGroup> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_logical(spec.logical_id)?;

        let group = AllocationPartitionGroup {
            id: self.ctx.ids().next_partition_group_id(),
            logical_id: spec.logical_id,
            namespace_id: self.namespace_id,
            name: spec.name,
            partition_type: spec.partition_type,
            partition_count: spec.partition_count,
            qualifiers: spec.qualifiers,
            unbound: spec.unbound,
        };
        self.partition_groups.insert(group.id, group.clone());
        self.refs.retain_entity(group.logical_id);
        self.emit(CatalogObject::PartitionGroup(group.id), ChangeAction::Added);
        Ok(group)
    }

    fn add_partition(&self, spec: PartitionSpec) -> CatalogResult<AllocationPartition> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_logical(spec.logical_id)?;
        if let Some(group_id) = spec.group_id {
            let group = self
                .partition_groups
                .get(&group_id)
                .map(|g| g.clone())
                .ok_or_else(|| CatalogError::not_found("partition group", group_id))?;
            if group.logical_id != spec.logical_id {
                return Err(CatalogError::ReferentialError(format!(
                    "partition group {} belongs to entity {}, not {}",
                    group_id, group.logical_id, spec.logical_id
                )));
            }
        }

        let partition = AllocationPartition {
            id: self.ctx.ids().next_partition_id(),
            logical_id: spec.logical_id,
            namespace_id: self.namespace_id,
            group_id: spec.group_id,
            name: spec.name,
            unbound: spec.unbound,
            placement_type: spec.placement_type,
            role: spec.role,
            qualifiers: spec.qualifiers,
            partition_type: spec.partition_type,
        };
        self.partitions.insert(partition.id, partition.clone());
        self.refs.retain_entity(partition.logical_id);
        self.emit(CatalogObject::Partition(partition.id), ChangeAction::Added);
        Ok(partition)
    }

    fn add_allocation(
        &self,
        adapter_id: AdapterId,
        placement_id: PlacementId,
        partition_id: PartitionId,
        logical_id: EntityId,
    ) -> CatalogResult<AllocationEntity> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_logical(logical_id)?;
        let placement = self.require_placement(placement_id)?;
        if placement.logical_id != logical_id || placement.adapter_id != adapter_id {
            return Err(CatalogError::ReferentialError(format!(
                "placement {} binds entity {} to adapter {}, not entity {} to adapter {}",
                placement_id, placement.logical_id, placement.adapter_id, logical_id, adapter_id
            )));
        }
        let partition = self
            .partitions
            .get(&partition_id)
            .map(|p| p.clone())
            .ok_or_else(|| CatalogError::not_found("partition", partition_id))?;
        if partition.logical_id != logical_id {
            return Err(CatalogError::ReferentialError(format!(
                "partition {} belongs to entity {}, not {}",
                partition_id, partition.logical_id, logical_id
            )));
        }
        if let Some(existing) = self
            .allocations
            .iter()
            .find(|a| a.placement_id() == placement_id && a.partition_id() == partition_id)
        {
            return Err(CatalogError::DuplicateEntry(format!(
                "placement {} and partition {} already form allocation {}",
                placement_id,
                partition_id,
                existing.id()
            )));
        }

        let allocation = AllocationEntity::new(
            self.data_model,
            AllocationHeader {
                id: self.ctx.ids().next_allocation_id(),
                placement_id,
                partition_id,
                logical_id,
                namespace_id: self.namespace_id,
                adapter_id,
            },
        );
        self.allocations.insert(allocation.id(), allocation.clone());
        self.refs.retain_entity(logical_id);
        self.emit(CatalogObject::Allocation(allocation.id()), ChangeAction::Added);
        log::debug!(
            "Added allocation {} for entity {} on adapter {}",
            allocation.id(),
            logical_id,
            adapter_id
        );
        Ok(allocation)
    }

    fn ensure_not_materialized(&self, allocation_id: AllocationId) -> CatalogResult<()> {
        if self.refs.allocation_refs(allocation_id) > 0 {
            return Err(CatalogError::ConstraintViolation(format!(
                "allocation {} still has a physical entity",
                allocation_id
            )));
        }
        Ok(())
    }

    fn delete_allocation(&self, allocation_id: AllocationId) -> CatalogResult<()> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        if !self.allocations.contains_key(&allocation_id) {
            return Err(CatalogError::not_found("allocation", allocation_id));
        }
        self.ensure_not_materialized(allocation_id)?;
        if let Some((_, allocation)) = self.allocations.remove(&allocation_id) {
            self.refs.release_entity(allocation.logical_id());
        }
        self.emit(CatalogObject::Allocation(allocation_id), ChangeAction::Removed);
        Ok(())
    }

    /// Remove a placement together with its allocations and allocation columns
    fn delete_placement(&self, placement_id: PlacementId) -> CatalogResult<()> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let placement = self.require_placement(placement_id)?;
        let allocations = ids_where(&self.allocations, |a| a.placement_id() == placement_id);
        for id in &allocations {
            self.ensure_not_materialized(*id)?;
        }

        let mut events = Vec::new();
        for id in allocations {
            if let Some((_, allocation)) = self.allocations.remove(&id) {
                self.refs.release_entity(allocation.logical_id());
                events.push(CatalogObject::Allocation(id));
            }
        }
        for key in ids_where(&self.columns, |c| c.placement_id == placement_id) {
            if let Some((_, column)) = self.columns.remove(&key) {
                self.refs.release_entity(column.logical_table_id);
                self.refs.release_column(column.column_id);
                events.push(CatalogObject::AllocationColumn {
                    placement_id,
                    column_id: column.column_id,
                });
            }
        }
        self.placements.remove(&placement_id);
        self.refs.release_entity(placement.logical_id);
        events.push(CatalogObject::Placement(placement_id));

        for object in events {
            self.emit(object, ChangeAction::Removed);
        }
        log::debug!(
            "Deleted placement {} of entity {} on adapter {}",
            placement_id,
            placement.logical_id,
            placement.adapter_id
        );
        Ok(())
    }

    fn delete_partition(&self, partition_id: PartitionId) -> CatalogResult<()> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let partition = self
            .partitions
            .get(&partition_id)
            .map(|p| p.clone())
            .ok_or_else(|| CatalogError::not_found("partition", partition_id))?;
        let users = ids_where(&self.allocations, |a| a.partition_id() == partition_id);
        if !users.is_empty() {
            return Err(CatalogError::ConstraintViolation(format!(
                "partition {} is still used by allocations {:?}",
                partition_id, users
            )));
        }
        self.partitions.remove(&partition_id);
        self.refs.release_entity(partition.logical_id);
        self.emit(CatalogObject::Partition(partition_id), ChangeAction::Removed);
        Ok(())
    }

    fn delete_partition_group(&self, group_id: PartitionGroupId) -> CatalogResult<()> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let group = self
            .partition_groups
            .get(&group_id)
            .map(|g| g.clone())
            .ok_or_else(|| CatalogError::not_found("partition group", group_id))?;
        let members = ids_where(&self.partitions, |p| p.group_id == Some(group_id));
        if !members.is_empty() {
            return Err(CatalogError::ConstraintViolation(format!(
                "partition group {} still has partitions {:?}",
                group_id, members
            )));
        }
        self.partition_groups.remove(&group_id);
        self.refs.release_entity(group.logical_id);
        self.emit(CatalogObject::PartitionGroup(group_id), ChangeAction::Removed);
        Ok(())
    }
}

/// Contract shared by the allocation catalogs of every data model
pub trait AllocationProvider: Send + Sync {
    fn core(&self) -> &AllocationCore;

    fn namespace_id(&self) -> NamespaceId {
        self.core().namespace_id()
    }

    fn data_model(&self) -> DataModel {
        self.core().data_model()
    }

    fn image(&self) -> AllocationImage {
        self.core().image()
    }

    /// Bind a logical entity to an adapter; one placement per (entity, adapter)
    fn add_placement(
        &self,
        logical_id: EntityId,
        adapter_id: AdapterId,
    ) -> CatalogResult<AllocationPlacement> {
        self.core().add_placement(logical_id, adapter_id)
    }

    fn add_partition_group(
        &self,
        spec: PartitionGroupSpec,
    ) -> CatalogResult<AllocationPartitionGroup> {
        self.core().add_partition_group(spec)
    }

    fn add_partition(&self, spec: PartitionSpec) -> CatalogResult<AllocationPartition> {
        self.core().add_partition(spec)
    }

    /// Give the (placement, partition) pair its allocation entity
    fn add_allocation(
        &self,
        adapter_id: AdapterId,
        placement_id: PlacementId,
        partition_id: PartitionId,
        logical_id: EntityId,
    ) -> CatalogResult<AllocationEntity> {
        self.core()
            .add_allocation(adapter_id, placement_id, partition_id, logical_id)
    }

    fn delete_allocation(&self, allocation_id: AllocationId) -> CatalogResult<()> {
        self.core().delete_allocation(allocation_id)
    }

    fn delete_placement(&self, placement_id: PlacementId) -> CatalogResult<()> {
        self.core().delete_placement(placement_id)
    }

    fn delete_partition(&self, partition_id: PartitionId) -> CatalogResult<()> {
        self.core().delete_partition(partition_id)
    }

    fn delete_partition_group(&self, group_id: PartitionGroupId) -> CatalogResult<()> {
        self.core().delete_partition_group(group_id)
    }

    fn placement(&self, id: PlacementId) -> Option<AllocationPlacement> {
        self.core().placements.get(&id).map(|p| p.clone())
    }

    fn partition_group(&self, id: PartitionGroupId) -> Option<AllocationPartitionGroup> {
        self.core().partition_groups.get(&id).map(|g| g.clone())
    }

    fn partition(&self, id: PartitionId) -> Option<AllocationPartition> {
        self.core().partitions.get(&id).map(|p| p.clone())
    }

    fn allocation(&self, id: AllocationId) -> Option<AllocationEntity> {
        self.core().allocations.get(&id).map(|a| a.clone())
    }

    fn placements_for(&self, logical_id: EntityId) -> Vec<AllocationPlacement> {
        filtered(&self.core().placements, |p| p.logical_id == logical_id, |p| p.id)
    }

    fn placements_on(&self, adapter_id: AdapterId) -> Vec<AllocationPlacement> {
        filtered(&self.core().placements, |p| p.adapter_id == adapter_id, |p| p.id)
    }

    fn partitions_for(&self, logical_id: EntityId) -> Vec<AllocationPartition> {
        filtered(&self.core().partitions, |p| p.logical_id == logical_id, |p| p.id)
    }

    fn allocations_for(&self, logical_id: EntityId) -> Vec<AllocationEntity> {
        filtered(
            &self.core().allocations,
            |a| a.logical_id() == logical_id,
            |a| a.id(),
        )
    }

    fn allocations_on(&self, adapter_id: AdapterId) -> Vec<AllocationEntity> {
        filtered(
            &self.core().allocations,
            |a| a.adapter_id() == adapter_id,
            |a| a.id(),
        )
    }
}

fn filtered<K, V>(
    map: &DashMap<K, V>,
    pred: impl Fn(&V) -> bool,
    order: impl Fn(&V) -> u64,
) -> Vec<V>
where
    K: Eq + std::hash::Hash,
    V: Clone,
{
    let mut values: Vec<V> = map
        .iter()
        .filter(|e| pred(e.value()))
        .map(|e| e.value().clone())
        .collect();
    values.sort_by_key(|v| order(v));
    values
}

/// The allocation catalog of one namespace
#[derive(Clone)]
pub enum AllocationCatalog {
    Relational(Arc<RelationalAllocationCatalog>),
    Document(Arc<DocumentAllocationCatalog>),
    Graph(Arc<GraphAllocationCatalog>),
}

impl AllocationCatalog {
    pub fn from_image(
        ctx: CatalogContext,
        gate: WriteGate,
        refs: Arc<ReferenceTracker>,
        logical: Arc<dyn LogicalLookup>,
        image: AllocationImage,
    ) -> Self {
        let model = logical.data_model();
        let core = AllocationCore::from_image(ctx, gate, refs, logical, image);
        match model {
            DataModel::Relational => {
                AllocationCatalog::Relational(Arc::new(RelationalAllocationCatalog::from_core(core)))
            }
            DataModel::Document => {
                AllocationCatalog::Document(Arc::new(DocumentAllocationCatalog::from_core(core)))
            }
            DataModel::Graph => {
                AllocationCatalog::Graph(Arc::new(GraphAllocationCatalog::from_core(core)))
            }
        }
    }

    pub fn provider(&self) -> &dyn AllocationProvider {
        match self {
            AllocationCatalog::Relational(c) => c.as_ref(),
            AllocationCatalog::Document(c) => c.as_ref(),
            AllocationCatalog::Graph(c) => c.as_ref(),
        }
    }

    pub fn image(&self) -> AllocationImage {
        self.provider().image()
    }
}
