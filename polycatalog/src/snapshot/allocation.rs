// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Allocation and physical views of a snapshot

use crate::catalog::allocation::AllocationImage;
use crate::catalog::entity::{
    AllocationColumn, AllocationEntity, AllocationPartition, AllocationPartitionGroup,
    AllocationPlacement, PhysicalEntity,
};
use crate::catalog::id::{
    AdapterId, AllocationId, ColumnId, EntityId, PartitionGroupId, PartitionId, PlacementId,
};
use crate::catalog::physical::PhysicalImage;
use std::collections::BTreeMap;

/// Placements, partitions, allocation entities and allocation columns across
/// all namespaces
#[derive(Debug, Default)]
pub struct AllocationSnapshot {
    placements: BTreeMap<PlacementId, AllocationPlacement>,
    partition_groups: BTreeMap<PartitionGroupId, AllocationPartitionGroup>,
    partitions: BTreeMap<PartitionId, AllocationPartition>,
    allocations: BTreeMap<AllocationId, AllocationEntity>,
    columns: BTreeMap<(PlacementId, ColumnId), AllocationColumn>,
}

impl AllocationSnapshot {
    pub(crate) fn add_namespace(&mut self, image: AllocationImage) {
        self.placements
            .extend(image.placements.into_iter().map(|p| (p.id, p)));
        self.partition_groups
            .extend(image.partition_groups.into_iter().map(|g| (g.id, g)));
        self.partitions
            .extend(image.partitions.into_iter().map(|p| (p.id, p)));
        self.allocations
            .extend(image.allocations.into_iter().map(|a| (a.id(), a)));
        self.columns
            .extend(image.columns.into_iter().map(|c| (c.key(), c)));
    }

    pub fn placement(&self, id: PlacementId) -> Option<&AllocationPlacement> {
        self.placements.get(&id)
    }

    pub fn placements_for(&self, logical_id: EntityId) -> Vec<&AllocationPlacement> {
        self.placements
            .values()
            .filter(|p| p.logical_id == logical_id)
            .collect()
    }

    pub fn placements_on(&self, adapter_id: AdapterId) -> Vec<&AllocationPlacement> {
        self.placements
            .values()
            .filter(|p| p.adapter_id == adapter_id)
            .collect()
    }

    /// The placement of a logical entity on one adapter
    pub fn placement_of(
        &self,
        logical_id: EntityId,
        adapter_id: AdapterId,
    ) -> Option<&AllocationPlacement> {
        self.placements
            .values()
            .find(|p| p.logical_id == logical_id && p.adapter_id == adapter_id)
    }

    pub fn partition(&self, id: PartitionId) -> Option<&AllocationPartition> {
        self.partitions.get(&id)
    }

    pub fn partitions_for(&self, logical_id: EntityId) -> Vec<&AllocationPartition> {
        self.partitions
            .values()
            .filter(|p| p.logical_id == logical_id)
            .collect()
    }

    pub fn partition_group(&self, id: PartitionGroupId) -> Option<&AllocationPartitionGroup> {
        self.partition_groups.get(&id)
    }

    pub fn partition_groups_for(&self, logical_id: EntityId) -> Vec<&AllocationPartitionGroup> {
        self.partition_groups
            .values()
            .filter(|g| g.logical_id == logical_id)
            .collect()
    }

    pub fn allocation(&self, id: AllocationId) -> Option<&AllocationEntity> {
        self.allocations.get(&id)
    }

    pub fn allocations_for(&self, logical_id: EntityId) -> Vec<&AllocationEntity> {
        self.allocations
            .values()
            .filter(|a| a.logical_id() == logical_id)
            .collect()
    }

    pub fn allocations_on(&self, adapter_id: AdapterId) -> Vec<&AllocationEntity> {
        self.allocations
            .values()
            .filter(|a| a.adapter_id() == adapter_id)
            .collect()
    }

    pub fn allocation_for(
        &self,
        placement_id: PlacementId,
        partition_id: PartitionId,
    ) -> Option<&AllocationEntity> {
        self.allocations
            .values()
            .find(|a| a.placement_id() == placement_id && a.partition_id() == partition_id)
    }

    pub fn column(&self, placement_id: PlacementId, column_id: ColumnId) -> Option<&AllocationColumn> {
        self.columns.get(&(placement_id, column_id))
    }

    /// Allocation columns of a placement ordered by their position on the adapter
    pub fn columns(&self, placement_id: PlacementId) -> Vec<&AllocationColumn> {
        let mut columns: Vec<_> = self
            .columns
            .range((placement_id, ColumnId::MIN)..=(placement_id, ColumnId::MAX))
            .map(|(_, c)| c)
            .collect();
        columns.sort_by_key(|c| (c.position, c.column_id));
        columns
    }

    /// Every placement of one logical column
    pub fn column_placements(&self, column_id: ColumnId) -> Vec<&AllocationColumn> {
        self.columns
            .values()
            .filter(|c| c.column_id == column_id)
            .collect()
    }
}

/// Physical entities reported by adapters, keyed by allocation
#[derive(Debug, Default)]
pub struct PhysicalSnapshot {
    entities: BTreeMap<AllocationId, PhysicalEntity>,
}

impl PhysicalSnapshot {
    pub(crate) fn add_namespace(&mut self, image: PhysicalImage) {
        self.entities
            .extend(image.entities.into_iter().map(|e| (e.allocation_id, e)));
    }

    pub fn physical(&self, allocation_id: AllocationId) -> Option<&PhysicalEntity> {
        self.entities.get(&allocation_id)
    }

    pub fn physicals_on(&self, adapter_id: AdapterId) -> Vec<&PhysicalEntity> {
        self.entities
            .values()
            .filter(|e| e.adapter_id == adapter_id)
            .collect()
    }

    pub fn physicals_for(&self, logical_id: EntityId) -> Vec<&PhysicalEntity> {
        self.entities
            .values()
            .filter(|e| e.logical_id == logical_id)
            .collect()
    }
}
