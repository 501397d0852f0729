// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Allocation layer entities
//!
//! An allocation entity is one shard (partition) of one logical entity on one
//! adapter. Placements bind a logical entity to an adapter, partitions slice
//! its extent horizontally.

use super::types::DataModel;
use crate::catalog::id::{
    AdapterId, AllocationId, ColumnId, EntityId, NamespaceId, PartitionGroupId, PartitionId,
    PlacementId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlacement {
    pub id: PlacementId,
    pub logical_id: EntityId,
    pub namespace_id: NamespaceId,
    pub adapter_id: AdapterId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionType {
    None,
    Hash,
    Range,
    List,
}

/// Whether a partition must receive every write eagerly or may lag behind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataPlacementRole {
    UpToDate,
    Refreshable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementType {
    Automatic,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPartitionGroup {
    pub id: PartitionGroupId,
    pub logical_id: EntityId,
    pub namespace_id: NamespaceId,
    pub name: String,
    pub partition_type: PartitionType,
    pub partition_count: u32,
    pub qualifiers: Vec<String>,
    pub unbound: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPartition {
    pub id: PartitionId,
    pub logical_id: EntityId,
    pub namespace_id: NamespaceId,
    /// `None` for the trivial unpartitioned case
    pub group_id: Option<PartitionGroupId>,
    pub name: Option<String>,
    pub unbound: bool,
    pub placement_type: PlacementType,
    pub role: DataPlacementRole,
    pub qualifiers: Vec<String>,
    pub partition_type: PartitionType,
}

/// Linkage shared by every allocation entity variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationHeader {
    pub id: AllocationId,
    pub placement_id: PlacementId,
    pub partition_id: PartitionId,
    pub logical_id: EntityId,
    pub namespace_id: NamespaceId,
    pub adapter_id: AdapterId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationTable {
    pub header: AllocationHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationCollection {
    pub header: AllocationHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationGraph {
    pub header: AllocationHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationEntity {
    Table(AllocationTable),
    Collection(AllocationCollection),
    Graph(AllocationGraph),
}

impl AllocationEntity {
    pub fn new(model: DataModel, header: AllocationHeader) -> Self {
        match model {
            DataModel::Relational => AllocationEntity::Table(AllocationTable { header }),
            DataModel::Document => AllocationEntity::Collection(AllocationCollection { header }),
            DataModel::Graph => AllocationEntity::Graph(AllocationGraph { header }),
        }
    }

    pub fn header(&self) -> &AllocationHeader {
        match self {
            AllocationEntity::Table(t) => &t.header,
            AllocationEntity::Collection(c) => &c.header,
            AllocationEntity::Graph(g) => &g.header,
        }
    }

    pub fn id(&self) -> AllocationId {
        self.header().id
    }

    pub fn placement_id(&self) -> PlacementId {
        self.header().placement_id
    }

    pub fn partition_id(&self) -> PartitionId {
        self.header().partition_id
    }

    pub fn logical_id(&self) -> EntityId {
        self.header().logical_id
    }

    pub fn adapter_id(&self) -> AdapterId {
        self.header().adapter_id
    }

    pub fn namespace_id(&self) -> NamespaceId {
        self.header().namespace_id
    }

    pub fn data_model(&self) -> DataModel {
        match self {
            AllocationEntity::Table(_) => DataModel::Relational,
            AllocationEntity::Collection(_) => DataModel::Document,
            AllocationEntity::Graph(_) => DataModel::Graph,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationColumn {
    pub namespace_id: NamespaceId,
    pub placement_id: PlacementId,
    pub logical_table_id: EntityId,
    pub column_id: ColumnId,
    pub adapter_id: AdapterId,
    pub position: u32,
    pub placement_type: PlacementType,
}

impl AllocationColumn {
    pub fn key(&self) -> (PlacementId, ColumnId) {
        (self.placement_id, self.column_id)
    }
}
