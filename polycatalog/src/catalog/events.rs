// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Change events emitted by the per-namespace catalogs
//!
//! Every committed mutation sends one event per touched object on the catalog's
//! channel. The aggregate drains the channel on the writer thread and rebuilds
//! the snapshot when anything arrived.

use super::id::{
    AdapterId, AllocationId, ColumnId, ConstraintId, EntityId, IndexId, KeyId, NamespaceId,
    PartitionGroupId, PartitionId, PlacementId, UserId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeAction {
    Added,
    Updated,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogObject {
    Namespace(NamespaceId),
    Entity(EntityId),
    Column(ColumnId),
    Key(KeyId),
    Constraint(ConstraintId),
    /// Foreign keys are identified by the key holding their columns
    ForeignKey(KeyId),
    Index(IndexId),
    Placement(PlacementId),
    PartitionGroup(PartitionGroupId),
    Partition(PartitionId),
    Allocation(AllocationId),
    AllocationColumn {
        placement_id: PlacementId,
        column_id: ColumnId,
    },
    Physical(AllocationId),
    Adapter(AdapterId),
    User(UserId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEvent {
    /// `None` for catalog-wide objects (users, adapters)
    pub namespace_id: Option<NamespaceId>,
    pub object: CatalogObject,
    pub action: ChangeAction,
}

impl CatalogEvent {
    pub fn new(namespace_id: NamespaceId, object: CatalogObject, action: ChangeAction) -> Self {
        Self {
            namespace_id: Some(namespace_id),
            object,
            action,
        }
    }

    pub fn global(object: CatalogObject, action: ChangeAction) -> Self {
        Self {
            namespace_id: None,
            object,
            action,
        }
    }
}
