// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Physical entities as reported back by adapters

use crate::catalog::id::{AdapterId, AllocationId, ColumnId, EntityId, NamespaceId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalColumn {
    pub column_id: ColumnId,
    pub name: String,
    pub position: u32,
}

/// Concrete storage object an adapter created for one allocation entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalEntity {
    pub allocation_id: AllocationId,
    pub logical_id: EntityId,
    pub adapter_id: AdapterId,
    pub namespace_id: NamespaceId,
    pub namespace_name: String,
    pub name: String,
    pub columns: Vec<PhysicalColumn>,
}

impl PhysicalEntity {
    pub fn column(&self, column_id: ColumnId) -> Option<&PhysicalColumn> {
        self.columns.iter().find(|c| c.column_id == column_id)
    }

    /// Columns ordered by their physical position
    pub fn ordered_columns(&self) -> Vec<&PhysicalColumn> {
        let mut columns: Vec<_> = self.columns.iter().collect();
        columns.sort_by_key(|c| c.position);
        columns
    }
}
