// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Allocation catalog of a relational namespace
//!
//! On top of the shared placement/partition bookkeeping a relational placement
//! records which columns the adapter holds and in which order.

use super::{AllocationCore, AllocationProvider};
use crate::catalog::entity::{AllocationColumn, PlacementType};
use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::events::{CatalogObject, ChangeAction};
use crate::catalog::id::{AdapterId, ColumnId, EntityId, PlacementId};

pub struct RelationalAllocationCatalog {
    core: AllocationCore,
}

impl RelationalAllocationCatalog {
    pub(crate) fn from_core(core: AllocationCore) -> Self {
        Self { core }
    }

    pub fn copy(&self) -> Self {
        Self::from_core(self.core.copy())
    }

    /// Place a logical column on the adapter of `placement_id`
    pub fn add_column(
        &self,
        placement_id: PlacementId,
        table_id: EntityId,
        column_id: ColumnId,
        adapter_id: AdapterId,
        placement_type: PlacementType,
        position: u32,
    ) -> CatalogResult<AllocationColumn> {
        let core = &self.core;
        let _gate = core.ctx().begin_write(core.gate())?;
        let placement = core.require_placement(placement_id)?;
        if placement.logical_id != table_id || placement.adapter_id != adapter_id {
            return Err(CatalogError::ReferentialError(format!(
                "placement {} binds table {} to adapter {}, not table {} to adapter {}",
                placement_id, placement.logical_id, placement.adapter_id, table_id, adapter_id
            )));
        }
        match core.logical().column_table(column_id) {
            Some(owner) if owner == table_id => {}
            Some(owner) => {
                return Err(CatalogError::ReferentialError(format!(
                    "column {} belongs to table {}, not {}",
                    column_id, owner, table_id
                )))
            }
            None => return Err(CatalogError::not_found("column", column_id)),
        }
        if core.columns_map().contains_key(&(placement_id, column_id)) {
            return Err(CatalogError::DuplicateEntry(format!(
                "column {} is already placed on placement {}",
                column_id, placement_id
            )));
        }

        let column = AllocationColumn {
            namespace_id: core.namespace_id(),
            placement_id,
            logical_table_id: table_id,
            column_id,
            adapter_id,
            position,
            placement_type,
        };
        core.columns_map().insert(column.key(), column.clone());
        core.refs().retain_entity(table_id);
        core.refs().retain_column(column_id);
        core.emit(
            CatalogObject::AllocationColumn {
                placement_id,
                column_id,
            },
            ChangeAction::Added,
        );
        Ok(column)
    }

    pub fn delete_column(&self, placement_id: PlacementId, column_id: ColumnId) -> CatalogResult<()> {
        let core = &self.core;
        let _gate = core.ctx().begin_write(core.gate())?;
        let (_, column) = core
            .columns_map()
            .remove(&(placement_id, column_id))
            .ok_or_else(|| {
                CatalogError::NotFound(format!(
                    "column {} on placement {}",
                    column_id, placement_id
                ))
            })?;
        core.refs().release_entity(column.logical_table_id);
        core.refs().release_column(column_id);
        core.emit(
            CatalogObject::AllocationColumn {
                placement_id,
                column_id,
            },
            ChangeAction::Removed,
        );
        Ok(())
    }

    pub fn update_column_placement_type(
        &self,
        placement_id: PlacementId,
        column_id: ColumnId,
        placement_type: PlacementType,
    ) -> CatalogResult<AllocationColumn> {
        self.update_column(placement_id, column_id, |c| c.placement_type = placement_type)
    }

    pub fn update_column_position(
        &self,
        placement_id: PlacementId,
        column_id: ColumnId,
        position: u32,
    ) -> CatalogResult<AllocationColumn> {
        self.update_column(placement_id, column_id, |c| c.position = position)
    }

    pub fn column(&self, placement_id: PlacementId, column_id: ColumnId) -> Option<AllocationColumn> {
        self.core
            .columns_map()
            .get(&(placement_id, column_id))
            .map(|c| c.clone())
    }

    /// Columns held by a placement, ordered by their allocation position
    pub fn columns(&self, placement_id: PlacementId) -> Vec<AllocationColumn> {
        let mut columns: Vec<_> = self
            .core
            .columns_map()
            .iter()
            .filter(|c| c.placement_id == placement_id)
            .map(|c| c.value().clone())
            .collect();
        columns.sort_by_key(|c| (c.position, c.column_id));
        columns
    }

    /// Every placement of one logical column
    pub fn column_placements(&self, column_id: ColumnId) -> Vec<AllocationColumn> {
        let mut columns: Vec<_> = self
            .core
            .columns_map()
            .iter()
            .filter(|c| c.column_id == column_id)
            .map(|c| c.value().clone())
            .collect();
        columns.sort_by_key(|c| c.placement_id);
        columns
    }

    fn update_column(
        &self,
        placement_id: PlacementId,
        column_id: ColumnId,
        change: impl FnOnce(&mut AllocationColumn),
    ) -> CatalogResult<AllocationColumn> {
        let core = &self.core;
        let _gate = core.ctx().begin_write(core.gate())?;
        let updated = {
            let mut column = core
                .columns_map()
                .get_mut(&(placement_id, column_id))
                .ok_or_else(|| {
                    CatalogError::NotFound(format!(
                        "column {} on placement {}",
                        column_id, placement_id
                    ))
                })?;
            change(&mut column);
            column.clone()
        };
        core.emit(
            CatalogObject::AllocationColumn {
                placement_id,
                column_id,
            },
            ChangeAction::Updated,
        );
        Ok(updated)
    }
}

impl AllocationProvider for RelationalAllocationCatalog {
    fn core(&self) -> &AllocationCore {
        &self.core
    }
}
