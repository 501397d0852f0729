// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Immutable, point-in-time read view of the whole catalog
//!
//! A snapshot is built from namespace images after every batch of mutations
//! and published atomically. It never changes after construction, so readers
//! can hold on to one for as long as they need a consistent view. Absence is
//! always reported as `None` or an empty vector, never as an error.

pub mod allocation;
pub mod logical;

pub use allocation::{AllocationSnapshot, PhysicalSnapshot};
pub use logical::{DocumentSnapshot, GraphSnapshot, RelationalSnapshot};

use crate::catalog::entity::{
    CatalogAdapter, CatalogUser, ColumnType, LogicalEntity, LogicalNamespace, PlacementType,
};
use crate::catalog::id::{AdapterId, AllocationId, ColumnId, EntityId, NamespaceId, SnapshotId, UserId};
use crate::catalog::image::NamespaceImage;
use crate::catalog::logical::LogicalImage;
use crate::catalog::pattern::{self, Pattern};
use crate::catalog::registry::RegistryImage;
use std::collections::BTreeMap;

/// One field of the row type an adapter stores for a relational allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowField {
    pub column_id: ColumnId,
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    /// Position within the allocation, which may differ from the logical one
    pub position: u32,
    pub placement_type: PlacementType,
    /// Set once the allocation is materialized
    pub physical_name: Option<String>,
}

#[derive(Debug, Default)]
pub struct Snapshot {
    id: SnapshotId,
    namespaces: BTreeMap<NamespaceId, LogicalNamespace>,
    users: BTreeMap<UserId, CatalogUser>,
    adapters: BTreeMap<AdapterId, CatalogAdapter>,
    rel: RelationalSnapshot,
    doc: DocumentSnapshot,
    graph: GraphSnapshot,
    alloc: AllocationSnapshot,
    physical: PhysicalSnapshot,
}

impl Snapshot {
    pub fn empty(id: SnapshotId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn build(id: SnapshotId, registry: RegistryImage, namespaces: Vec<NamespaceImage>) -> Self {
        let mut snapshot = Self::empty(id);
        snapshot.users = registry.users.into_iter().map(|u| (u.id, u)).collect();
        snapshot.adapters = registry.adapters.into_iter().map(|a| (a.id, a)).collect();

        for image in namespaces {
            let namespace = image.namespace;
            match image.logical {
                LogicalImage::Relational(logical) => {
                    snapshot
                        .rel
                        .add_namespace(namespace.id, namespace.case_sensitive, logical)
                }
                LogicalImage::Document(logical) => {
                    snapshot
                        .doc
                        .add_namespace(namespace.id, namespace.case_sensitive, logical)
                }
                LogicalImage::Graph(logical) => snapshot.graph.add_namespace(logical),
            }
            snapshot.alloc.add_namespace(image.allocation);
            snapshot.physical.add_namespace(image.physical);
            snapshot.namespaces.insert(namespace.id, namespace);
        }
        snapshot.rel.finish();

        log::debug!(
            "Built snapshot {} over {} namespaces",
            id,
            snapshot.namespaces.len()
        );
        snapshot
    }

    pub fn id(&self) -> SnapshotId {
        self.id
    }

    // ---- namespaces -------------------------------------------------------

    pub fn namespace(&self, id: NamespaceId) -> Option<&LogicalNamespace> {
        self.namespaces.get(&id)
    }

    /// Namespace names are unique ignoring case
    pub fn namespace_by_name(&self, name: &str) -> Option<&LogicalNamespace> {
        self.namespaces
            .values()
            .find(|ns| ns.name.eq_ignore_ascii_case(name))
    }

    pub fn namespaces(&self, name: Option<&Pattern>) -> Vec<&LogicalNamespace> {
        self.namespaces
            .values()
            .filter(|ns| pattern::matches(name, &ns.name))
            .collect()
    }

    // ---- principals -------------------------------------------------------

    pub fn user(&self, id: UserId) -> Option<&CatalogUser> {
        self.users.get(&id)
    }

    pub fn user_by_name(&self, name: &str) -> Option<&CatalogUser> {
        self.users.values().find(|u| u.name == name)
    }

    pub fn users(&self) -> Vec<&CatalogUser> {
        self.users.values().collect()
    }

    pub fn adapter(&self, id: AdapterId) -> Option<&CatalogAdapter> {
        self.adapters.get(&id)
    }

    pub fn adapter_by_name(&self, unique_name: &str) -> Option<&CatalogAdapter> {
        self.adapters.values().find(|a| a.unique_name == unique_name)
    }

    pub fn adapters(&self) -> Vec<&CatalogAdapter> {
        self.adapters.values().collect()
    }

    // ---- per model views --------------------------------------------------

    pub fn rel(&self) -> &RelationalSnapshot {
        &self.rel
    }

    pub fn doc(&self) -> &DocumentSnapshot {
        &self.doc
    }

    pub fn graph(&self) -> &GraphSnapshot {
        &self.graph
    }

    pub fn alloc(&self) -> &AllocationSnapshot {
        &self.alloc
    }

    pub fn physical(&self) -> &PhysicalSnapshot {
        &self.physical
    }

    /// Any logical entity, whatever its model
    pub fn entity(&self, id: EntityId) -> Option<LogicalEntity> {
        if let Some(table) = self.rel.table(id) {
            return Some(LogicalEntity::Table(table.clone()));
        }
        if let Some(collection) = self.doc.collection(id) {
            return Some(LogicalEntity::Collection(collection.clone()));
        }
        self.graph
            .graph(id)
            .map(|graph| LogicalEntity::Graph(graph.clone()))
    }

    /// Row type of a relational allocation: its allocation columns in
    /// allocation order joined with their logical columns.
    ///
    /// `None` when the allocation does not exist or is not relational.
    pub fn row_type(&self, allocation_id: AllocationId) -> Option<Vec<RowField>> {
        let allocation = self.alloc.allocation(allocation_id)?;
        self.rel.table(allocation.logical_id())?;
        let physical = self.physical.physical(allocation_id);

        let fields = self
            .alloc
            .columns(allocation.placement_id())
            .into_iter()
            .filter_map(|placed| {
                let column = self.rel.column(placed.column_id)?;
                Some(RowField {
                    column_id: column.id,
                    name: column.name.clone(),
                    column_type: column.column_type.clone(),
                    nullable: column.nullable,
                    position: placed.position,
                    placement_type: placed.placement_type,
                    physical_name: physical
                        .and_then(|p| p.column(column.id))
                        .map(|c| c.name.clone()),
                })
            })
            .collect();
        Some(fields)
    }
}
