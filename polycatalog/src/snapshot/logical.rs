// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Logical views of a snapshot, one per data model

use crate::catalog::entity::{
    LogicalCollection, LogicalColumn, LogicalConstraint, LogicalForeignKey, LogicalGraph,
    LogicalIndex, LogicalKey, LogicalTable,
};
use crate::catalog::id::{ColumnId, ConstraintId, EntityId, IndexId, KeyId, NamespaceId};
use crate::catalog::logical::{DocumentLogicalImage, GraphLogicalImage, RelationalLogicalImage};
use crate::catalog::pattern::{self, Pattern};
use std::collections::{BTreeMap, BTreeSet};

fn same_name(case_sensitive: bool, a: &str, b: &str) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

/// Tables, columns, keys, constraints, foreign keys and indexes of every
/// relational namespace
#[derive(Debug, Default)]
pub struct RelationalSnapshot {
    case_sensitive: BTreeMap<NamespaceId, bool>,
    tables: BTreeMap<EntityId, LogicalTable>,
    columns: BTreeMap<ColumnId, LogicalColumn>,
    /// Column ids of each table ordered by position
    table_columns: BTreeMap<EntityId, Vec<ColumnId>>,
    keys: BTreeMap<KeyId, LogicalKey>,
    constraints: BTreeMap<ConstraintId, LogicalConstraint>,
    foreign_keys: BTreeMap<KeyId, LogicalForeignKey>,
    indexes: BTreeMap<IndexId, LogicalIndex>,
    flagged: BTreeSet<EntityId>,
}

impl RelationalSnapshot {
    pub(crate) fn add_namespace(
        &mut self,
        namespace_id: NamespaceId,
        case_sensitive: bool,
        image: RelationalLogicalImage,
    ) {
        self.case_sensitive.insert(namespace_id, case_sensitive);
        self.tables
            .extend(image.tables.into_iter().map(|t| (t.id, t)));
        for column in image.columns {
            self.table_columns
                .entry(column.table_id)
                .or_default()
                .push(column.id);
            self.columns.insert(column.id, column);
        }
        self.keys.extend(image.keys.into_iter().map(|k| (k.id, k)));
        self.constraints
            .extend(image.constraints.into_iter().map(|c| (c.id, c)));
        self.foreign_keys
            .extend(image.foreign_keys.into_iter().map(|f| (f.key_id, f)));
        self.indexes
            .extend(image.indexes.into_iter().map(|i| (i.id, i)));
        self.flagged.extend(image.flagged_for_deletion);
    }

    pub(crate) fn finish(&mut self) {
        let columns = &self.columns;
        for ids in self.table_columns.values_mut() {
            ids.sort_by_key(|id| columns.get(id).map_or(u32::MAX, |c| c.position));
        }
    }

    pub fn table(&self, id: EntityId) -> Option<&LogicalTable> {
        self.tables.get(&id)
    }

    pub fn table_by_name(&self, namespace_id: NamespaceId, name: &str) -> Option<&LogicalTable> {
        let case_sensitive = *self.case_sensitive.get(&namespace_id)?;
        self.tables
            .values()
            .find(|t| t.namespace_id == namespace_id && same_name(case_sensitive, &t.name, name))
    }

    /// Tables ordered by id, optionally restricted to one namespace and a
    /// `LIKE` pattern on the name
    pub fn tables(
        &self,
        namespace_id: Option<NamespaceId>,
        name: Option<&Pattern>,
    ) -> Vec<&LogicalTable> {
        self.tables
            .values()
            .filter(|t| namespace_id.map_or(true, |ns| t.namespace_id == ns))
            .filter(|t| pattern::matches(name, &t.name))
            .collect()
    }

    pub fn column(&self, id: ColumnId) -> Option<&LogicalColumn> {
        self.columns.get(&id)
    }

    /// Columns of a table ordered by position
    pub fn columns(&self, table_id: EntityId) -> Vec<&LogicalColumn> {
        self.table_columns
            .get(&table_id)
            .map(|ids| ids.iter().filter_map(|id| self.columns.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn column_by_name(&self, table_id: EntityId, name: &str) -> Option<&LogicalColumn> {
        let table = self.tables.get(&table_id)?;
        let case_sensitive = self
            .case_sensitive
            .get(&table.namespace_id)
            .copied()
            .unwrap_or(false);
        self.columns(table_id)
            .into_iter()
            .find(|c| same_name(case_sensitive, &c.name, name))
    }

    pub fn key(&self, id: KeyId) -> Option<&LogicalKey> {
        self.keys.get(&id)
    }

    pub fn primary_key(&self, table_id: EntityId) -> Option<&LogicalKey> {
        self.keys.get(&self.tables.get(&table_id)?.primary_key?)
    }

    pub fn keys(&self, table_id: EntityId) -> Vec<&LogicalKey> {
        self.keys.values().filter(|k| k.table_id == table_id).collect()
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&LogicalConstraint> {
        self.constraints.get(&id)
    }

    pub fn constraints(&self, table_id: EntityId) -> Vec<&LogicalConstraint> {
        self.constraints
            .values()
            .filter(|c| self.keys.get(&c.key_id).map_or(false, |k| k.table_id == table_id))
            .collect()
    }

    pub fn foreign_key(&self, key_id: KeyId) -> Option<&LogicalForeignKey> {
        self.foreign_keys.get(&key_id)
    }

    /// Foreign keys declared on the table (imported keys)
    pub fn foreign_keys(&self, table_id: EntityId) -> Vec<&LogicalForeignKey> {
        self.foreign_keys
            .values()
            .filter(|f| f.table_id == table_id)
            .collect()
    }

    /// Foreign keys of other tables referencing this one
    pub fn exported_keys(&self, table_id: EntityId) -> Vec<&LogicalForeignKey> {
        self.foreign_keys
            .values()
            .filter(|f| f.referenced_table_id == table_id)
            .collect()
    }

    pub fn index(&self, id: IndexId) -> Option<&LogicalIndex> {
        self.indexes.get(&id)
    }

    pub fn indexes(&self, table_id: EntityId, only_unique: bool) -> Vec<&LogicalIndex> {
        self.indexes
            .values()
            .filter(|i| i.table_id == table_id && (!only_unique || i.unique))
            .collect()
    }

    pub fn is_flagged_for_deletion(&self, table_id: EntityId) -> bool {
        self.flagged.contains(&table_id)
    }
}

/// Collections of every document namespace
#[derive(Debug, Default)]
pub struct DocumentSnapshot {
    case_sensitive: BTreeMap<NamespaceId, bool>,
    collections: BTreeMap<EntityId, LogicalCollection>,
}

impl DocumentSnapshot {
    pub(crate) fn add_namespace(
        &mut self,
        namespace_id: NamespaceId,
        case_sensitive: bool,
        image: DocumentLogicalImage,
    ) {
        self.case_sensitive.insert(namespace_id, case_sensitive);
        self.collections
            .extend(image.collections.into_iter().map(|c| (c.id, c)));
    }

    pub fn collection(&self, id: EntityId) -> Option<&LogicalCollection> {
        self.collections.get(&id)
    }

    pub fn collection_by_name(
        &self,
        namespace_id: NamespaceId,
        name: &str,
    ) -> Option<&LogicalCollection> {
        let case_sensitive = *self.case_sensitive.get(&namespace_id)?;
        self.collections
            .values()
            .find(|c| c.namespace_id == namespace_id && same_name(case_sensitive, &c.name, name))
    }

    pub fn collections(
        &self,
        namespace_id: Option<NamespaceId>,
        name: Option<&Pattern>,
    ) -> Vec<&LogicalCollection> {
        self.collections
            .values()
            .filter(|c| namespace_id.map_or(true, |ns| c.namespace_id == ns))
            .filter(|c| pattern::matches(name, &c.name))
            .collect()
    }
}

/// Graphs of every graph namespace
#[derive(Debug, Default)]
pub struct GraphSnapshot {
    graphs: BTreeMap<EntityId, LogicalGraph>,
}

impl GraphSnapshot {
    pub(crate) fn add_namespace(&mut self, image: GraphLogicalImage) {
        self.graphs
            .extend(image.graphs.into_iter().map(|g| (g.id, g)));
    }

    pub fn graph(&self, id: EntityId) -> Option<&LogicalGraph> {
        self.graphs.get(&id)
    }

    /// Resolve a graph by name or alias, honouring the graph's own case rule
    pub fn graph_by_name(&self, namespace_id: NamespaceId, name: &str) -> Option<&LogicalGraph> {
        self.graphs.values().find(|g| {
            g.namespace_id == namespace_id
                && (same_name(g.case_sensitive, &g.name, name)
                    || g.aliases.iter().any(|a| same_name(g.case_sensitive, a, name)))
        })
    }

    pub fn graphs(&self, name: Option<&Pattern>) -> Vec<&LogicalGraph> {
        self.graphs
            .values()
            .filter(|g| pattern::matches(name, &g.name))
            .collect()
    }
}
