// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Logical catalog of a relational namespace
//!
//! Tables, columns, keys, unique constraints, foreign keys and indexes. Keys are
//! shared: every primary key, constraint, foreign key and index over the same
//! column list of a table points at one key row, which is removed once nothing
//! uses it any more.

use super::{check_name, same_name, LogicalLookup};
use crate::catalog::context::{CatalogContext, ReferenceTracker, WriteGate};
use crate::catalog::entity::{
    Collation, ColumnType, ConstraintType, DataModel, DefaultValue, EnforcementTime, EntityType,
    ForeignKeyOption, IndexType, LogicalColumn, LogicalConstraint, LogicalForeignKey,
    LogicalIndex, LogicalKey, LogicalNamespace, LogicalTable,
};
use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::events::{CatalogEvent, CatalogObject, ChangeAction};
use crate::catalog::id::{AdapterId, ColumnId, ConstraintId, EntityId, IndexId, KeyId, NamespaceId};
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Persisted form of a relational logical catalog, every list sorted by id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationalLogicalImage {
    pub tables: Vec<LogicalTable>,
    pub columns: Vec<LogicalColumn>,
    pub keys: Vec<LogicalKey>,
    pub constraints: Vec<LogicalConstraint>,
    pub foreign_keys: Vec<LogicalForeignKey>,
    pub indexes: Vec<LogicalIndex>,
    pub flagged_for_deletion: Vec<EntityId>,
}

/// Arguments of [`RelationalLogicalCatalog::add_foreign_key`]
#[derive(Debug, Clone)]
pub struct ForeignKeySpec {
    pub name: String,
    pub table_id: EntityId,
    pub column_ids: Vec<ColumnId>,
    pub referenced_table_id: EntityId,
    pub referenced_column_ids: Vec<ColumnId>,
    pub on_update: ForeignKeyOption,
    pub on_delete: ForeignKeyOption,
}

/// Arguments of [`RelationalLogicalCatalog::add_index`]
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub table_id: EntityId,
    pub column_ids: Vec<ColumnId>,
    pub unique: bool,
    pub method: String,
    pub method_display_name: String,
    pub index_type: IndexType,
    pub adapter_id: Option<AdapterId>,
    /// Generated from the index id when absent
    pub name: Option<String>,
}

impl IndexSpec {
    pub fn new(table_id: EntityId, column_ids: Vec<ColumnId>) -> Self {
        Self {
            table_id,
            column_ids,
            unique: false,
            method: "btree".to_string(),
            method_display_name: "BTREE".to_string(),
            index_type: IndexType::Manual,
            adapter_id: None,
            name: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

pub struct RelationalLogicalCatalog {
    ctx: CatalogContext,
    namespace_id: NamespaceId,
    case_sensitive: bool,
    gate: WriteGate,
    refs: Arc<ReferenceTracker>,
    tables: DashMap<EntityId, LogicalTable>,
    columns: DashMap<ColumnId, LogicalColumn>,
    keys: DashMap<KeyId, LogicalKey>,
    constraints: DashMap<ConstraintId, LogicalConstraint>,
    foreign_keys: DashMap<KeyId, LogicalForeignKey>,
    indexes: DashMap<IndexId, LogicalIndex>,
    flagged: DashSet<EntityId>,
}

impl RelationalLogicalCatalog {
    pub fn new(
        ctx: CatalogContext,
        namespace: &LogicalNamespace,
        gate: WriteGate,
        refs: Arc<ReferenceTracker>,
    ) -> Self {
        Self::from_image(ctx, namespace, gate, refs, RelationalLogicalImage::default())
    }

    pub fn from_image(
        ctx: CatalogContext,
        namespace: &LogicalNamespace,
        gate: WriteGate,
        refs: Arc<ReferenceTracker>,
        image: RelationalLogicalImage,
    ) -> Self {
        Self {
            ctx,
            namespace_id: namespace.id,
            case_sensitive: namespace.case_sensitive,
            gate,
            refs,
            tables: image.tables.into_iter().map(|t| (t.id, t)).collect(),
            columns: image.columns.into_iter().map(|c| (c.id, c)).collect(),
            keys: image.keys.into_iter().map(|k| (k.id, k)).collect(),
            constraints: image.constraints.into_iter().map(|c| (c.id, c)).collect(),
            foreign_keys: image.foreign_keys.into_iter().map(|f| (f.key_id, f)).collect(),
            indexes: image.indexes.into_iter().map(|i| (i.id, i)).collect(),
            flagged: image.flagged_for_deletion.into_iter().collect(),
        }
    }

    pub fn image(&self) -> RelationalLogicalImage {
        RelationalLogicalImage {
            tables: sorted(&self.tables, |t| t.id),
            columns: sorted(&self.columns, |c| c.id),
            keys: sorted(&self.keys, |k| k.id),
            constraints: sorted(&self.constraints, |c| c.id),
            foreign_keys: sorted(&self.foreign_keys, |f| f.key_id),
            indexes: sorted(&self.indexes, |i| i.id),
            flagged_for_deletion: {
                let mut flagged: Vec<_> = self.flagged.iter().map(|id| *id).collect();
                flagged.sort_unstable();
                flagged
            },
        }
    }

    /// Deep, independent clone detached from the change channel
    pub fn copy(&self) -> Self {
        self.copy_sharing(
            self.ctx.detached(),
            crate::catalog::context::new_write_gate(),
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
            data_model: DataModel::Relational,
            case_sensitive: self.case_sensitive,
        };
        Self::from_image(ctx, &namespace, gate, refs, self.image())
    }

    pub fn namespace_id(&self) -> NamespaceId {
        self.namespace_id
    }

    // ---- reads ------------------------------------------------------------

    pub fn table(&self, id: EntityId) -> Option<LogicalTable> {
        self.tables.get(&id).map(|t| t.clone())
    }

    pub fn table_by_name(&self, name: &str) -> Option<LogicalTable> {
        self.tables
            .iter()
            .find(|t| same_name(self.case_sensitive, &t.name, name))
            .map(|t| t.value().clone())
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn column(&self, id: ColumnId) -> Option<LogicalColumn> {
        self.columns.get(&id).map(|c| c.clone())
    }

    /// Columns of a table ordered by position
    pub fn columns(&self, table_id: EntityId) -> Vec<LogicalColumn> {
        let mut columns: Vec<_> = self
            .columns
            .iter()
            .filter(|c| c.table_id == table_id)
            .map(|c| c.value().clone())
            .collect();
        columns.sort_by_key(|c| c.position);
        columns
    }

    pub fn key(&self, id: KeyId) -> Option<LogicalKey> {
        self.keys.get(&id).map(|k| k.clone())
    }

    pub fn primary_key(&self, table_id: EntityId) -> Option<LogicalKey> {
        let key_id = self.tables.get(&table_id)?.primary_key?;
        self.key(key_id)
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<LogicalConstraint> {
        self.constraints.get(&id).map(|c| c.clone())
    }

    pub fn foreign_key(&self, key_id: KeyId) -> Option<LogicalForeignKey> {
        self.foreign_keys.get(&key_id).map(|f| f.clone())
    }

    pub fn index(&self, id: IndexId) -> Option<LogicalIndex> {
        self.indexes.get(&id).map(|i| i.clone())
    }

    pub fn is_flagged_for_deletion(&self, table_id: EntityId) -> bool {
        self.flagged.contains(&table_id)
    }

    /// Verify the positions of a table's columns form `0..n`
    pub fn validate_positions(&self, table_id: EntityId) -> CatalogResult<()> {
        self.require_table(table_id)?;
        let columns = self.columns(table_id);
        for (expected, column) in columns.iter().enumerate() {
            if column.position as usize != expected {
                return Err(CatalogError::ConstraintViolation(format!(
                    "column positions of table {} are not dense: '{}' is at {} but expected {}",
                    table_id, column.name, column.position, expected
                )));
            }
        }
        Ok(())
    }

    // ---- tables -----------------------------------------------------------

    pub fn add_table(
        &self,
        name: &str,
        entity_type: EntityType,
        modifiable: bool,
    ) -> CatalogResult<LogicalTable> {
        check_name("table", name)?;
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.ensure_table_name_free(name, None)?;

        let table = LogicalTable {
            id: self.ctx.ids().next_entity_id(),
            name: name.to_string(),
            namespace_id: self.namespace_id,
            entity_type,
            modifiable,
            primary_key: None,
        };
        self.tables.insert(table.id, table.clone());
        self.emit(CatalogObject::Entity(table.id), ChangeAction::Added);
        log::debug!(
            "Added table {} ({}) to namespace {}",
            table.name,
            table.id,
            self.namespace_id
        );
        Ok(table)
    }

    pub fn rename_table(&self, table_id: EntityId, name: &str) -> CatalogResult<LogicalTable> {
        check_name("table", name)?;
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_table(table_id)?;
        self.ensure_table_name_free(name, Some(table_id))?;

        let renamed = {
            let mut table = self
                .tables
                .get_mut(&table_id)
                .ok_or_else(|| CatalogError::not_found("table", table_id))?;
            table.name = name.to_string();
            table.clone()
        };
        self.emit(CatalogObject::Entity(table_id), ChangeAction::Updated);
        Ok(renamed)
    }

    pub fn flag_for_deletion(&self, table_id: EntityId, flag: bool) -> CatalogResult<()> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_table(table_id)?;
        if flag {
            self.flagged.insert(table_id);
        } else {
            self.flagged.remove(&table_id);
        }
        self.emit(CatalogObject::Entity(table_id), ChangeAction::Updated);
        Ok(())
    }

    /// Remove a table together with its columns, keys, constraints, foreign keys
    /// and indexes.
    ///
    /// Refused while the allocation layer references the table or a foreign key
    /// of another table points at it.
    pub fn delete_table(&self, table_id: EntityId) -> CatalogResult<()> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let table = self.require_table(table_id)?;

        let refs = self.refs.entity_refs(table_id);
        if refs > 0 {
            return Err(CatalogError::ConstraintViolation(format!(
                "table '{}' is still referenced by {} allocation objects",
                table.name, refs
            )));
        }
        if let Some(fk) = self
            .foreign_keys
            .iter()
            .find(|f| f.referenced_table_id == table_id && f.table_id != table_id)
        {
            return Err(CatalogError::ConstraintViolation(format!(
                "table '{}' is referenced by foreign key '{}'",
                table.name, fk.name
            )));
        }

        let mut events = Vec::new();
        for key_id in ids_where(&self.foreign_keys, |f| f.table_id == table_id) {
            self.foreign_keys.remove(&key_id);
            events.push(CatalogObject::ForeignKey(key_id));
        }
        for index_id in ids_where(&self.indexes, |i| i.table_id == table_id) {
            self.indexes.remove(&index_id);
            events.push(CatalogObject::Index(index_id));
        }
        let table_keys: BTreeSet<KeyId> = ids_where(&self.keys, |k| k.table_id == table_id)
            .into_iter()
            .collect();
        for constraint_id in ids_where(&self.constraints, |c| table_keys.contains(&c.key_id)) {
            self.constraints.remove(&constraint_id);
            events.push(CatalogObject::Constraint(constraint_id));
        }
        for key_id in table_keys {
            self.keys.remove(&key_id);
            events.push(CatalogObject::Key(key_id));
        }
        for column_id in ids_where(&self.columns, |c| c.table_id == table_id) {
            self.columns.remove(&column_id);
            events.push(CatalogObject::Column(column_id));
        }
        self.flagged.remove(&table_id);
        self.tables.remove(&table_id);
        events.push(CatalogObject::Entity(table_id));

        for object in events {
            self.emit(object, ChangeAction::Removed);
        }
        log::debug!("Deleted table {} ({})", table.name, table_id);
        Ok(())
    }

    // ---- columns ----------------------------------------------------------

    /// Add a column at a caller supplied position.
    ///
    /// Other columns keep their positions; inserting in the middle requires the
    /// caller to shift the later columns first.
    pub fn add_column(
        &self,
        name: &str,
        table_id: EntityId,
        position: u32,
        column_type: ColumnType,
        nullable: bool,
        collation: Option<Collation>,
    ) -> CatalogResult<LogicalColumn> {
        check_name("column", name)?;
        column_type
            .validate()
            .map_err(CatalogError::InvalidParameters)?;
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_table(table_id)?;
        self.ensure_column_name_free(table_id, name, None)?;

        let column = LogicalColumn {
            id: self.ctx.ids().next_column_id(),
            name: name.to_string(),
            table_id,
            namespace_id: self.namespace_id,
            position,
            column_type,
            nullable,
            collation,
            default_value: None,
        };
        self.columns.insert(column.id, column.clone());
        self.emit(CatalogObject::Column(column.id), ChangeAction::Added);
        Ok(column)
    }

    pub fn rename_column(&self, column_id: ColumnId, name: &str) -> CatalogResult<LogicalColumn> {
        check_name("column", name)?;
        let _gate = self.ctx.begin_write(&self.gate)?;
        let column = self.require_column(column_id)?;
        self.ensure_column_name_free(column.table_id, name, Some(column_id))?;
        self.update_column(column_id, |c| c.name = name.to_string())
    }

    pub fn set_column_type(
        &self,
        column_id: ColumnId,
        column_type: ColumnType,
    ) -> CatalogResult<LogicalColumn> {
        column_type
            .validate()
            .map_err(CatalogError::InvalidParameters)?;
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_column(column_id)?;
        self.update_column(column_id, |c| c.column_type = column_type)
    }

    /// Move a column to a new position.
    ///
    /// Positions are not re-validated here; reordering is done by swapping two
    /// columns with two calls.
    pub fn set_column_position(
        &self,
        column_id: ColumnId,
        position: u32,
    ) -> CatalogResult<LogicalColumn> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_column(column_id)?;
        self.update_column(column_id, |c| c.position = position)
    }

    pub fn set_nullable(&self, column_id: ColumnId, nullable: bool) -> CatalogResult<LogicalColumn> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let column = self.require_column(column_id)?;
        if nullable {
            if let Some(pk) = self.primary_key(column.table_id) {
                if pk.column_ids.contains(&column_id) {
                    return Err(CatalogError::ConstraintViolation(format!(
                        "column '{}' is part of the primary key and can not be nullable",
                        column.name
                    )));
                }
            }
        }
        self.update_column(column_id, |c| c.nullable = nullable)
    }

    pub fn set_collation(
        &self,
        column_id: ColumnId,
        collation: Option<Collation>,
    ) -> CatalogResult<LogicalColumn> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_column(column_id)?;
        self.update_column(column_id, |c| c.collation = collation)
    }

    pub fn set_default_value(
        &self,
        column_id: ColumnId,
        default_value: DefaultValue,
    ) -> CatalogResult<LogicalColumn> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_column(column_id)?;
        self.update_column(column_id, |c| c.default_value = Some(default_value))
    }

    pub fn delete_default_value(&self, column_id: ColumnId) -> CatalogResult<LogicalColumn> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_column(column_id)?;
        self.update_column(column_id, |c| c.default_value = None)
    }

    /// Delete a column and shift the later columns of its table down by one.
    ///
    /// Refused while the column is part of any key (and so of any primary key,
    /// constraint, foreign key or index) or is placed on an adapter.
    pub fn delete_column(&self, column_id: ColumnId) -> CatalogResult<()> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let column = self.require_column(column_id)?;

        if let Some(key) = self
            .keys
            .iter()
            .find(|k| k.column_ids.contains(&column_id))
        {
            return Err(CatalogError::ConstraintViolation(format!(
                "column '{}' is part of key {}",
                column.name, key.id
            )));
        }
        let placements = self.refs.column_refs(column_id);
        if placements > 0 {
            return Err(CatalogError::ConstraintViolation(format!(
                "column '{}' is still placed on {} adapters",
                column.name, placements
            )));
        }

        self.columns.remove(&column_id);
        let shifted = ids_where(&self.columns, |c| {
            c.table_id == column.table_id && c.position > column.position
        });
        for id in &shifted {
            if let Some(mut later) = self.columns.get_mut(id) {
                later.position -= 1;
            }
        }

        self.emit(CatalogObject::Column(column_id), ChangeAction::Removed);
        for id in shifted {
            self.emit(CatalogObject::Column(id), ChangeAction::Updated);
        }
        Ok(())
    }

    // ---- primary keys and constraints -------------------------------------

    /// Make the given columns the table's primary key.
    ///
    /// A previous primary key is retired (its key row removed unless something
    /// else still uses it). Replacing is refused when the old key is the only
    /// uniqueness a foreign key relies on.
    pub fn add_primary_key(
        &self,
        table_id: EntityId,
        column_ids: &[ColumnId],
    ) -> CatalogResult<LogicalKey> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let table = self.require_table(table_id)?;
        self.check_key_columns(table_id, column_ids)?;
        for id in column_ids {
            let column = self.require_column(*id)?;
            if column.nullable {
                return Err(CatalogError::ConstraintViolation(format!(
                    "primary key column '{}' must not be nullable",
                    column.name
                )));
            }
        }

        if let Some(old) = table.primary_key.and_then(|id| self.key(id)) {
            if old.covers_exactly(column_ids) {
                return Ok(old);
            }
            self.ensure_uniqueness_removable(&old)?;
        }

        let mut events = Vec::new();
        let key = self.get_or_add_key(table_id, column_ids, &mut events);
        if let Some(mut table) = self.tables.get_mut(&table_id) {
            table.primary_key = Some(key.id);
        }
        events.push(CatalogObject::Entity(table_id));
        if let Some(old) = table.primary_key {
            self.delete_key_if_unused(old, &mut events);
        }

        self.emit_all(events, ChangeAction::Updated);
        log::debug!(
            "Primary key of table {} is now key {} over {:?}",
            table.name,
            key.id,
            key.column_ids
        );
        Ok(key)
    }

    pub fn delete_primary_key(&self, table_id: EntityId) -> CatalogResult<()> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let table = self.require_table(table_id)?;
        let old = table
            .primary_key
            .and_then(|id| self.key(id))
            .ok_or_else(|| CatalogError::NotFound(format!("primary key of table {}", table_id)))?;
        self.ensure_uniqueness_removable(&old)?;

        let mut events = vec![CatalogObject::Entity(table_id)];
        if let Some(mut table) = self.tables.get_mut(&table_id) {
            table.primary_key = None;
        }
        self.delete_key_if_unused(old.id, &mut events);
        self.emit_all(events, ChangeAction::Updated);
        Ok(())
    }

    pub fn add_unique_constraint(
        &self,
        table_id: EntityId,
        name: &str,
        column_ids: &[ColumnId],
    ) -> CatalogResult<LogicalConstraint> {
        check_name("constraint", name)?;
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_table(table_id)?;
        self.check_key_columns(table_id, column_ids)?;

        let table_keys: BTreeSet<KeyId> = ids_where(&self.keys, |k| k.table_id == table_id)
            .into_iter()
            .collect();
        for constraint in self.constraints.iter() {
            if !table_keys.contains(&constraint.key_id) {
                continue;
            }
            if same_name(self.case_sensitive, &constraint.name, name) {
                return Err(CatalogError::NameConflict(format!(
                    "constraint '{}' already exists on table {}",
                    name, table_id
                )));
            }
            let covers = self
                .keys
                .get(&constraint.key_id)
                .map_or(false, |k| k.covers_exactly(column_ids));
            if covers {
                return Err(CatalogError::NameConflict(format!(
                    "a unique constraint over these columns already exists: '{}'",
                    constraint.name
                )));
            }
        }

        let mut events = Vec::new();
        let key = self.get_or_add_key(table_id, column_ids, &mut events);
        let constraint = LogicalConstraint {
            id: self.ctx.ids().next_constraint_id(),
            key_id: key.id,
            constraint_type: ConstraintType::Unique,
            name: name.to_string(),
        };
        self.constraints.insert(constraint.id, constraint.clone());
        events.push(CatalogObject::Constraint(constraint.id));
        self.emit_all(events, ChangeAction::Added);
        Ok(constraint)
    }

    pub fn delete_constraint(&self, constraint_id: ConstraintId) -> CatalogResult<()> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let constraint = self
            .constraint(constraint_id)
            .ok_or_else(|| CatalogError::not_found("constraint", constraint_id))?;
        if let Some(key) = self.key(constraint.key_id) {
            self.ensure_uniqueness_removable(&key)?;
        }

        self.constraints.remove(&constraint_id);
        let mut events = vec![CatalogObject::Constraint(constraint_id)];
        self.delete_key_if_unused(constraint.key_id, &mut events);
        self.emit_all(events, ChangeAction::Removed);
        Ok(())
    }

    // ---- foreign keys -----------------------------------------------------

    /// Add a foreign key from `spec.table_id` to `spec.referenced_table_id`.
    ///
    /// Both column lists must be non-empty and of equal length, belong to their
    /// tables, agree pairwise in base type, and the referenced columns must be
    /// exactly covered by a primary key, unique constraint or unique index.
    pub fn add_foreign_key(&self, spec: ForeignKeySpec) -> CatalogResult<LogicalForeignKey> {
        check_name("foreign key", &spec.name)?;
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_table(spec.table_id)?;
        self.require_table(spec.referenced_table_id)
            .map_err(|_| {
                CatalogError::ReferentialError(format!(
                    "referenced table {} does not exist in namespace {}",
                    spec.referenced_table_id, self.namespace_id
                ))
            })?;

        if spec.column_ids.is_empty() || spec.column_ids.len() != spec.referenced_column_ids.len()
        {
            return Err(CatalogError::ReferentialError(format!(
                "foreign key '{}' has {} columns but references {}",
                spec.name,
                spec.column_ids.len(),
                spec.referenced_column_ids.len()
            )));
        }
        self.check_key_columns(spec.table_id, &spec.column_ids)
            .map_err(as_referential)?;
        self.check_key_columns(spec.referenced_table_id, &spec.referenced_column_ids)
            .map_err(as_referential)?;

        for (child, parent) in spec.column_ids.iter().zip(&spec.referenced_column_ids) {
            let child = self.require_column(*child)?;
            let parent = self.require_column(*parent)?;
            if child.column_type.base != parent.column_type.base {
                return Err(CatalogError::ReferentialError(format!(
                    "type of '{}' ({}) does not match referenced '{}' ({})",
                    child.name, child.column_type, parent.name, parent.column_type
                )));
            }
        }

        let referenced_key = self
            .keys
            .iter()
            .filter(|k| {
                k.table_id == spec.referenced_table_id
                    && k.covers_exactly(&spec.referenced_column_ids)
            })
            .map(|k| k.id)
            .find(|id| self.uniqueness_count(*id) > 0)
            .ok_or_else(|| {
                CatalogError::ReferentialError(format!(
                    "referenced columns of foreign key '{}' are not covered by a unique key",
                    spec.name
                ))
            })?;

        for fk in self.foreign_keys.iter() {
            if fk.table_id == spec.table_id && same_name(self.case_sensitive, &fk.name, &spec.name)
            {
                return Err(CatalogError::NameConflict(format!(
                    "foreign key '{}' already exists on table {}",
                    spec.name, spec.table_id
                )));
            }
        }
        if let Some(existing) = self.find_key(spec.table_id, &spec.column_ids) {
            if self.foreign_keys.contains_key(&existing) {
                return Err(CatalogError::DuplicateEntry(format!(
                    "columns {:?} already hold a foreign key",
                    spec.column_ids
                )));
            }
        }

        let mut events = Vec::new();
        let key = self.get_or_add_key(spec.table_id, &spec.column_ids, &mut events);
        let fk = LogicalForeignKey {
            key_id: key.id,
            name: spec.name,
            table_id: spec.table_id,
            namespace_id: self.namespace_id,
            column_ids: spec.column_ids,
            referenced_key_id: referenced_key,
            referenced_table_id: spec.referenced_table_id,
            referenced_namespace_id: self.namespace_id,
            referenced_column_ids: spec.referenced_column_ids,
            on_update: spec.on_update,
            on_delete: spec.on_delete,
        };
        self.foreign_keys.insert(fk.key_id, fk.clone());
        events.push(CatalogObject::ForeignKey(fk.key_id));
        self.emit_all(events, ChangeAction::Added);
        Ok(fk)
    }

    pub fn delete_foreign_key(&self, key_id: KeyId) -> CatalogResult<()> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        if self.foreign_keys.remove(&key_id).is_none() {
            return Err(CatalogError::not_found("foreign key", key_id));
        }
        let mut events = vec![CatalogObject::ForeignKey(key_id)];
        self.delete_key_if_unused(key_id, &mut events);
        self.emit_all(events, ChangeAction::Removed);
        Ok(())
    }

    // ---- indexes ----------------------------------------------------------

    pub fn add_index(&self, spec: IndexSpec) -> CatalogResult<LogicalIndex> {
        if let Some(name) = &spec.name {
            check_name("index", name)?;
        }
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.require_table(spec.table_id)?;
        self.check_key_columns(spec.table_id, &spec.column_ids)?;
        if let Some(adapter_id) = spec.adapter_id {
            if !self.ctx.registry().has_adapter(adapter_id) {
                return Err(CatalogError::not_found("adapter", adapter_id));
            }
        }
        if let Some(name) = &spec.name {
            if self.indexes.iter().any(|i| {
                i.table_id == spec.table_id && same_name(self.case_sensitive, &i.name, name)
            }) {
                return Err(CatalogError::NameConflict(format!(
                    "index '{}' already exists on table {}",
                    name, spec.table_id
                )));
            }
        }

        let mut events = Vec::new();
        let key = self.get_or_add_key(spec.table_id, &spec.column_ids, &mut events);
        let id = self.ctx.ids().next_index_id();
        let index = LogicalIndex {
            id,
            name: spec.name.unwrap_or_else(|| format!("idx_{}", id)),
            table_id: spec.table_id,
            unique: spec.unique,
            method: spec.method,
            method_display_name: spec.method_display_name,
            index_type: spec.index_type,
            adapter_id: spec.adapter_id,
            key_id: key.id,
            column_ids: spec.column_ids,
            physical_name: None,
        };
        self.indexes.insert(index.id, index.clone());
        events.push(CatalogObject::Index(index.id));
        self.emit_all(events, ChangeAction::Added);
        Ok(index)
    }

    pub fn set_index_physical_name(
        &self,
        index_id: IndexId,
        physical_name: &str,
    ) -> CatalogResult<LogicalIndex> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let updated = {
            let mut index = self
                .indexes
                .get_mut(&index_id)
                .ok_or_else(|| CatalogError::not_found("index", index_id))?;
            index.physical_name = Some(physical_name.to_string());
            index.clone()
        };
        self.emit(CatalogObject::Index(index_id), ChangeAction::Updated);
        Ok(updated)
    }

    pub fn delete_index(&self, index_id: IndexId) -> CatalogResult<()> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let index = self
            .index(index_id)
            .ok_or_else(|| CatalogError::not_found("index", index_id))?;
        if index.unique {
            if let Some(key) = self.key(index.key_id) {
                self.ensure_uniqueness_removable(&key)?;
            }
        }

        self.indexes.remove(&index_id);
        let mut events = vec![CatalogObject::Index(index_id)];
        self.delete_key_if_unused(index.key_id, &mut events);
        self.emit_all(events, ChangeAction::Removed);
        Ok(())
    }

    // ---- internals --------------------------------------------------------

    fn emit(&self, object: CatalogObject, action: ChangeAction) {
        self.ctx
            .emit(CatalogEvent::new(self.namespace_id, object, action));
    }

    fn emit_all(&self, objects: Vec<CatalogObject>, action: ChangeAction) {
        for object in objects {
            self.emit(object, action);
        }
    }

    fn require_table(&self, table_id: EntityId) -> CatalogResult<LogicalTable> {
        self.table(table_id)
            .ok_or_else(|| CatalogError::not_found("table", table_id))
    }

    fn require_column(&self, column_id: ColumnId) -> CatalogResult<LogicalColumn> {
        self.column(column_id)
            .ok_or_else(|| CatalogError::not_found("column", column_id))
    }

    fn update_column(
        &self,
        column_id: ColumnId,
        change: impl FnOnce(&mut LogicalColumn),
    ) -> CatalogResult<LogicalColumn> {
        let updated = {
            let mut column = self
                .columns
                .get_mut(&column_id)
                .ok_or_else(|| CatalogError::not_found("column", column_id))?;
            change(&mut column);
            column.clone()
        };
        self.emit(CatalogObject::Column(column_id), ChangeAction::Updated);
        Ok(updated)
    }

    fn ensure_table_name_free(&self, name: &str, except: Option<EntityId>) -> CatalogResult<()> {
        let taken = self
            .tables
            .iter()
            .any(|t| Some(t.id) != except && same_name(self.case_sensitive, &t.name, name));
        if taken {
            return Err(CatalogError::NameConflict(format!(
                "table '{}' already exists in namespace {}",
                name, self.namespace_id
            )));
        }
        Ok(())
    }

    fn ensure_column_name_free(
        &self,
        table_id: EntityId,
        name: &str,
        except: Option<ColumnId>,
    ) -> CatalogResult<()> {
        let taken = self.columns.iter().any(|c| {
            c.table_id == table_id
                && Some(c.id) != except
                && same_name(self.case_sensitive, &c.name, name)
        });
        if taken {
            return Err(CatalogError::NameConflict(format!(
                "column '{}' already exists on table {}",
                name, table_id
            )));
        }
        Ok(())
    }

    /// Non-empty, duplicate free and all columns of the table
    fn check_key_columns(&self, table_id: EntityId, column_ids: &[ColumnId]) -> CatalogResult<()> {
        if column_ids.is_empty() {
            return Err(CatalogError::InvalidParameters(
                "a key needs at least one column".to_string(),
            ));
        }
        let distinct: BTreeSet<_> = column_ids.iter().collect();
        if distinct.len() != column_ids.len() {
            return Err(CatalogError::InvalidParameters(format!(
                "duplicate columns in {:?}",
                column_ids
            )));
        }
        for id in column_ids {
            match self.columns.get(id) {
                Some(column) if column.table_id == table_id => {}
                Some(_) => {
                    return Err(CatalogError::ReferentialError(format!(
                        "column {} does not belong to table {}",
                        id, table_id
                    )))
                }
                None => {
                    return Err(CatalogError::ReferentialError(format!(
                        "column {} does not exist",
                        id
                    )))
                }
            }
        }
        Ok(())
    }

    fn find_key(&self, table_id: EntityId, column_ids: &[ColumnId]) -> Option<KeyId> {
        self.keys
            .iter()
            .find(|k| k.table_id == table_id && k.covers_exactly(column_ids))
            .map(|k| k.id)
    }

    fn get_or_add_key(
        &self,
        table_id: EntityId,
        column_ids: &[ColumnId],
        events: &mut Vec<CatalogObject>,
    ) -> LogicalKey {
        if let Some(key) = self.find_key(table_id, column_ids).and_then(|id| self.key(id)) {
            return key;
        }
        let key = LogicalKey {
            id: self.ctx.ids().next_key_id(),
            table_id,
            namespace_id: self.namespace_id,
            column_ids: column_ids.to_vec(),
            enforcement_time: EnforcementTime::OnQuery,
        };
        self.keys.insert(key.id, key.clone());
        events.push(CatalogObject::Key(key.id));
        key
    }

    fn key_in_use(&self, key_id: KeyId) -> bool {
        self.tables.iter().any(|t| t.primary_key == Some(key_id))
            || self.constraints.iter().any(|c| c.key_id == key_id)
            || self.foreign_keys.contains_key(&key_id)
            || self
                .foreign_keys
                .iter()
                .any(|f| f.referenced_key_id == key_id)
            || self.indexes.iter().any(|i| i.key_id == key_id)
    }

    fn delete_key_if_unused(&self, key_id: KeyId, events: &mut Vec<CatalogObject>) {
        if !self.key_in_use(key_id) && self.keys.remove(&key_id).is_some() {
            events.push(CatalogObject::Key(key_id));
        }
    }

    /// Number of primary keys, unique constraints and unique indexes on a key
    fn uniqueness_count(&self, key_id: KeyId) -> usize {
        let primary = self
            .tables
            .iter()
            .filter(|t| t.primary_key == Some(key_id))
            .count();
        let constraints = self
            .constraints
            .iter()
            .filter(|c| c.key_id == key_id && c.constraint_type == ConstraintType::Unique)
            .count();
        let indexes = self
            .indexes
            .iter()
            .filter(|i| i.key_id == key_id && i.unique)
            .count();
        primary + constraints + indexes
    }

    /// Removing one source of uniqueness from `key` must not strand a foreign key
    fn ensure_uniqueness_removable(&self, key: &LogicalKey) -> CatalogResult<()> {
        let referenced = self
            .foreign_keys
            .iter()
            .find(|f| f.referenced_key_id == key.id)
            .map(|f| f.name.clone());
        if let Some(fk) = referenced {
            if self.uniqueness_count(key.id) <= 1 {
                return Err(CatalogError::ConstraintViolation(format!(
                    "key {} is the only unique key backing foreign key '{}'",
                    key.id, fk
                )));
            }
        }
        Ok(())
    }
}

impl LogicalLookup for RelationalLogicalCatalog {
    fn namespace_id(&self) -> NamespaceId {
        self.namespace_id
    }

    fn data_model(&self) -> DataModel {
        DataModel::Relational
    }

    fn has_entity(&self, id: EntityId) -> bool {
        self.tables.contains_key(&id)
    }

    fn column_table(&self, column_id: ColumnId) -> Option<EntityId> {
        self.columns.get(&column_id).map(|c| c.table_id)
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

fn as_referential(err: CatalogError) -> CatalogError {
    match err {
        CatalogError::InvalidParameters(msg) => CatalogError::ReferentialError(msg),
        other => other,
    }
}

pub(crate) fn sorted<K, V, F>(map: &DashMap<K, V>, key: F) -> Vec<V>
where
    K: Eq + std::hash::Hash,
    V: Clone,
    F: Fn(&V) -> u64,
{
    let mut values: Vec<V> = map.iter().map(|entry| entry.value().clone()).collect();
    values.sort_by_key(|v| key(v));
    values
}

/// Keys of the entries matching `pred`; collected so no shard lock is held
/// while the caller mutates the map.
pub(crate) fn ids_where<K, V, F>(map: &DashMap<K, V>, pred: F) -> Vec<K>
where
    K: Eq + std::hash::Hash + Copy,
    F: Fn(&V) -> bool,
{
    map.iter()
        .filter(|entry| pred(entry.value()))
        .map(|entry| *entry.key())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::context::new_write_gate;
    use crate::catalog::entity::PolyType;
    use crate::catalog::id::IdGenerator;
    use crate::catalog::registry::CatalogRegistry;
    use std::sync::mpsc::{channel, Receiver};

    fn catalog() -> (RelationalLogicalCatalog, Receiver<CatalogEvent>) {
        let (tx, rx) = channel();
        let ctx = CatalogContext::new(
            Arc::new(IdGenerator::new()),
            tx,
            Arc::new(CatalogRegistry::new()),
        );
        let namespace = LogicalNamespace {
            id: 0,
            name: "public".to_string(),
            data_model: DataModel::Relational,
            case_sensitive: false,
        };
        let catalog = RelationalLogicalCatalog::new(
            ctx,
            &namespace,
            new_write_gate(),
            Arc::new(ReferenceTracker::new()),
        );
        (catalog, rx)
    }

    fn int() -> ColumnType {
        ColumnType::new(PolyType::Integer)
    }

    #[test]
    fn test_table_names_are_unique_ignoring_case() {
        let (catalog, _rx) = catalog();
        catalog.add_table("emps", EntityType::Entity, true).unwrap();
        assert!(matches!(
            catalog.add_table("EMPS", EntityType::Entity, true),
            Err(CatalogError::NameConflict(_))
        ));
        assert!(catalog.table_by_name("Emps").is_some());
    }

    #[test]
    fn test_add_column_requires_live_table() {
        let (catalog, _rx) = catalog();
        assert!(matches!(
            catalog.add_column("c", 42, 0, int(), false, None),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn test_add_column_keeps_other_positions() {
        let (catalog, _rx) = catalog();
        let t = catalog.add_table("t", EntityType::Entity, true).unwrap();
        let a = catalog.add_column("a", t.id, 0, int(), false, None).unwrap();
        catalog.add_column("b", t.id, 0, int(), false, None).unwrap();
        assert_eq!(catalog.column(a.id).unwrap().position, 0);
        assert!(catalog.validate_positions(t.id).is_err());
    }

    #[test]
    fn test_delete_column_compacts_positions() {
        let (catalog, _rx) = catalog();
        let t = catalog.add_table("t", EntityType::Entity, true).unwrap();
        let ids: Vec<_> = (0..4)
            .map(|i| {
                catalog
                    .add_column(&format!("c{}", i), t.id, i, int(), true, None)
                    .unwrap()
                    .id
            })
            .collect();
        catalog.delete_column(ids[1]).unwrap();
        catalog.validate_positions(t.id).unwrap();
        let names: Vec<_> = catalog.columns(t.id).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["c0", "c2", "c3"]);
    }

    #[test]
    fn test_swap_positions() {
        let (catalog, _rx) = catalog();
        let t = catalog.add_table("t", EntityType::Entity, true).unwrap();
        let a = catalog.add_column("a", t.id, 0, int(), true, None).unwrap();
        let b = catalog.add_column("b", t.id, 1, int(), true, None).unwrap();
        catalog.set_column_position(a.id, 1).unwrap();
        catalog.set_column_position(b.id, 0).unwrap();
        catalog.validate_positions(t.id).unwrap();
        assert_eq!(catalog.columns(t.id)[0].id, b.id);
    }

    #[test]
    fn test_set_column_type_rejects_scale_above_length() {
        let (catalog, _rx) = catalog();
        let t = catalog.add_table("t", EntityType::Entity, true).unwrap();
        let c = catalog.add_column("c", t.id, 0, int(), true, None).unwrap();
        let bad = ColumnType::new(PolyType::Decimal).with_length(2).with_scale(3);
        assert!(matches!(
            catalog.set_column_type(c.id, bad),
            Err(CatalogError::InvalidParameters(_))
        ));
        assert_eq!(catalog.column(c.id).unwrap().column_type, int());
    }

    #[test]
    fn test_primary_key_columns_must_not_be_nullable() {
        let (catalog, _rx) = catalog();
        let t = catalog.add_table("t", EntityType::Entity, true).unwrap();
        let c = catalog.add_column("c", t.id, 0, int(), true, None).unwrap();
        assert!(matches!(
            catalog.add_primary_key(t.id, &[c.id]),
            Err(CatalogError::ConstraintViolation(_))
        ));
        catalog.set_nullable(c.id, false).unwrap();
        catalog.add_primary_key(t.id, &[c.id]).unwrap();
        assert!(catalog.set_nullable(c.id, true).is_err());
    }

    #[test]
    fn test_replacing_primary_key_retires_old_key() {
        let (catalog, _rx) = catalog();
        let t = catalog.add_table("t", EntityType::Entity, true).unwrap();
        let a = catalog.add_column("a", t.id, 0, int(), false, None).unwrap();
        let b = catalog.add_column("b", t.id, 1, int(), false, None).unwrap();
        let first = catalog.add_primary_key(t.id, &[a.id]).unwrap();
        let second = catalog.add_primary_key(t.id, &[a.id, b.id]).unwrap();

        assert!(catalog.key(first.id).is_none());
        assert_eq!(catalog.primary_key(t.id).unwrap().id, second.id);
        assert_eq!(catalog.table(t.id).unwrap().primary_key, Some(second.id));
    }

    #[test]
    fn test_keys_are_shared_and_outlive_one_user() {
        let (catalog, _rx) = catalog();
        let t = catalog.add_table("t", EntityType::Entity, true).unwrap();
        let a = catalog.add_column("a", t.id, 0, int(), false, None).unwrap();
        let pk = catalog.add_primary_key(t.id, &[a.id]).unwrap();
        let index = catalog
            .add_index(IndexSpec::new(t.id, vec![a.id]))
            .unwrap();
        assert_eq!(index.key_id, pk.id);
        assert_eq!(index.name, format!("idx_{}", index.id));

        catalog.delete_index(index.id).unwrap();
        assert!(catalog.key(pk.id).is_some());
        catalog.delete_primary_key(t.id).unwrap();
        assert!(catalog.key(pk.id).is_none());
    }

    #[test]
    fn test_unique_constraint_conflicts() {
        let (catalog, _rx) = catalog();
        let t = catalog.add_table("t", EntityType::Entity, true).unwrap();
        let a = catalog.add_column("a", t.id, 0, int(), false, None).unwrap();
        let b = catalog.add_column("b", t.id, 1, int(), false, None).unwrap();
        catalog.add_unique_constraint(t.id, "u_a", &[a.id]).unwrap();
        assert!(matches!(
            catalog.add_unique_constraint(t.id, "U_A", &[b.id]),
            Err(CatalogError::NameConflict(_))
        ));
        assert!(matches!(
            catalog.add_unique_constraint(t.id, "other", &[a.id]),
            Err(CatalogError::NameConflict(_))
        ));
    }

    #[test]
    fn test_foreign_key_validation() {
        let (catalog, _rx) = catalog();
        let dept = catalog.add_table("depts", EntityType::Entity, true).unwrap();
        let dept_id = catalog
            .add_column("id", dept.id, 0, int(), false, None)
            .unwrap();
        let dept_name = catalog
            .add_column("name", dept.id, 1, ColumnType::new(PolyType::VarChar).with_length(20), false, None)
            .unwrap();
        let emp = catalog.add_table("emps", EntityType::Entity, true).unwrap();
        let emp_dept = catalog
            .add_column("dept", emp.id, 0, int(), true, None)
            .unwrap();

        let spec = ForeignKeySpec {
            name: "fk_dept".to_string(),
            table_id: emp.id,
            column_ids: vec![emp_dept.id],
            referenced_table_id: dept.id,
            referenced_column_ids: vec![dept_id.id],
            on_update: ForeignKeyOption::Restrict,
            on_delete: ForeignKeyOption::Cascade,
        };

        // no unique key on the parent yet
        assert!(matches!(
            catalog.add_foreign_key(spec.clone()),
            Err(CatalogError::ReferentialError(_))
        ));
        catalog.add_primary_key(dept.id, &[dept_id.id]).unwrap();

        let mismatched = ForeignKeySpec {
            referenced_column_ids: vec![dept_id.id, dept_name.id],
            ..spec.clone()
        };
        assert!(matches!(
            catalog.add_foreign_key(mismatched),
            Err(CatalogError::ReferentialError(_))
        ));
        let wrong_type = ForeignKeySpec {
            referenced_column_ids: vec![dept_name.id],
            ..spec.clone()
        };
        assert!(matches!(
            catalog.add_foreign_key(wrong_type),
            Err(CatalogError::ReferentialError(_))
        ));

        let fk = catalog.add_foreign_key(spec).unwrap();
        assert_eq!(fk.column_ids.len(), fk.referenced_column_ids.len());

        // the primary key is the only uniqueness the foreign key relies on
        assert!(matches!(
            catalog.delete_primary_key(dept.id),
            Err(CatalogError::ConstraintViolation(_))
        ));
        assert!(matches!(
            catalog.delete_table(dept.id),
            Err(CatalogError::ConstraintViolation(_))
        ));
        assert!(matches!(
            catalog.delete_column(emp_dept.id),
            Err(CatalogError::ConstraintViolation(_))
        ));

        catalog.delete_foreign_key(fk.key_id).unwrap();
        catalog.delete_table(dept.id).unwrap();
        assert!(catalog.key(fk.key_id).is_none());
    }

    #[test]
    fn test_delete_table_leaves_no_orphans() {
        let (catalog, _rx) = catalog();
        let t = catalog.add_table("t", EntityType::Entity, true).unwrap();
        let a = catalog.add_column("a", t.id, 0, int(), false, None).unwrap();
        catalog.add_primary_key(t.id, &[a.id]).unwrap();
        catalog
            .add_index(IndexSpec::new(t.id, vec![a.id]).named("by_a"))
            .unwrap();
        catalog.flag_for_deletion(t.id, true).unwrap();

        catalog.delete_table(t.id).unwrap();
        let image = catalog.image();
        assert!(image.tables.is_empty());
        assert!(image.columns.is_empty());
        assert!(image.keys.is_empty());
        assert!(image.indexes.is_empty());
        assert!(image.flagged_for_deletion.is_empty());
    }

    #[test]
    fn test_allocation_references_block_deletion() {
        let (catalog, _rx) = catalog();
        let t = catalog.add_table("t", EntityType::Entity, true).unwrap();
        let a = catalog.add_column("a", t.id, 0, int(), false, None).unwrap();
        catalog.refs.retain_entity(t.id);
        catalog.refs.retain_column(a.id);

        assert!(matches!(
            catalog.delete_column(a.id),
            Err(CatalogError::ConstraintViolation(_))
        ));
        assert!(matches!(
            catalog.delete_table(t.id),
            Err(CatalogError::ConstraintViolation(_))
        ));

        catalog.refs.release_column(a.id);
        catalog.refs.release_entity(t.id);
        catalog.delete_table(t.id).unwrap();
    }

    #[test]
    fn test_failed_mutation_emits_nothing() {
        let (catalog, rx) = catalog();
        let t = catalog.add_table("t", EntityType::Entity, true).unwrap();
        while rx.try_recv().is_ok() {}
        assert!(catalog.add_table("t", EntityType::Entity, true).is_err());
        assert!(rx.try_recv().is_err());
        catalog.rename_table(t.id, "u").unwrap();
        assert_eq!(
            rx.try_recv().unwrap().object,
            CatalogObject::Entity(t.id)
        );
    }

    #[test]
    fn test_copy_is_independent() {
        let (catalog, _rx) = catalog();
        let t = catalog.add_table("t", EntityType::Entity, true).unwrap();
        catalog.add_column("a", t.id, 0, int(), false, None).unwrap();
        let copy = catalog.copy();
        assert_eq!(copy.image(), catalog.image());

        copy.add_column("b", t.id, 1, int(), false, None).unwrap();
        assert_eq!(catalog.columns(t.id).len(), 1);
        assert_eq!(copy.columns(t.id).len(), 2);
    }
}
