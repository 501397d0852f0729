// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Logical layer entities
//!
//! These are the schema objects as the user defines them, independent of where
//! their data is stored.

use super::types::{Collation, ColumnType, DataModel, DefaultValue, EntityType};
use crate::catalog::id::{
    AdapterId, ColumnId, ConstraintId, EntityId, IndexId, KeyId, NamespaceId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Namespace definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalNamespace {
    pub id: NamespaceId,
    pub name: String,
    pub data_model: DataModel,
    pub case_sensitive: bool,
}

impl LogicalNamespace {
    pub fn with_name(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    /// Compare an entity name according to the namespace's case rules
    pub fn names_equal(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalTable {
    pub id: EntityId,
    pub name: String,
    pub namespace_id: NamespaceId,
    pub entity_type: EntityType,
    pub modifiable: bool,
    pub primary_key: Option<KeyId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalCollection {
    pub id: EntityId,
    pub name: String,
    pub namespace_id: NamespaceId,
    pub entity_type: EntityType,
    pub modifiable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalGraph {
    pub id: EntityId,
    pub name: String,
    pub namespace_id: NamespaceId,
    pub modifiable: bool,
    pub case_sensitive: bool,
    pub aliases: BTreeSet<String>,
}

/// Any logical entity, whatever its data model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalEntity {
    Table(LogicalTable),
    Collection(LogicalCollection),
    Graph(LogicalGraph),
}

impl LogicalEntity {
    pub fn id(&self) -> EntityId {
        match self {
            LogicalEntity::Table(t) => t.id,
            LogicalEntity::Collection(c) => c.id,
            LogicalEntity::Graph(g) => g.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LogicalEntity::Table(t) => &t.name,
            LogicalEntity::Collection(c) => &c.name,
            LogicalEntity::Graph(g) => &g.name,
        }
    }

    pub fn namespace_id(&self) -> NamespaceId {
        match self {
            LogicalEntity::Table(t) => t.namespace_id,
            LogicalEntity::Collection(c) => c.namespace_id,
            LogicalEntity::Graph(g) => g.namespace_id,
        }
    }

    pub fn data_model(&self) -> DataModel {
        match self {
            LogicalEntity::Table(_) => DataModel::Relational,
            LogicalEntity::Collection(_) => DataModel::Document,
            LogicalEntity::Graph(_) => DataModel::Graph,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            LogicalEntity::Table(t) => t.entity_type,
            LogicalEntity::Collection(c) => c.entity_type,
            LogicalEntity::Graph(_) => EntityType::Entity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalColumn {
    pub id: ColumnId,
    pub name: String,
    pub table_id: EntityId,
    pub namespace_id: NamespaceId,
    pub position: u32,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub collation: Option<Collation>,
    pub default_value: Option<DefaultValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnforcementTime {
    OnQuery,
    OnCommit,
}

/// A set of columns of one table which keys, constraints and indexes refer to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalKey {
    pub id: KeyId,
    pub table_id: EntityId,
    pub namespace_id: NamespaceId,
    pub column_ids: Vec<ColumnId>,
    pub enforcement_time: EnforcementTime,
}

impl LogicalKey {
    /// Same columns regardless of order
    pub fn covers_exactly(&self, column_ids: &[ColumnId]) -> bool {
        let mine: BTreeSet<_> = self.column_ids.iter().collect();
        let theirs: BTreeSet<_> = column_ids.iter().collect();
        self.column_ids.len() == column_ids.len() && mine == theirs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintType {
    Unique,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalConstraint {
    pub id: ConstraintId,
    pub key_id: KeyId,
    pub constraint_type: ConstraintType,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForeignKeyOption {
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalForeignKey {
    /// Id of the key holding the referencing columns
    pub key_id: KeyId,
    pub name: String,
    pub table_id: EntityId,
    pub namespace_id: NamespaceId,
    pub column_ids: Vec<ColumnId>,
    pub referenced_key_id: KeyId,
    pub referenced_table_id: EntityId,
    pub referenced_namespace_id: NamespaceId,
    pub referenced_column_ids: Vec<ColumnId>,
    pub on_update: ForeignKeyOption,
    pub on_delete: ForeignKeyOption,
}

/// Whether an index was requested by a user or created to back a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexType {
    Manual,
    Automatic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalIndex {
    pub id: IndexId,
    pub name: String,
    pub table_id: EntityId,
    pub unique: bool,
    pub method: String,
    pub method_display_name: String,
    pub index_type: IndexType,
    pub adapter_id: Option<AdapterId>,
    pub key_id: KeyId,
    pub column_ids: Vec<ColumnId>,
    pub physical_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_coverage_ignores_order() {
        let key = LogicalKey {
            id: 1,
            table_id: 1,
            namespace_id: 0,
            column_ids: vec![3, 4],
            enforcement_time: EnforcementTime::OnQuery,
        };
        assert!(key.covers_exactly(&[4, 3]));
        assert!(!key.covers_exactly(&[3]));
        assert!(!key.covers_exactly(&[3, 4, 5]));
    }

    #[test]
    fn test_namespace_name_comparison() {
        let ns = LogicalNamespace {
            id: 0,
            name: "public".to_string(),
            data_model: DataModel::Relational,
            case_sensitive: false,
        };
        assert!(ns.names_equal("Emps", "emps"));
        let strict = LogicalNamespace {
            case_sensitive: true,
            ..ns
        };
        assert!(!strict.names_equal("Emps", "emps"));
    }
}
