// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Logical catalog of a graph namespace
//!
//! Graphs may be addressed by aliases; aliases share the name space of the
//! graphs themselves.

use super::relational::sorted;
use super::{check_name, same_name, LogicalLookup};
use crate::catalog::context::{new_write_gate, CatalogContext, ReferenceTracker, WriteGate};
use crate::catalog::entity::{DataModel, LogicalGraph, LogicalNamespace};
use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::events::{CatalogEvent, CatalogObject, ChangeAction};
use crate::catalog::id::{ColumnId, EntityId, NamespaceId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLogicalImage {
    pub graphs: Vec<LogicalGraph>,
}

pub struct GraphLogicalCatalog {
    ctx: CatalogContext,
    namespace_id: NamespaceId,
    case_sensitive: bool,
    gate: WriteGate,
    refs: Arc<ReferenceTracker>,
    graphs: DashMap<EntityId, LogicalGraph>,
}

impl GraphLogicalCatalog {
    pub fn new(
        ctx: CatalogContext,
        namespace: &LogicalNamespace,
        gate: WriteGate,
        refs: Arc<ReferenceTracker>,
    ) -> Self {
        Self::from_image(ctx, namespace, gate, refs, GraphLogicalImage::default())
    }

    pub fn from_image(
        ctx: CatalogContext,
        namespace: &LogicalNamespace,
        gate: WriteGate,
        refs: Arc<ReferenceTracker>,
        image: GraphLogicalImage,
    ) -> Self {
        Self {
            ctx,
            namespace_id: namespace.id,
            case_sensitive: namespace.case_sensitive,
            gate,
            refs,
            graphs: image.graphs.into_iter().map(|g| (g.id, g)).collect(),
        }
    }

    pub fn image(&self) -> GraphLogicalImage {
        GraphLogicalImage {
            graphs: sorted(&self.graphs, |g| g.id),
        }
    }

    pub fn copy(&self) -> Self {
        self.copy_sharing(
            self.ctx.detached(),
            new_write_gate(),
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
            data_model: DataModel::Graph,
            case_sensitive: self.case_sensitive,
        };
        Self::from_image(ctx, &namespace, gate, refs, self.image())
    }

    pub fn graph(&self, id: EntityId) -> Option<LogicalGraph> {
        self.graphs.get(&id).map(|g| g.clone())
    }

    /// Resolve a graph by its name or one of its aliases
    pub fn graph_by_name(&self, name: &str) -> Option<LogicalGraph> {
        self.graphs
            .iter()
            .find(|g| {
                same_name(self.case_sensitive, &g.name, name)
                    || g.aliases
                        .iter()
                        .any(|a| same_name(self.case_sensitive, a, name))
            })
            .map(|g| g.value().clone())
    }

    pub fn graph_count(&self) -> usize {
        self.graphs.len()
    }

    pub fn add_graph(
        &self,
        name: &str,
        modifiable: bool,
        case_sensitive: bool,
    ) -> CatalogResult<LogicalGraph> {
        check_name("graph", name)?;
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.ensure_name_free(name, None)?;

        let graph = LogicalGraph {
            id: self.ctx.ids().next_entity_id(),
            name: name.to_string(),
            namespace_id: self.namespace_id,
            modifiable,
            case_sensitive,
            aliases: BTreeSet::new(),
        };
        self.graphs.insert(graph.id, graph.clone());
        self.emit(CatalogObject::Entity(graph.id), ChangeAction::Added);
        Ok(graph)
    }

    pub fn rename_graph(&self, id: EntityId, name: &str) -> CatalogResult<LogicalGraph> {
        check_name("graph", name)?;
        let _gate = self.ctx.begin_write(&self.gate)?;
        self.ensure_name_free(name, Some(id))?;
        self.update_graph(id, |g| g.name = name.to_string())
    }

    pub fn delete_graph(&self, id: EntityId) -> CatalogResult<()> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let graph = self
            .graph(id)
            .ok_or_else(|| CatalogError::not_found("graph", id))?;
        let refs = self.refs.entity_refs(id);
        if refs > 0 {
            return Err(CatalogError::ConstraintViolation(format!(
                "graph '{}' is still referenced by {} allocation objects",
                graph.name, refs
            )));
        }
        self.graphs.remove(&id);
        self.emit(CatalogObject::Entity(id), ChangeAction::Removed);
        Ok(())
    }

    /// Add an alias; with `if_not_exists` an alias the graph already has is accepted.
    pub fn add_alias(
        &self,
        id: EntityId,
        alias: &str,
        if_not_exists: bool,
    ) -> CatalogResult<LogicalGraph> {
        check_name("alias", alias)?;
        let _gate = self.ctx.begin_write(&self.gate)?;
        let graph = self
            .graph(id)
            .ok_or_else(|| CatalogError::not_found("graph", id))?;
        if graph.aliases.iter().any(|a| same_name(self.case_sensitive, a, alias)) {
            if if_not_exists {
                return Ok(graph);
            }
            return Err(CatalogError::NameConflict(format!(
                "graph '{}' already has alias '{}'",
                graph.name, alias
            )));
        }
        self.ensure_name_free(alias, None)?;
        self.update_graph(id, |g| {
            g.aliases.insert(alias.to_string());
        })
    }

    /// Remove an alias; with `if_exists` a missing alias is not an error.
    pub fn remove_alias(
        &self,
        id: EntityId,
        alias: &str,
        if_exists: bool,
    ) -> CatalogResult<LogicalGraph> {
        let _gate = self.ctx.begin_write(&self.gate)?;
        let graph = self
            .graph(id)
            .ok_or_else(|| CatalogError::not_found("graph", id))?;
        let existing = graph
            .aliases
            .iter()
            .find(|a| same_name(self.case_sensitive, a, alias))
            .cloned();
        match existing {
            Some(existing) => self.update_graph(id, |g| {
                g.aliases.remove(&existing);
            }),
            None if if_exists => Ok(graph),
            None => Err(CatalogError::NotFound(format!(
                "alias '{}' of graph '{}'",
                alias, graph.name
            ))),
        }
    }

    fn update_graph(
        &self,
        id: EntityId,
        change: impl FnOnce(&mut LogicalGraph),
    ) -> CatalogResult<LogicalGraph> {
        let updated = {
            let mut graph = self
                .graphs
                .get_mut(&id)
                .ok_or_else(|| CatalogError::not_found("graph", id))?;
            change(&mut graph);
            graph.clone()
        };
        self.emit(CatalogObject::Entity(id), ChangeAction::Updated);
        Ok(updated)
    }

    /// Graph names and aliases may not collide with each other
    fn ensure_name_free(&self, name: &str, except: Option<EntityId>) -> CatalogResult<()> {
        let taken = self.graphs.iter().any(|g| {
            Some(g.id) != except
                && (same_name(self.case_sensitive, &g.name, name)
                    || g.aliases
                        .iter()
                        .any(|a| same_name(self.case_sensitive, a, name)))
        });
        if taken {
            return Err(CatalogError::NameConflict(format!(
                "graph or alias '{}' already exists in namespace {}",
                name, self.namespace_id
            )));
        }
        Ok(())
    }

    fn emit(&self, object: CatalogObject, action: ChangeAction) {
        self.ctx
            .emit(CatalogEvent::new(self.namespace_id, object, action));
    }
}

impl LogicalLookup for GraphLogicalCatalog {
    fn namespace_id(&self) -> NamespaceId {
        self.namespace_id
    }

    fn data_model(&self) -> DataModel {
        DataModel::Graph
    }

    fn has_entity(&self, id: EntityId) -> bool {
        self.graphs.contains_key(&id)
    }

    fn column_table(&self, _column_id: ColumnId) -> Option<EntityId> {
        None
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
