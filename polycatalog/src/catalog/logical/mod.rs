// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Logical catalogs, one specialisation per data model
//!
//! A logical catalog owns the schema objects of one namespace. All of them share
//! the namespace's write gate and reference tracker with the allocation catalog
//! of that namespace.

pub mod document;
pub mod graph;
pub mod relational;

pub use document::{DocumentLogicalCatalog, DocumentLogicalImage};
pub use graph::{GraphLogicalCatalog, GraphLogicalImage};
pub use relational::{ForeignKeySpec, IndexSpec, RelationalLogicalCatalog, RelationalLogicalImage};

use super::context::{CatalogContext, ReferenceTracker, WriteGate};
use super::entity::{DataModel, LogicalNamespace};
use super::id::{ColumnId, EntityId, NamespaceId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What the allocation layer needs to know about the logical layer
pub trait LogicalLookup: Send + Sync {
    fn namespace_id(&self) -> NamespaceId;

    fn data_model(&self) -> DataModel;

    fn has_entity(&self, id: EntityId) -> bool;

    /// Table owning the column, if the column is live
    fn column_table(&self, column_id: ColumnId) -> Option<EntityId>;

    /// Deep copy writing through `gate` and counting references in `refs`,
    /// for an allocation catalog copied together with it
    fn copy_lookup(
        &self,
        ctx: CatalogContext,
        gate: WriteGate,
        refs: Arc<ReferenceTracker>,
    ) -> Arc<dyn LogicalLookup>;
}

/// Persisted form of any logical catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalImage {
    Relational(RelationalLogicalImage),
    Document(DocumentLogicalImage),
    Graph(GraphLogicalImage),
}

impl LogicalImage {
    pub fn empty(model: DataModel) -> Self {
        match model {
            DataModel::Relational => LogicalImage::Relational(Default::default()),
            DataModel::Document => LogicalImage::Document(Default::default()),
            DataModel::Graph => LogicalImage::Graph(Default::default()),
        }
    }

    pub fn data_model(&self) -> DataModel {
        match self {
            LogicalImage::Relational(_) => DataModel::Relational,
            LogicalImage::Document(_) => DataModel::Document,
            LogicalImage::Graph(_) => DataModel::Graph,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            LogicalImage::Relational(image) => image.tables.is_empty(),
            LogicalImage::Document(image) => image.collections.is_empty(),
            LogicalImage::Graph(image) => image.graphs.is_empty(),
        }
    }
}

/// The logical catalog of one namespace
#[derive(Clone)]
pub enum LogicalCatalog {
    Relational(Arc<RelationalLogicalCatalog>),
    Document(Arc<DocumentLogicalCatalog>),
    Graph(Arc<GraphLogicalCatalog>),
}

impl LogicalCatalog {
    /// Build the catalog of a namespace from its image; the image's model must
    /// match the namespace's.
    pub fn from_image(
        ctx: CatalogContext,
        namespace: &LogicalNamespace,
        gate: WriteGate,
        refs: Arc<ReferenceTracker>,
        image: LogicalImage,
    ) -> Self {
        match image {
            LogicalImage::Relational(image) => LogicalCatalog::Relational(Arc::new(
                RelationalLogicalCatalog::from_image(ctx, namespace, gate, refs, image),
            )),
            LogicalImage::Document(image) => LogicalCatalog::Document(Arc::new(
                DocumentLogicalCatalog::from_image(ctx, namespace, gate, refs, image),
            )),
            LogicalImage::Graph(image) => LogicalCatalog::Graph(Arc::new(
                GraphLogicalCatalog::from_image(ctx, namespace, gate, refs, image),
            )),
        }
    }

    pub fn image(&self) -> LogicalImage {
        match self {
            LogicalCatalog::Relational(c) => LogicalImage::Relational(c.image()),
            LogicalCatalog::Document(c) => LogicalImage::Document(c.image()),
            LogicalCatalog::Graph(c) => LogicalImage::Graph(c.image()),
        }
    }

    pub fn lookup(&self) -> Arc<dyn LogicalLookup> {
        match self {
            LogicalCatalog::Relational(c) => c.clone(),
            LogicalCatalog::Document(c) => c.clone(),
            LogicalCatalog::Graph(c) => c.clone(),
        }
    }

    pub fn data_model(&self) -> DataModel {
        match self {
            LogicalCatalog::Relational(_) => DataModel::Relational,
            LogicalCatalog::Document(_) => DataModel::Document,
            LogicalCatalog::Graph(_) => DataModel::Graph,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            LogicalCatalog::Relational(c) => c.table_count() == 0,
            LogicalCatalog::Document(c) => c.collection_count() == 0,
            LogicalCatalog::Graph(c) => c.graph_count() == 0,
        }
    }
}

/// Compare two identifiers under a namespace's case rules
pub(crate) fn same_name(case_sensitive: bool, a: &str, b: &str) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

/// Reject blank identifiers before anything is written
pub(crate) fn check_name(kind: &str, name: &str) -> super::error::CatalogResult<()> {
    if name.trim().is_empty() {
        return Err(super::error::CatalogError::InvalidParameters(format!(
            "{} name must not be empty",
            kind
        )));
    }
    Ok(())
}
