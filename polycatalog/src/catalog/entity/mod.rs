// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog entity and value types for the logical, allocation and physical layers

pub mod allocation;
pub mod logical;
pub mod physical;
pub mod principal;
pub mod types;

pub use allocation::{
    AllocationCollection, AllocationColumn, AllocationEntity, AllocationGraph, AllocationHeader,
    AllocationPartition, AllocationPartitionGroup, AllocationPlacement, AllocationTable,
    DataPlacementRole, PartitionType, PlacementType,
};
pub use logical::{
    ConstraintType, EnforcementTime, ForeignKeyOption, IndexType, LogicalCollection,
    LogicalColumn, LogicalConstraint, LogicalEntity, LogicalForeignKey, LogicalGraph,
    LogicalIndex, LogicalKey, LogicalNamespace, LogicalTable,
};
pub use physical::{PhysicalColumn, PhysicalEntity};
pub use principal::{AdapterType, CatalogAdapter, CatalogUser};
pub use types::{Collation, ColumnType, DataModel, DefaultValue, EntityType, PolyType};
