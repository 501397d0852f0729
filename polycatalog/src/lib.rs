// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! PolyCatalog - metadata catalog of a polystore database
//!
//! PolyCatalog keeps track of which schema objects exist and where their data
//! lives across heterogeneous storage adapters.
//!
//! # Features
//!
//! - **Multi-model**: relational, document and graph namespaces
//! - **Three layers**: logical schema, allocation (placements, partitions) and
//!   physical entities reported by adapters
//! - **Snapshot reads**: readers see an immutable, consistent view that is
//!   republished after every mutation
//! - **Persistence**: the whole catalog is one checksummed image kept in Sled
//!   or in memory, written on commit
//!
//! # Usage
//!
//! ```no_run
//! use polycatalog::{Catalog, CatalogConfig, EntityType};
//!
//! let catalog = Catalog::open(CatalogConfig::in_memory())?;
//! let ns = catalog.snapshot().namespace_by_name("public").unwrap().id;
//! catalog.logical_rel(ns)?.add_table("emps", EntityType::Entity, true)?;
//! assert!(catalog.snapshot().rel().table_by_name(ns, "emps").is_some());
//! # Ok::<(), polycatalog::CatalogError>(())
//! ```

pub mod catalog;
pub mod config;
pub mod snapshot;
pub mod storage;

pub use catalog::allocation::{
    AllocationProvider, DocumentAllocationCatalog, GraphAllocationCatalog, PartitionGroupSpec,
    PartitionSpec, RelationalAllocationCatalog,
};
pub use catalog::entity::*;
pub use catalog::error::{CatalogError, CatalogResult};
pub use catalog::events::{CatalogEvent, CatalogObject, ChangeAction};
pub use catalog::id::*;
pub use catalog::image::CatalogImage;
pub use catalog::logical::{
    DocumentLogicalCatalog, ForeignKeySpec, GraphLogicalCatalog, IndexSpec,
    RelationalLogicalCatalog,
};
pub use catalog::manager::{Catalog, CatalogHandle, CatalogState};
pub use catalog::pattern::Pattern;
pub use catalog::physical::{PhysicalAdapter, PhysicalCatalog};
pub use config::CatalogConfig;
pub use snapshot::{RowField, Snapshot};
pub use storage::StorageType;

/// PolyCatalog version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// PolyCatalog crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
