// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Multi-model, multi-layer metadata catalog
//!
//! Every namespace carries three layers of catalogs sharing one write gate:
//! the logical layer (schema objects), the allocation layer (which adapter
//! holds which slice of which entity) and the physical layer (what adapters
//! actually created). The [`Catalog`] aggregate ties the namespaces together
//! with the user and adapter registry.

// Core catalog system exports
pub mod allocation;
pub mod context;
pub mod entity;
pub mod error;
pub mod events;
pub mod id;
pub mod image;
pub mod logical;
pub mod manager;
pub mod pattern;
pub mod physical;
pub mod registry;

pub use error::{CatalogError, CatalogResult};
pub use manager::{Catalog, CatalogHandle, CatalogState};
