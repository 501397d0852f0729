//! Test utilities for PolyCatalog integration tests
//!
//! - CatalogFixture: an opened catalog with a store adapter and helpers to
//!   build tables, placements and allocations
//! - MockAdapter: a PhysicalAdapter that records what the catalog asked of it

#![allow(dead_code)]

pub mod catalog_fixture;
pub mod mock_adapter;
