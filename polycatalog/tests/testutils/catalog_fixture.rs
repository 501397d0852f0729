//! Catalog fixture for PolyCatalog integration tests
//!
//! Wraps a freshly bootstrapped catalog and offers shortcuts for the setup
//! steps most tests share: registering stores, creating tables and placing
//! them. Everything goes through the public `Catalog` API.

use polycatalog::{
    AdapterId, AdapterType, AllocationEntity, AllocationPlacement, AllocationProvider, Catalog,
    CatalogConfig, ColumnId, ColumnType, EntityId, EntityType, LogicalColumn, LogicalTable,
    NamespaceId, PartitionSpec, PlacementType, PolyType, StorageType,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub type FixtureResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Route `log` output through the test harness; safe to call repeatedly
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Test fixture holding an initialized catalog and its default namespace
pub struct CatalogFixture {
    pub catalog: Catalog,
    pub namespace_id: NamespaceId,
    storage: Option<(StorageType, tempfile::TempDir)>,
}

impl CatalogFixture {
    /// In-memory catalog with the default user and `public` namespace
    pub fn new() -> FixtureResult<Self> {
        init_logging();
        let catalog = Catalog::open(CatalogConfig::in_memory())?;
        let namespace_id = Self::public_namespace(&catalog)?;
        Ok(Self {
            catalog,
            namespace_id,
            storage: None,
        })
    }

    /// Catalog persisted in a temporary directory with the given backend
    pub fn persistent(storage_type: StorageType) -> FixtureResult<Self> {
        init_logging();
        let temp_dir = tempfile::tempdir()?;
        let catalog = Catalog::open(CatalogConfig::persistent(
            storage_type,
            temp_dir.path().join("catalog"),
        ))?;
        let namespace_id = Self::public_namespace(&catalog)?;
        Ok(Self {
            catalog,
            namespace_id,
            storage: Some((storage_type, temp_dir)),
        })
    }

    /// Close the catalog and open a new one on the same store
    pub fn reopen(self) -> FixtureResult<Self> {
        let Self {
            catalog, storage, ..
        } = self;
        let (storage_type, temp_dir) = storage.ok_or("reopen needs a persistent fixture")?;
        catalog.close()?;
        drop(catalog);

        let catalog = Catalog::open(CatalogConfig::persistent(
            storage_type,
            temp_dir.path().join("catalog"),
        ))?;
        let namespace_id = Self::public_namespace(&catalog)?;
        Ok(Self {
            catalog,
            namespace_id,
            storage: Some((storage_type, temp_dir)),
        })
    }

    /// Close and drop the catalog, keeping its temporary directory alive so
    /// the store can be opened directly
    pub fn shut_down(self) -> FixtureResult<(PathBuf, tempfile::TempDir)> {
        let Self {
            catalog, storage, ..
        } = self;
        let (_, temp_dir) = storage.ok_or("shut_down needs a persistent fixture")?;
        catalog.close()?;
        drop(catalog);
        Ok((temp_dir.path().join("catalog"), temp_dir))
    }

    fn public_namespace(catalog: &Catalog) -> FixtureResult<NamespaceId> {
        catalog
            .snapshot()
            .namespace_by_name("public")
            .map(|ns| ns.id)
            .ok_or_else(|| "default namespace missing".into())
    }

    /// Register a writable store adapter
    pub fn add_store(&self, unique_name: &str) -> FixtureResult<AdapterId> {
        let adapter = self.catalog.add_adapter(
            unique_name,
            "mock",
            AdapterType::Store,
            BTreeMap::new(),
        )?;
        Ok(adapter.id)
    }

    /// Create a table whose columns are non-nullable BIGINTs at positions 0..n
    pub fn add_table(
        &self,
        name: &str,
        columns: &[&str],
    ) -> FixtureResult<(LogicalTable, Vec<LogicalColumn>)> {
        let rel = self.catalog.logical_rel(self.namespace_id)?;
        let table = rel.add_table(name, EntityType::Entity, true)?;
        let mut created = Vec::new();
        for (position, column) in columns.iter().enumerate() {
            created.push(rel.add_column(
                column,
                table.id,
                position as u32,
                ColumnType::new(PolyType::BigInt),
                false,
                None,
            )?);
        }
        Ok((table, created))
    }

    /// Place a table on an adapter with the given columns and a single
    /// unpartitioned allocation
    pub fn place(
        &self,
        table_id: EntityId,
        adapter_id: AdapterId,
        columns: &[ColumnId],
    ) -> FixtureResult<(AllocationPlacement, AllocationEntity)> {
        let alloc = self.catalog.alloc_rel(self.namespace_id)?;
        let placement = alloc.add_placement(table_id, adapter_id)?;
        for (position, column_id) in columns.iter().enumerate() {
            alloc.add_column(
                placement.id,
                table_id,
                *column_id,
                adapter_id,
                PlacementType::Manual,
                position as u32,
            )?;
        }
        let partition = match alloc.partitions_for(table_id).into_iter().next() {
            Some(partition) => partition,
            None => alloc.add_partition(PartitionSpec::unpartitioned(table_id))?,
        };
        let allocation =
            alloc.add_allocation(adapter_id, placement.id, partition.id, table_id)?;
        Ok((placement, allocation))
    }
}
