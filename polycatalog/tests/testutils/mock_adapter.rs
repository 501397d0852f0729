//! In-process adapter that records what the catalog asked it to do

use parking_lot::Mutex;
use polycatalog::{
    AllocationEntity, AllocationId, CatalogError, CatalogResult, ColumnId, LogicalColumn,
    LogicalNamespace, PhysicalAdapter, PhysicalColumn, PhysicalEntity,
};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterCall {
    Create(AllocationId),
    Drop(AllocationId),
    AddColumn(AllocationId, ColumnId),
    DropColumn(AllocationId, ColumnId),
    Restore(AllocationId),
}

#[derive(Default)]
pub struct MockAdapter {
    calls: Mutex<Vec<AdapterCall>>,
    failing: AtomicBool,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with an adapter error
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<AdapterCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: AdapterCall) -> CatalogResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CatalogError::Adapter(format!("mock failure on {:?}", call)));
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

impl PhysicalAdapter for MockAdapter {
    fn create_physical(
        &self,
        namespace: &LogicalNamespace,
        allocation: &AllocationEntity,
        columns: &[LogicalColumn],
    ) -> CatalogResult<PhysicalEntity> {
        self.record(AdapterCall::Create(allocation.id()))?;
        Ok(PhysicalEntity {
            allocation_id: allocation.id(),
            logical_id: allocation.logical_id(),
            adapter_id: allocation.adapter_id(),
            namespace_id: namespace.id,
            namespace_name: namespace.name.clone(),
            name: format!("tab{}", allocation.id()),
            columns: columns
                .iter()
                .enumerate()
                .map(|(position, column)| PhysicalColumn {
                    column_id: column.id,
                    name: format!("col{}", column.id),
                    position: position as u32,
                })
                .collect(),
        })
    }

    fn drop_physical(&self, allocation_id: AllocationId) -> CatalogResult<()> {
        self.record(AdapterCall::Drop(allocation_id))
    }

    fn add_physical_column(
        &self,
        physical: &PhysicalEntity,
        column: &LogicalColumn,
    ) -> CatalogResult<PhysicalColumn> {
        self.record(AdapterCall::AddColumn(physical.allocation_id, column.id))?;
        Ok(PhysicalColumn {
            column_id: column.id,
            name: format!("col{}", column.id),
            position: physical.columns.len() as u32,
        })
    }

    fn drop_physical_column(
        &self,
        physical: &PhysicalEntity,
        column_id: ColumnId,
    ) -> CatalogResult<()> {
        self.record(AdapterCall::DropColumn(physical.allocation_id, column_id))
    }

    fn restore_physical(
        &self,
        allocation: &AllocationEntity,
        saved: &PhysicalEntity,
    ) -> CatalogResult<PhysicalEntity> {
        self.record(AdapterCall::Restore(allocation.id()))?;
        Ok(saved.clone())
    }
}
