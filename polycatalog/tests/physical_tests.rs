//! Physical layer tests: the catalog driving an adapter through the lifecycle
//! of an allocation's storage object

#[path = "testutils/mod.rs"]
mod testutils;

use polycatalog::{AllocationProvider, CatalogError, ColumnType, PlacementType, PolyType};
use std::sync::Arc;
use testutils::catalog_fixture::CatalogFixture;
use testutils::mock_adapter::{AdapterCall, MockAdapter};

fn attached(fixture: &CatalogFixture, name: &str) -> (u64, Arc<MockAdapter>) {
    let adapter_id = fixture.add_store(name).unwrap();
    let adapter = Arc::new(MockAdapter::new());
    fixture
        .catalog
        .attach_adapter(adapter_id, adapter.clone())
        .unwrap();
    (adapter_id, adapter)
}

#[test]
fn test_materialize_records_physical_entity() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let (adapter_id, adapter) = attached(&fixture, "hsqldb");
    let (table, columns) = fixture.add_table("emps", &["id", "name"]).unwrap();
    let ids: Vec<_> = columns.iter().map(|c| c.id).collect();
    let (_, allocation) = fixture.place(table.id, adapter_id, &ids).unwrap();

    let physical = fixture
        .catalog
        .materialize(fixture.namespace_id, allocation.id())
        .unwrap();
    assert_eq!(physical.namespace_name, "public");
    assert_eq!(physical.columns.len(), 2);
    assert_eq!(adapter.calls(), vec![AdapterCall::Create(allocation.id())]);

    let snapshot = fixture.catalog.snapshot();
    assert_eq!(snapshot.physical().physical(allocation.id()), Some(&physical));
    assert_eq!(snapshot.physical().physicals_on(adapter_id).len(), 1);
    let row = snapshot.row_type(allocation.id()).unwrap();
    assert_eq!(
        row.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        vec!["id", "name"]
    );
    assert!(row.iter().all(|f| f.physical_name.is_some()));

    assert!(matches!(
        fixture
            .catalog
            .materialize(fixture.namespace_id, allocation.id()),
        Err(CatalogError::DuplicateEntry(_))
    ));
}

#[test]
fn test_materialized_allocation_cannot_be_removed() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let (adapter_id, adapter) = attached(&fixture, "hsqldb");
    let (table, columns) = fixture.add_table("emps", &["id"]).unwrap();
    let (placement, allocation) = fixture.place(table.id, adapter_id, &[columns[0].id]).unwrap();
    fixture
        .catalog
        .materialize(fixture.namespace_id, allocation.id())
        .unwrap();

    {
        let alloc = fixture.catalog.alloc_rel(fixture.namespace_id).unwrap();
        assert!(matches!(
            alloc.delete_allocation(allocation.id()),
            Err(CatalogError::ConstraintViolation(_))
        ));
        assert!(matches!(
            alloc.delete_placement(placement.id),
            Err(CatalogError::ConstraintViolation(_))
        ));
    }
    assert!(matches!(
        fixture.catalog.delete_adapter(adapter_id),
        Err(CatalogError::ConstraintViolation(_))
    ));

    fixture
        .catalog
        .drop_physical(fixture.namespace_id, allocation.id())
        .unwrap();
    assert_eq!(
        adapter.calls().last(),
        Some(&AdapterCall::Drop(allocation.id()))
    );
    fixture
        .catalog
        .alloc_rel(fixture.namespace_id)
        .unwrap()
        .delete_placement(placement.id)
        .unwrap();
    assert!(fixture.catalog.snapshot().physical().physical(allocation.id()).is_none());
}

#[test]
fn test_physical_columns_follow_schema_changes() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let (adapter_id, adapter) = attached(&fixture, "hsqldb");
    let (table, columns) = fixture.add_table("emps", &["id"]).unwrap();
    let (placement, allocation) = fixture.place(table.id, adapter_id, &[columns[0].id]).unwrap();
    fixture
        .catalog
        .materialize(fixture.namespace_id, allocation.id())
        .unwrap();

    let salary = fixture
        .catalog
        .logical_rel(fixture.namespace_id)
        .unwrap()
        .add_column("salary", table.id, 1, ColumnType::new(PolyType::Decimal), true, None)
        .unwrap();
    fixture
        .catalog
        .alloc_rel(fixture.namespace_id)
        .unwrap()
        .add_column(placement.id, table.id, salary.id, adapter_id, PlacementType::Manual, 1)
        .unwrap();
    let physical = fixture
        .catalog
        .add_physical_column(fixture.namespace_id, allocation.id(), salary.id)
        .unwrap();
    assert!(physical.column(salary.id).is_some());
    assert!(matches!(
        fixture
            .catalog
            .add_physical_column(fixture.namespace_id, allocation.id(), salary.id),
        Err(CatalogError::DuplicateEntry(_))
    ));

    let physical = fixture
        .catalog
        .drop_physical_column(fixture.namespace_id, allocation.id(), salary.id)
        .unwrap();
    assert!(physical.column(salary.id).is_none());
    assert_eq!(
        adapter.calls(),
        vec![
            AdapterCall::Create(allocation.id()),
            AdapterCall::AddColumn(allocation.id(), salary.id),
            AdapterCall::DropColumn(allocation.id(), salary.id),
        ]
    );
    assert!(matches!(
        fixture
            .catalog
            .drop_physical_column(fixture.namespace_id, allocation.id(), salary.id),
        Err(CatalogError::NotFound(_))
    ));
}

#[test]
fn test_failed_adapter_leaves_no_trace() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let (adapter_id, adapter) = attached(&fixture, "hsqldb");
    let (table, columns) = fixture.add_table("emps", &["id"]).unwrap();
    let (_, allocation) = fixture.place(table.id, adapter_id, &[columns[0].id]).unwrap();

    adapter.fail(true);
    let before = fixture.catalog.snapshot();
    assert!(matches!(
        fixture
            .catalog
            .materialize(fixture.namespace_id, allocation.id()),
        Err(CatalogError::Adapter(_))
    ));
    let after = fixture.catalog.snapshot();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(after.physical().physical(allocation.id()).is_none());
}

#[test]
fn test_missing_runtime_adapter() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let adapter_id = fixture.add_store("detached").unwrap();
    let (table, columns) = fixture.add_table("emps", &["id"]).unwrap();
    let (_, allocation) = fixture.place(table.id, adapter_id, &[columns[0].id]).unwrap();

    assert!(matches!(
        fixture
            .catalog
            .materialize(fixture.namespace_id, allocation.id()),
        Err(CatalogError::Adapter(_))
    ));
    assert!(matches!(
        fixture
            .catalog
            .attach_adapter(9_999, Arc::new(MockAdapter::new())),
        Err(CatalogError::NotFound(_))
    ));
}

#[test]
fn test_restore_adapter_reattaches_everything() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let (adapter_id, adapter) = attached(&fixture, "hsqldb");
    let (emps, emp_cols) = fixture.add_table("emps", &["id"]).unwrap();
    let (depts, dept_cols) = fixture.add_table("depts", &["id"]).unwrap();
    let (_, first) = fixture.place(emps.id, adapter_id, &[emp_cols[0].id]).unwrap();
    let (_, second) = fixture.place(depts.id, adapter_id, &[dept_cols[0].id]).unwrap();
    for allocation in [&first, &second] {
        fixture
            .catalog
            .materialize(fixture.namespace_id, allocation.id())
            .unwrap();
    }

    // a restarted adapter instance
    let fresh = Arc::new(MockAdapter::new());
    fixture
        .catalog
        .attach_adapter(adapter_id, fresh.clone())
        .unwrap();
    assert_eq!(fixture.catalog.restore_adapter(adapter_id).unwrap(), 2);
    assert_eq!(
        fresh.calls(),
        vec![
            AdapterCall::Restore(first.id()),
            AdapterCall::Restore(second.id())
        ]
    );
    assert_eq!(adapter.calls().len(), 2);

    let restored = fixture
        .catalog
        .restore_physical(fixture.namespace_id, first.id())
        .unwrap();
    assert_eq!(restored.allocation_id, first.id());
}
