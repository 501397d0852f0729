//! End-to-end DDL scenarios against the catalog: schema objects, placements
//! and the referential rules between them

#[path = "testutils/mod.rs"]
mod testutils;

use polycatalog::{
    AllocationProvider, CatalogError, ColumnType, DataModel, EntityType, ForeignKeyOption,
    ForeignKeySpec, IndexSpec, Pattern, PolyType,
};
use testutils::catalog_fixture::CatalogFixture;

#[test]
fn test_add_column_scenario() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let catalog = &fixture.catalog;

    let user = catalog.add_user("tester", "").expect("add user");
    let namespace = catalog
        .add_namespace("test_schema", DataModel::Relational, false)
        .expect("add namespace");

    let (table, column) = {
        let rel = catalog.logical_rel(namespace.id).expect("relational handle");
        let table = rel
            .add_table("test_table", EntityType::Entity, true)
            .expect("add table");
        let column = rel
            .add_column(
                "test_column",
                table.id,
                0,
                ColumnType::new(PolyType::BigInt),
                false,
                None,
            )
            .expect("add column");
        (table, column)
    };

    let snapshot = catalog.snapshot();
    assert_eq!(snapshot.user_by_name("tester").map(|u| u.id), Some(user.id));
    let found = snapshot.rel().column(column.id).expect("column in snapshot");
    assert_eq!(found.id, column.id);
    assert_eq!(found.position, 0);
    assert_eq!(found.column_type.base, PolyType::BigInt);
    assert!(!found.nullable);
    assert_eq!(
        snapshot
            .rel()
            .column_by_name(table.id, "test_column")
            .map(|c| c.id),
        Some(column.id)
    );
}

#[test]
fn test_column_placements_on_two_adapters() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let hot = fixture.add_store("hot").unwrap();
    let cold = fixture.add_store("cold").unwrap();
    let (table, columns) = fixture.add_table("orders", &["id"]).unwrap();
    let column_id = columns[0].id;

    let (hot_placement, _) = fixture.place(table.id, hot, &[column_id]).unwrap();
    let (cold_placement, _) = fixture.place(table.id, cold, &[column_id]).unwrap();
    assert_eq!(
        fixture.catalog.snapshot().alloc().column_placements(column_id).len(),
        2
    );

    fixture
        .catalog
        .alloc_rel(fixture.namespace_id)
        .unwrap()
        .delete_column(hot_placement.id, column_id)
        .unwrap();

    let snapshot = fixture.catalog.snapshot();
    let remaining = snapshot.alloc().column_placements(column_id);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].adapter_id, cold);
    assert_eq!(remaining[0].placement_id, cold_placement.id);
}

#[test]
fn test_replace_primary_key() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let (table, columns) = fixture.add_table("accounts", &["a", "b"]).unwrap();

    let rel = fixture.catalog.logical_rel(fixture.namespace_id).unwrap();
    let first = rel.add_primary_key(table.id, &[columns[0].id]).unwrap();
    let second = rel
        .add_primary_key(table.id, &[columns[0].id, columns[1].id])
        .unwrap();

    let snapshot = fixture.catalog.snapshot();
    let current = snapshot.rel().table(table.id).unwrap().primary_key.unwrap();
    assert_eq!(current, second.id);
    let key = snapshot.rel().key(current).unwrap();
    assert_eq!(snapshot.rel().primary_key(table.id), Some(key));
    assert_eq!(key.column_ids.len(), 2);
    assert!(key.column_ids.contains(&columns[0].id));
    assert!(key.column_ids.contains(&columns[1].id));
    // nothing else used the old key row
    assert!(snapshot.rel().key(first.id).is_none());
}

#[test]
fn test_nullable_column_cannot_join_primary_key() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let (table, _) = fixture.add_table("t", &[]).unwrap();
    let rel = fixture.catalog.logical_rel(fixture.namespace_id).unwrap();
    let column = rel
        .add_column("maybe", table.id, 0, ColumnType::new(PolyType::Integer), true, None)
        .unwrap();

    let result = rel.add_primary_key(table.id, &[column.id]);
    assert!(matches!(result, Err(CatalogError::ConstraintViolation(_))));
}

#[test]
fn test_table_deletion_waits_for_allocations() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let store = fixture.add_store("hsqldb").unwrap();
    let (table, columns) = fixture.add_table("events", &["id", "at"]).unwrap();
    let ids: Vec<_> = columns.iter().map(|c| c.id).collect();
    let (placement, allocation) = fixture.place(table.id, store, &ids).unwrap();

    let rel = fixture.catalog.logical_rel(fixture.namespace_id).unwrap();
    let result = rel.delete_table(table.id);
    assert!(matches!(result, Err(CatalogError::ConstraintViolation(_))));
    assert!(fixture.catalog.snapshot().rel().table(table.id).is_some());

    let alloc = fixture.catalog.alloc_rel(fixture.namespace_id).unwrap();
    alloc.delete_placement(placement.id).unwrap();
    assert!(alloc.allocation(allocation.id()).is_none());
    for partition in alloc.partitions_for(table.id) {
        alloc.delete_partition(partition.id).unwrap();
    }

    rel.delete_table(table.id).unwrap();

    let snapshot = fixture.catalog.snapshot();
    assert!(snapshot.rel().table(table.id).is_none());
    for id in ids {
        assert!(snapshot.rel().column(id).is_none());
    }
    assert!(snapshot.alloc().placements_for(table.id).is_empty());
}

#[test]
fn test_column_positions_stay_dense() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let (table, columns) = fixture
        .add_table("wide", &["c0", "c1", "c2", "c3"])
        .unwrap();

    let rel = fixture.catalog.logical_rel(fixture.namespace_id).unwrap();
    rel.delete_column(columns[1].id).unwrap();
    rel.validate_positions(table.id).unwrap();
    rel.add_column("c4", table.id, 3, ColumnType::new(PolyType::Text), true, None)
        .unwrap();
    rel.delete_column(columns[0].id).unwrap();
    rel.validate_positions(table.id).unwrap();

    // swap the first two with two calls
    let current = rel.columns(table.id);
    rel.set_column_position(current[0].id, 1).unwrap();
    rel.set_column_position(current[1].id, 0).unwrap();
    rel.validate_positions(table.id).unwrap();

    let snapshot = fixture.catalog.snapshot();
    let names: Vec<_> = snapshot
        .rel()
        .columns(table.id)
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["c3", "c2", "c4"]);
}

#[test]
fn test_placed_or_keyed_column_cannot_be_deleted() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let store = fixture.add_store("store").unwrap();
    let (table, columns) = fixture.add_table("t", &["id", "v"]).unwrap();
    fixture.place(table.id, store, &[columns[1].id]).unwrap();

    let rel = fixture.catalog.logical_rel(fixture.namespace_id).unwrap();
    rel.add_primary_key(table.id, &[columns[0].id]).unwrap();
    assert!(matches!(
        rel.delete_column(columns[0].id),
        Err(CatalogError::ConstraintViolation(_))
    ));
    assert!(matches!(
        rel.delete_column(columns[1].id),
        Err(CatalogError::ConstraintViolation(_))
    ));
}

#[test]
fn test_foreign_key_needs_unique_parent_columns() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let (parent, parent_cols) = fixture.add_table("customers", &["id", "code"]).unwrap();
    let (child, child_cols) = fixture.add_table("orders", &["id", "customer"]).unwrap();
    let rel = fixture.catalog.logical_rel(fixture.namespace_id).unwrap();

    let spec = ForeignKeySpec {
        name: "fk_customer".to_string(),
        table_id: child.id,
        column_ids: vec![child_cols[1].id],
        referenced_table_id: parent.id,
        referenced_column_ids: vec![parent_cols[0].id],
        on_update: ForeignKeyOption::Restrict,
        on_delete: ForeignKeyOption::Cascade,
    };
    assert!(matches!(
        rel.add_foreign_key(spec.clone()),
        Err(CatalogError::ReferentialError(_))
    ));

    let mismatched = ForeignKeySpec {
        referenced_column_ids: vec![parent_cols[0].id, parent_cols[1].id],
        ..spec.clone()
    };
    assert!(matches!(
        rel.add_foreign_key(mismatched),
        Err(CatalogError::ReferentialError(_))
    ));

    rel.add_primary_key(parent.id, &[parent_cols[0].id]).unwrap();
    let fk = rel.add_foreign_key(spec).unwrap();
    assert_eq!(fk.column_ids.len(), fk.referenced_column_ids.len());

    // the parent is pinned by the foreign key, and so is its primary key
    assert!(matches!(
        rel.delete_table(parent.id),
        Err(CatalogError::ConstraintViolation(_))
    ));
    assert!(rel.delete_primary_key(parent.id).is_err());

    let snapshot = fixture.catalog.snapshot();
    assert_eq!(snapshot.rel().foreign_keys(child.id).len(), 1);
    assert_eq!(snapshot.rel().exported_keys(parent.id).len(), 1);
    for fk in snapshot.rel().foreign_keys(child.id) {
        let parent_key = snapshot.rel().key(fk.referenced_key_id).unwrap();
        assert!(parent_key.covers_exactly(&fk.referenced_column_ids));
    }
}

#[test]
fn test_unique_index_backs_foreign_key() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let (parent, parent_cols) = fixture.add_table("codes", &["code"]).unwrap();
    let (child, child_cols) = fixture.add_table("items", &["code"]).unwrap();
    let rel = fixture.catalog.logical_rel(fixture.namespace_id).unwrap();

    let index = rel
        .add_index(IndexSpec::new(parent.id, vec![parent_cols[0].id]).unique())
        .unwrap();
    assert_eq!(index.name, format!("idx_{}", index.id));

    rel.add_foreign_key(ForeignKeySpec {
        name: "fk_code".to_string(),
        table_id: child.id,
        column_ids: vec![child_cols[0].id],
        referenced_table_id: parent.id,
        referenced_column_ids: vec![parent_cols[0].id],
        on_update: ForeignKeyOption::None,
        on_delete: ForeignKeyOption::None,
    })
    .unwrap();
    assert!(matches!(
        rel.delete_index(index.id),
        Err(CatalogError::ConstraintViolation(_))
    ));

    let snapshot = fixture.catalog.snapshot();
    assert_eq!(snapshot.rel().indexes(parent.id, true).len(), 1);
    assert!(snapshot.rel().indexes(child.id, false).is_empty());
}

#[test]
fn test_duplicate_names_conflict() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let (table, _) = fixture.add_table("Users", &["id"]).unwrap();
    let rel = fixture.catalog.logical_rel(fixture.namespace_id).unwrap();

    assert!(matches!(
        rel.add_table("users", EntityType::Entity, true),
        Err(CatalogError::NameConflict(_))
    ));
    assert!(matches!(
        rel.add_column("ID", table.id, 1, ColumnType::new(PolyType::Integer), true, None),
        Err(CatalogError::NameConflict(_))
    ));
    assert!(matches!(
        fixture
            .catalog
            .add_namespace("PUBLIC", DataModel::Document, false),
        Err(CatalogError::NameConflict(_))
    ));
}

#[test]
fn test_duplicate_placement_is_rejected() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let store = fixture.add_store("store").unwrap();
    let (table, _) = fixture.add_table("t", &["id"]).unwrap();
    let alloc = fixture.catalog.alloc_rel(fixture.namespace_id).unwrap();

    alloc.add_placement(table.id, store).unwrap();
    assert!(matches!(
        alloc.add_placement(table.id, store),
        Err(CatalogError::DuplicateEntry(_))
    ));
    assert_eq!(alloc.placements_for(table.id).len(), 1);
}

#[test]
fn test_document_and_graph_namespaces() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let catalog = &fixture.catalog;
    let store = fixture.add_store("mongo").unwrap();

    let docs = catalog
        .add_namespace("docs", DataModel::Document, false)
        .unwrap();
    let social = catalog
        .add_namespace("social", DataModel::Graph, true)
        .unwrap();

    let collection = catalog
        .logical_doc(docs.id)
        .unwrap()
        .add_collection("reviews", EntityType::Entity, true)
        .unwrap();
    {
        let alloc = catalog.alloc_doc(docs.id).unwrap();
        let placement = alloc.add_placement(collection.id, store).unwrap();
        let partition = alloc
            .add_partition(polycatalog::PartitionSpec::unpartitioned(collection.id))
            .unwrap();
        alloc
            .add_allocation(store, placement.id, partition.id, collection.id)
            .unwrap();
    }

    let graph = {
        let logical = catalog.logical_graph(social.id).unwrap();
        let graph = logical.add_graph("friends", true, true).unwrap();
        logical.add_alias(graph.id, "buddies", false).unwrap();
        graph
    };

    assert!(matches!(
        catalog.logical_rel(docs.id),
        Err(CatalogError::NamespaceTypeMismatch { .. })
    ));

    let snapshot = catalog.snapshot();
    assert_eq!(
        snapshot
            .doc()
            .collection_by_name(docs.id, "REVIEWS")
            .map(|c| c.id),
        Some(collection.id)
    );
    assert_eq!(
        snapshot.graph().graph_by_name(social.id, "buddies").map(|g| g.id),
        Some(graph.id)
    );
    assert_eq!(snapshot.alloc().allocations_for(collection.id).len(), 1);
    assert!(snapshot.row_type(snapshot.alloc().allocations_for(collection.id)[0].id()).is_none());
    assert_eq!(
        snapshot.graph().graphs(Some(&Pattern::new("fri%"))).len(),
        1
    );
}

#[test]
fn test_copy_is_independent() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let store = fixture.add_store("store").unwrap();
    let (table, columns) = fixture.add_table("t", &["id"]).unwrap();
    fixture.place(table.id, store, &[columns[0].id]).unwrap();

    let copy = fixture.catalog.copy().expect("copy");
    let original = fixture.catalog.snapshot();
    let copied = copy.snapshot();
    assert_eq!(
        copied.rel().table(table.id).map(|t| t.name.clone()),
        original.rel().table(table.id).map(|t| t.name.clone())
    );
    assert_eq!(
        copied.alloc().placements_for(table.id),
        original.alloc().placements_for(table.id)
    );
    assert_eq!(copied.row_type(1_000_000), None);

    copy.logical_rel(fixture.namespace_id)
        .unwrap()
        .rename_table(table.id, "renamed")
        .unwrap();
    let renamed_in_copy = copy
        .logical_rel(fixture.namespace_id)
        .unwrap()
        .add_table("only_in_copy", EntityType::Entity, true)
        .unwrap();

    let original = fixture.catalog.snapshot();
    assert_eq!(original.rel().table(table.id).unwrap().name, "t");
    assert!(original.rel().table(renamed_in_copy.id).is_none());
    assert_eq!(copy.snapshot().rel().table(table.id).unwrap().name, "renamed");

    // the copy draws ids from the same generator
    let fresh = fixture.add_table("after_copy", &[]).unwrap().0;
    assert_ne!(fresh.id, renamed_in_copy.id);
}

#[test]
fn test_mutation_visible_while_handle_is_held() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let rel = fixture.catalog.logical_rel(fixture.namespace_id).unwrap();

    let table = rel.add_table("held", EntityType::Entity, true).unwrap();
    assert!(fixture.catalog.snapshot().rel().table(table.id).is_some());

    let column = rel
        .add_column("id", table.id, 0, ColumnType::new(PolyType::BigInt), false, None)
        .unwrap();
    rel.add_primary_key(table.id, &[column.id]).unwrap();
    let snapshot = fixture.catalog.snapshot();
    assert_eq!(snapshot.rel().columns(table.id).len(), 1);
    assert!(snapshot.rel().primary_key(table.id).is_some());

    // a failed mutation publishes nothing
    assert!(rel.add_table("held", EntityType::Entity, true).is_err());
    assert!(std::sync::Arc::ptr_eq(&snapshot, &fixture.catalog.snapshot()));
}

#[test]
fn test_handle_to_deleted_namespace_is_stale() {
    let fixture = CatalogFixture::new().expect("Failed to create fixture");
    let catalog = &fixture.catalog;
    let scratch = catalog
        .add_namespace("scratch", DataModel::Relational, false)
        .unwrap();
    let rel = catalog.logical_rel(scratch.id).unwrap();

    catalog.delete_namespace(scratch.id).unwrap();
    assert!(matches!(
        rel.add_table("orphan", EntityType::Entity, true),
        Err(CatalogError::StaleHandle)
    ));
    assert!(catalog.snapshot().rel().tables(None, None).is_empty());
}
