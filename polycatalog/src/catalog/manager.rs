// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog aggregate - the single external interface
//!
//! [`Catalog`] owns the per-namespace logical, allocation and physical catalogs
//! together with the registry of users and adapters. It is the only component
//! that builds [`Snapshot`]s.
//!
//! # Lifecycle
//! - **Uninitialized**: constructed with [`Catalog::new`], nothing loaded yet
//! - **Ready**: after [`Catalog::initialize`] loaded the persisted image or
//!   bootstrapped the defaults
//! - **Closed**: after [`Catalog::close`]; every mutation fails with
//!   [`CatalogError::CatalogClosed`]
//!
//! # Publishing
//! Writers mutate the per-namespace catalogs through [`CatalogHandle`]s. Each
//! committed mutation sends a change event and, once it has released the
//! namespace gate, drains the pending events on the writer's thread and swaps
//! in a new snapshot. A mutation is therefore visible to every `snapshot()`
//! call made after it returned.
//!
//! [`Catalog::rollback`] replaces the namespace catalogs; handles obtained
//! before it fail with [`CatalogError::StaleHandle`].

use super::allocation::{
    AllocationCatalog, AllocationImage, AllocationProvider, DocumentAllocationCatalog,
    GraphAllocationCatalog, RelationalAllocationCatalog,
};
use super::context::{new_write_gate, CatalogContext, PublishChanges, ReferenceTracker, WriteGate};
use super::entity::{
    AdapterType, CatalogAdapter, CatalogUser, DataModel, EntityType, LogicalColumn,
    LogicalNamespace, PhysicalEntity,
};
use super::error::{CatalogError, CatalogResult};
use super::events::{CatalogEvent, CatalogObject, ChangeAction};
use super::id::{AdapterId, AllocationId, ColumnId, IdGenerator, NamespaceId};
use super::image::{CatalogImage, ImageHeader, NamespaceImage};
use super::logical::{
    check_name, DocumentLogicalCatalog, GraphLogicalCatalog, LogicalCatalog,
    RelationalLogicalCatalog,
};
use super::physical::{PhysicalAdapter, PhysicalCatalog};
use super::registry::CatalogRegistry;
use crate::config::CatalogConfig;
use crate::snapshot::Snapshot;
use crate::storage::CatalogStore;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Weak};

/// Lifecycle state of a [`Catalog`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogState {
    Uninitialized,
    Ready,
    Closed,
}

/// Everything the catalog keeps for one namespace
struct NamespaceCatalogs {
    namespace: RwLock<LogicalNamespace>,
    ctx: CatalogContext,
    gate: WriteGate,
    logical: LogicalCatalog,
    allocation: AllocationCatalog,
    physical: Arc<PhysicalCatalog>,
}

impl NamespaceCatalogs {
    fn from_image(ctx: &CatalogContext, image: NamespaceImage) -> Self {
        let ctx = ctx.for_namespace();
        let gate = new_write_gate();
        let refs = Arc::new(ReferenceTracker::new());
        let namespace = image.namespace;
        let logical = LogicalCatalog::from_image(
            ctx.clone(),
            &namespace,
            gate.clone(),
            refs.clone(),
            image.logical,
        );
        let allocation = AllocationCatalog::from_image(
            ctx.clone(),
            gate.clone(),
            refs.clone(),
            logical.lookup(),
            image.allocation,
        );
        let physical = Arc::new(PhysicalCatalog::from_image(
            ctx.clone(),
            namespace.id,
            gate.clone(),
            refs,
            allocation.clone(),
            image.physical,
        ));
        Self {
            namespace: RwLock::new(namespace),
            ctx,
            gate,
            logical,
            allocation,
            physical,
        }
    }

    fn namespace(&self) -> LogicalNamespace {
        self.namespace.read().clone()
    }

    /// Caller holds the gate
    fn image(&self) -> NamespaceImage {
        NamespaceImage {
            namespace: self.namespace(),
            logical: self.logical.image(),
            allocation: self.allocation.image(),
            physical: self.physical.image(),
        }
    }

    fn is_empty(&self) -> bool {
        self.logical.is_empty() && self.allocation.image() == AllocationImage::default()
    }

    /// Refuse every later write through handles to these catalogs
    fn retire(&self) {
        let _gate = self.gate.lock();
        self.ctx.retire();
    }
}

/// The namespace catalogs and what it takes to publish snapshots of them.
///
/// Shared with every [`CatalogContext`] through a weak reference, so writers
/// publish right after their mutation.
struct Publisher {
    ids: Arc<IdGenerator>,
    registry: Arc<CatalogRegistry>,
    namespaces: RwLock<BTreeMap<NamespaceId, Arc<NamespaceCatalogs>>>,
    /// Pending change events; holding the lock serialises publication
    events: Mutex<Receiver<CatalogEvent>>,
    snapshot: ArcSwap<Snapshot>,
}

impl Publisher {
    /// Caller holds the events lock
    fn rebuild_snapshot(&self) {
        let images = self
            .namespace_list()
            .iter()
            .map(|ns| {
                let _gate = ns.gate.lock();
                ns.image()
            })
            .collect();
        let snapshot = Snapshot::build(self.ids.next_snapshot_id(), self.registry.image(), images);
        self.snapshot.store(Arc::new(snapshot));
    }

    /// Namespace catalogs in id order, without holding the map lock afterwards
    fn namespace_list(&self) -> Vec<Arc<NamespaceCatalogs>> {
        self.namespaces.read().values().cloned().collect()
    }
}

impl PublishChanges for Publisher {
    fn publish_pending(&self) {
        let events = self.events.lock();
        let mut drained = 0usize;
        while let Ok(event) = events.try_recv() {
            log::trace!("Catalog change: {:?}", event);
            drained += 1;
        }
        if drained > 0 {
            debug!("Publishing snapshot after {} changes", drained);
            self.rebuild_snapshot();
        }
    }
}

/// Write access to one catalog of a namespace.
///
/// Dereferences to the catalog and cannot outlive the [`Catalog`] it came
/// from. Every mutation through it is published as soon as it returns.
pub struct CatalogHandle<'a, T> {
    inner: Arc<T>,
    _catalog: PhantomData<&'a Catalog>,
}

impl<T> Deref for CatalogHandle<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

/// The polystore metadata catalog
pub struct Catalog {
    config: CatalogConfig,
    state: RwLock<CatalogState>,
    ctx: CatalogContext,
    ids: Arc<IdGenerator>,
    registry: Arc<CatalogRegistry>,
    publisher: Arc<Publisher>,
    store: Option<CatalogStore>,
    header: Mutex<ImageHeader>,
    /// Image restored by `rollback()`
    checkpoint: Mutex<CatalogImage>,
    adapters: DashMap<AdapterId, Arc<dyn PhysicalAdapter>>,
}

impl Catalog {
    /// Create an uninitialized catalog; opens the configured store but loads
    /// nothing from it yet.
    pub fn new(config: CatalogConfig) -> CatalogResult<Self> {
        config.validate()?;
        let store = match &config.storage_path {
            Some(path) => Some(CatalogStore::open(config.storage_type, path)?),
            None => None,
        };
        Ok(Self::assemble(config, Arc::new(IdGenerator::new()), store))
    }

    /// Create and initialize in one step
    pub fn open(config: CatalogConfig) -> CatalogResult<Self> {
        let catalog = Self::new(config)?;
        catalog.initialize()?;
        Ok(catalog)
    }

    /// Open a catalog holding the contents of an exported image instead of
    /// whatever the configured store contains
    pub fn from_image(config: CatalogConfig, image: CatalogImage) -> CatalogResult<Self> {
        let catalog = Self::new(config)?;
        catalog.install(image)?;
        catalog.mark_ready();
        Ok(catalog)
    }

    fn assemble(config: CatalogConfig, ids: Arc<IdGenerator>, store: Option<CatalogStore>) -> Self {
        let (sender, receiver) = channel();
        let registry = Arc::new(CatalogRegistry::new());
        let publisher = Arc::new(Publisher {
            ids: ids.clone(),
            registry: registry.clone(),
            namespaces: RwLock::new(BTreeMap::new()),
            events: Mutex::new(receiver),
            snapshot: ArcSwap::from_pointee(Snapshot::empty(ids.next_snapshot_id())),
        });
        let hook: Weak<Publisher> = Arc::downgrade(&publisher);
        let ctx = CatalogContext::new(ids.clone(), sender, registry.clone()).with_publisher(hook);
        Self {
            config,
            state: RwLock::new(CatalogState::Uninitialized),
            ctx,
            ids,
            registry,
            publisher,
            store,
            header: Mutex::new(ImageHeader::new()),
            checkpoint: Mutex::new(CatalogImage::empty()),
            adapters: DashMap::new(),
        }
    }

    /// Load the persisted image, or bootstrap the defaults when there is none,
    /// and publish the first snapshot.
    pub fn initialize(&self) -> CatalogResult<()> {
        match self.state() {
            CatalogState::Ready => return Ok(()),
            CatalogState::Closed => return Err(CatalogError::CatalogClosed),
            CatalogState::Uninitialized => {}
        }

        let loaded = match &self.store {
            Some(store) => store.load()?,
            None => None,
        };
        match loaded {
            Some(image) => {
                info!(
                    "Loaded catalog {} (generation {}, {} namespaces)",
                    image.header.catalog_id,
                    image.header.generation,
                    image.namespaces.len()
                );
                self.install(image)?;
            }
            None => {
                if self.config.bootstrap_defaults {
                    self.bootstrap()?;
                }
                *self.checkpoint.lock() = self.image();
            }
        }

        self.mark_ready();
        Ok(())
    }

    fn mark_ready(&self) {
        *self.state.write() = CatalogState::Ready;
        let events = self.publisher.events.lock();
        while events.try_recv().is_ok() {}
        self.publisher.rebuild_snapshot();
    }

    fn bootstrap(&self) -> CatalogResult<()> {
        let user = self.registry.add_user(
            &self.ids,
            &self.config.default_user,
            &self.config.default_password,
        )?;
        let namespace = self.create_namespace(
            &self.config.default_namespace,
            self.config.default_namespace_model,
            false,
        )?;
        info!(
            "Bootstrapped catalog with user '{}' and namespace '{}'",
            user.name, namespace.name
        );
        Ok(())
    }

    /// Replace every catalog with the contents of `image`; the replaced
    /// namespace catalogs are retired
    fn install(&self, image: CatalogImage) -> CatalogResult<()> {
        for ns in &image.namespaces {
            if ns.logical.data_model() != ns.namespace.data_model {
                return Err(CatalogError::CorruptImage(format!(
                    "namespace '{}' is {} but carries a {} logical image",
                    ns.namespace.name,
                    ns.namespace.data_model,
                    ns.logical.data_model()
                )));
            }
        }

        self.ids.restore(&image.ids);
        self.registry.restore(&image.registry);
        let rebuilt: BTreeMap<_, _> = image
            .namespaces
            .iter()
            .cloned()
            .map(|ns| {
                (
                    ns.namespace.id,
                    Arc::new(NamespaceCatalogs::from_image(&self.ctx, ns)),
                )
            })
            .collect();
        let replaced = std::mem::replace(&mut *self.publisher.namespaces.write(), rebuilt);
        for ns in replaced.values() {
            ns.retire();
        }
        *self.header.lock() = image.header.clone();
        *self.checkpoint.lock() = image;
        Ok(())
    }

    pub fn state(&self) -> CatalogState {
        *self.state.read()
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    fn ensure_ready(&self) -> CatalogResult<()> {
        match self.state() {
            CatalogState::Ready => Ok(()),
            CatalogState::Uninitialized => Err(CatalogError::NotInitialized),
            CatalogState::Closed => Err(CatalogError::CatalogClosed),
        }
    }

    // ---- snapshots --------------------------------------------------------

    /// The current snapshot; repeated calls without an intervening mutation
    /// return the same `Arc`.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.publisher.snapshot.load_full()
    }

    /// Drain pending change events and publish a new snapshot if any arrived
    pub fn publish_pending(&self) {
        self.publisher.publish_pending();
    }

    fn namespace_list(&self) -> Vec<Arc<NamespaceCatalogs>> {
        self.publisher.namespace_list()
    }

    fn namespace_entry(&self, namespace_id: NamespaceId) -> CatalogResult<Arc<NamespaceCatalogs>> {
        self.publisher
            .namespaces
            .read()
            .get(&namespace_id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found("namespace", namespace_id))
    }

    fn handle<T>(&self, inner: Arc<T>) -> CatalogHandle<'_, T> {
        CatalogHandle {
            inner,
            _catalog: PhantomData,
        }
    }

    // ---- handles ----------------------------------------------------------

    pub fn logical_rel(
        &self,
        namespace_id: NamespaceId,
    ) -> CatalogResult<CatalogHandle<'_, RelationalLogicalCatalog>> {
        self.ensure_ready()?;
        match &self.namespace_entry(namespace_id)?.logical {
            LogicalCatalog::Relational(c) => Ok(self.handle(c.clone())),
            _ => Err(mismatch(namespace_id, DataModel::Relational)),
        }
    }

    pub fn logical_doc(
        &self,
        namespace_id: NamespaceId,
    ) -> CatalogResult<CatalogHandle<'_, DocumentLogicalCatalog>> {
        self.ensure_ready()?;
        match &self.namespace_entry(namespace_id)?.logical {
            LogicalCatalog::Document(c) => Ok(self.handle(c.clone())),
            _ => Err(mismatch(namespace_id, DataModel::Document)),
        }
    }

    pub fn logical_graph(
        &self,
        namespace_id: NamespaceId,
    ) -> CatalogResult<CatalogHandle<'_, GraphLogicalCatalog>> {
        self.ensure_ready()?;
        match &self.namespace_entry(namespace_id)?.logical {
            LogicalCatalog::Graph(c) => Ok(self.handle(c.clone())),
            _ => Err(mismatch(namespace_id, DataModel::Graph)),
        }
    }

    pub fn alloc_rel(
        &self,
        namespace_id: NamespaceId,
    ) -> CatalogResult<CatalogHandle<'_, RelationalAllocationCatalog>> {
        self.ensure_ready()?;
        match &self.namespace_entry(namespace_id)?.allocation {
            AllocationCatalog::Relational(c) => Ok(self.handle(c.clone())),
            _ => Err(mismatch(namespace_id, DataModel::Relational)),
        }
    }

    pub fn alloc_doc(
        &self,
        namespace_id: NamespaceId,
    ) -> CatalogResult<CatalogHandle<'_, DocumentAllocationCatalog>> {
        self.ensure_ready()?;
        match &self.namespace_entry(namespace_id)?.allocation {
            AllocationCatalog::Document(c) => Ok(self.handle(c.clone())),
            _ => Err(mismatch(namespace_id, DataModel::Document)),
        }
    }

    pub fn alloc_graph(
        &self,
        namespace_id: NamespaceId,
    ) -> CatalogResult<CatalogHandle<'_, GraphAllocationCatalog>> {
        self.ensure_ready()?;
        match &self.namespace_entry(namespace_id)?.allocation {
            AllocationCatalog::Graph(c) => Ok(self.handle(c.clone())),
            _ => Err(mismatch(namespace_id, DataModel::Graph)),
        }
    }

    /// Physical records of a namespace. Prefer [`Catalog::materialize`] and
    /// friends, which keep the adapter and the record in step.
    pub fn physical(
        &self,
        namespace_id: NamespaceId,
    ) -> CatalogResult<CatalogHandle<'_, PhysicalCatalog>> {
        self.ensure_ready()?;
        Ok(self.handle(self.namespace_entry(namespace_id)?.physical.clone()))
    }

    // ---- namespaces -------------------------------------------------------

    /// Create a namespace; names are unique ignoring case
    pub fn add_namespace(
        &self,
        name: &str,
        data_model: DataModel,
        case_sensitive: bool,
    ) -> CatalogResult<LogicalNamespace> {
        self.ensure_ready()?;
        let namespace = self.create_namespace(name, data_model, case_sensitive)?;
        self.publish_pending();
        Ok(namespace)
    }

    fn create_namespace(
        &self,
        name: &str,
        data_model: DataModel,
        case_sensitive: bool,
    ) -> CatalogResult<LogicalNamespace> {
        check_name("namespace", name)?;
        let namespace = {
            let mut namespaces = self.publisher.namespaces.write();
            ensure_namespace_name_free(&namespaces, name, None)?;
            let namespace = LogicalNamespace {
                id: self.ids.next_namespace_id(),
                name: name.to_string(),
                data_model,
                case_sensitive,
            };
            namespaces.insert(
                namespace.id,
                Arc::new(NamespaceCatalogs::from_image(
                    &self.ctx,
                    NamespaceImage::empty(namespace.clone()),
                )),
            );
            namespace
        };
        info!(
            "Created {} namespace '{}' ({})",
            data_model, namespace.name, namespace.id
        );
        self.ctx.emit(CatalogEvent::new(
            namespace.id,
            CatalogObject::Namespace(namespace.id),
            ChangeAction::Added,
        ));
        Ok(namespace)
    }

    pub fn rename_namespace(
        &self,
        namespace_id: NamespaceId,
        name: &str,
    ) -> CatalogResult<LogicalNamespace> {
        self.ensure_ready()?;
        check_name("namespace", name)?;
        let renamed = {
            let namespaces = self.publisher.namespaces.write();
            let entry = namespaces
                .get(&namespace_id)
                .ok_or_else(|| CatalogError::not_found("namespace", namespace_id))?;
            ensure_namespace_name_free(&namespaces, name, Some(namespace_id))?;
            let _gate = entry.gate.lock();
            let mut namespace = entry.namespace.write();
            *namespace = namespace.with_name(name);
            namespace.clone()
        };
        self.ctx.emit(CatalogEvent::new(
            namespace_id,
            CatalogObject::Namespace(namespace_id),
            ChangeAction::Updated,
        ));
        self.publish_pending();
        Ok(renamed)
    }

    /// Delete a namespace that no longer holds any entity
    pub fn delete_namespace(&self, namespace_id: NamespaceId) -> CatalogResult<()> {
        self.ensure_ready()?;
        {
            let mut namespaces = self.publisher.namespaces.write();
            let entry = namespaces
                .get(&namespace_id)
                .cloned()
                .ok_or_else(|| CatalogError::not_found("namespace", namespace_id))?;
            let _gate = entry.gate.lock();
            if !entry.is_empty() {
                return Err(CatalogError::ConstraintViolation(format!(
                    "namespace '{}' still contains entities",
                    entry.namespace().name
                )));
            }
            entry.ctx.retire();
            namespaces.remove(&namespace_id);
        }
        info!("Deleted namespace {}", namespace_id);
        self.ctx.emit(CatalogEvent::new(
            namespace_id,
            CatalogObject::Namespace(namespace_id),
            ChangeAction::Removed,
        ));
        self.publish_pending();
        Ok(())
    }

    // ---- users and adapters -----------------------------------------------

    pub fn add_user(&self, name: &str, password: &str) -> CatalogResult<CatalogUser> {
        self.ensure_ready()?;
        check_name("user", name)?;
        let user = self.registry.add_user(&self.ids, name, password)?;
        self.ctx.emit(CatalogEvent::global(
            CatalogObject::User(user.id),
            ChangeAction::Added,
        ));
        self.publish_pending();
        Ok(user)
    }

    pub fn add_adapter(
        &self,
        unique_name: &str,
        adapter_name: &str,
        adapter_type: AdapterType,
        settings: BTreeMap<String, String>,
    ) -> CatalogResult<CatalogAdapter> {
        self.ensure_ready()?;
        check_name("adapter", unique_name)?;
        let adapter = self.registry.add_adapter(
            &self.ids,
            unique_name,
            adapter_name,
            adapter_type,
            settings,
        )?;
        self.ctx.emit(CatalogEvent::global(
            CatalogObject::Adapter(adapter.id),
            ChangeAction::Added,
        ));
        self.publish_pending();
        Ok(adapter)
    }

    pub fn update_adapter_settings(
        &self,
        adapter_id: AdapterId,
        settings: BTreeMap<String, String>,
    ) -> CatalogResult<CatalogAdapter> {
        self.ensure_ready()?;
        let adapter = self.registry.update_adapter_settings(adapter_id, settings)?;
        self.ctx.emit(CatalogEvent::global(
            CatalogObject::Adapter(adapter_id),
            ChangeAction::Updated,
        ));
        self.publish_pending();
        Ok(adapter)
    }

    /// Remove an adapter; refused while any namespace still places data on it
    pub fn delete_adapter(&self, adapter_id: AdapterId) -> CatalogResult<()> {
        self.ensure_ready()?;
        {
            let catalogs = self.namespace_list();
            // ascending namespace id, the only order gates are ever nested in
            let _gates: Vec<_> = catalogs.iter().map(|ns| ns.gate.lock()).collect();
            for ns in &catalogs {
                let placements = ns.allocation.provider().placements_on(adapter_id);
                if !placements.is_empty() {
                    return Err(CatalogError::ConstraintViolation(format!(
                        "adapter {} still holds {} placements in namespace '{}'",
                        adapter_id,
                        placements.len(),
                        ns.namespace().name
                    )));
                }
            }
            self.registry.remove_adapter(adapter_id)?;
        }
        self.adapters.remove(&adapter_id);
        self.ctx.emit(CatalogEvent::global(
            CatalogObject::Adapter(adapter_id),
            ChangeAction::Removed,
        ));
        self.publish_pending();
        Ok(())
    }

    // ---- transactions -----------------------------------------------------

    /// Full image of the current state, each namespace imaged under its gate
    pub fn image(&self) -> CatalogImage {
        let header = self.header.lock().clone();
        self.image_with(header)
    }

    fn image_with(&self, header: ImageHeader) -> CatalogImage {
        let namespaces = self
            .namespace_list()
            .iter()
            .map(|ns| {
                let _gate = ns.gate.lock();
                ns.image()
            })
            .collect();
        CatalogImage {
            header,
            registry: self.registry.image(),
            namespaces,
            // after the namespaces so every id in them is below the counters
            ids: self.ids.counters(),
        }
    }

    /// Persist the current state (when configured) and make it the rollback point
    pub fn commit(&self) -> CatalogResult<()> {
        self.ensure_ready()?;
        self.publish_pending();
        if self.config.require_primary_keys {
            self.ensure_primary_keys()?;
        }

        // held until the new header is stored, so concurrent commits get
        // distinct generations
        let mut header = self.header.lock();
        let mut image = self.image_with(header.clone());
        image.header.generation += 1;
        image.header.saved_at = chrono::Utc::now();
        if self.config.should_persist() {
            if let Some(store) = &self.store {
                store.save(&image)?;
            }
        }
        *header = image.header.clone();
        drop(header);
        debug!("Committed catalog generation {}", image.header.generation);
        *self.checkpoint.lock() = image;
        Ok(())
    }

    fn ensure_primary_keys(&self) -> CatalogResult<()> {
        let snapshot = self.snapshot();
        let missing: Vec<_> = snapshot
            .rel()
            .tables(None, None)
            .into_iter()
            .filter(|t| t.entity_type == EntityType::Entity && t.primary_key.is_none())
            .map(|t| t.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(CatalogError::ConstraintViolation(format!(
                "tables without a primary key: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Restore the last committed state. Ids handed out since are not reused.
    pub fn rollback(&self) -> CatalogResult<()> {
        self.ensure_ready()?;
        let checkpoint = self.checkpoint.lock().clone();
        info!(
            "Rolling back catalog to generation {}",
            checkpoint.header.generation
        );
        let publish = self.publisher.events.lock();
        self.install(checkpoint)?;
        while publish.try_recv().is_ok() {}
        self.publisher.rebuild_snapshot();
        Ok(())
    }

    /// Publish what is pending, flush the store and refuse further mutation
    pub fn close(&self) -> CatalogResult<()> {
        if self.state() == CatalogState::Closed {
            return Ok(());
        }
        self.publish_pending();
        if let Some(store) = &self.store {
            store.flush()?;
        }
        self.ctx.mark_closed();
        *self.state.write() = CatalogState::Closed;
        info!("Catalog closed");
        Ok(())
    }

    /// Deep, independent in-memory copy sharing this catalog's id generator
    pub fn copy(&self) -> CatalogResult<Catalog> {
        self.ensure_ready()?;
        let config = CatalogConfig {
            storage_path: None,
            persist_on_commit: false,
            ..self.config.clone()
        };
        let copy = Self::assemble(config, self.ids.clone(), None);
        copy.install(self.image())?;
        copy.mark_ready();
        Ok(copy)
    }

    // ---- physical orchestration -------------------------------------------

    /// Make a runtime adapter available for the registered adapter `adapter_id`
    pub fn attach_adapter(
        &self,
        adapter_id: AdapterId,
        adapter: Arc<dyn PhysicalAdapter>,
    ) -> CatalogResult<()> {
        self.ensure_ready()?;
        if !self.registry.has_adapter(adapter_id) {
            return Err(CatalogError::not_found("adapter", adapter_id));
        }
        self.adapters.insert(adapter_id, adapter);
        debug!("Attached runtime adapter for {}", adapter_id);
        Ok(())
    }

    fn runtime_adapter(&self, adapter_id: AdapterId) -> CatalogResult<Arc<dyn PhysicalAdapter>> {
        self.adapters
            .get(&adapter_id)
            .map(|a| a.value().clone())
            .ok_or_else(|| {
                CatalogError::Adapter(format!("no runtime adapter attached for {}", adapter_id))
            })
    }

    /// Have the allocation's adapter create its storage object and record it
    pub fn materialize(
        &self,
        namespace_id: NamespaceId,
        allocation_id: AllocationId,
    ) -> CatalogResult<PhysicalEntity> {
        self.ensure_ready()?;
        let entry = self.namespace_entry(namespace_id)?;
        let allocation = entry
            .allocation
            .provider()
            .allocation(allocation_id)
            .ok_or_else(|| CatalogError::not_found("allocation", allocation_id))?;
        if entry.physical.physical(allocation_id).is_some() {
            return Err(CatalogError::DuplicateEntry(format!(
                "allocation {} is already materialized",
                allocation_id
            )));
        }
        let adapter = self.runtime_adapter(allocation.adapter_id())?;
        let columns = placed_columns(&entry, allocation.placement_id());

        let created = adapter.create_physical(&entry.namespace(), &allocation, &columns)?;
        let recorded = match entry.physical.add_physical(created) {
            Ok(recorded) => recorded,
            Err(e) => {
                if let Err(undo) = adapter.drop_physical(allocation_id) {
                    warn!(
                        "Could not drop physical entity of allocation {} after failed record: {}",
                        allocation_id, undo
                    );
                }
                return Err(e);
            }
        };
        info!(
            "Materialized allocation {} as '{}.{}'",
            allocation_id, recorded.namespace_name, recorded.name
        );
        self.publish_pending();
        Ok(recorded)
    }

    pub fn drop_physical(
        &self,
        namespace_id: NamespaceId,
        allocation_id: AllocationId,
    ) -> CatalogResult<()> {
        self.ensure_ready()?;
        let entry = self.namespace_entry(namespace_id)?;
        let physical = entry
            .physical
            .physical(allocation_id)
            .ok_or_else(|| CatalogError::not_found("physical entity", allocation_id))?;
        self.runtime_adapter(physical.adapter_id)?
            .drop_physical(allocation_id)?;
        entry.physical.remove_physical(allocation_id)?;
        self.publish_pending();
        Ok(())
    }

    pub fn add_physical_column(
        &self,
        namespace_id: NamespaceId,
        allocation_id: AllocationId,
        column_id: ColumnId,
    ) -> CatalogResult<PhysicalEntity> {
        self.ensure_ready()?;
        let entry = self.namespace_entry(namespace_id)?;
        let mut physical = entry
            .physical
            .physical(allocation_id)
            .ok_or_else(|| CatalogError::not_found("physical entity", allocation_id))?;
        if physical.column(column_id).is_some() {
            return Err(CatalogError::DuplicateEntry(format!(
                "column {} already exists physically in '{}'",
                column_id, physical.name
            )));
        }
        let column = match &entry.logical {
            LogicalCatalog::Relational(logical) => logical
                .column(column_id)
                .ok_or_else(|| CatalogError::not_found("column", column_id))?,
            _ => return Err(mismatch(namespace_id, DataModel::Relational)),
        };

        let added = self
            .runtime_adapter(physical.adapter_id)?
            .add_physical_column(&physical, &column)?;
        physical.columns.push(added);
        let updated = entry.physical.update_physical(physical)?;
        self.publish_pending();
        Ok(updated)
    }

    pub fn drop_physical_column(
        &self,
        namespace_id: NamespaceId,
        allocation_id: AllocationId,
        column_id: ColumnId,
    ) -> CatalogResult<PhysicalEntity> {
        self.ensure_ready()?;
        let entry = self.namespace_entry(namespace_id)?;
        let mut physical = entry
            .physical
            .physical(allocation_id)
            .ok_or_else(|| CatalogError::not_found("physical entity", allocation_id))?;
        if physical.column(column_id).is_none() {
            return Err(CatalogError::not_found("physical column", column_id));
        }

        self.runtime_adapter(physical.adapter_id)?
            .drop_physical_column(&physical, column_id)?;
        physical.columns.retain(|c| c.column_id != column_id);
        let updated = entry.physical.update_physical(physical)?;
        self.publish_pending();
        Ok(updated)
    }

    /// Re-attach the adapter to an object recorded in an earlier run
    pub fn restore_physical(
        &self,
        namespace_id: NamespaceId,
        allocation_id: AllocationId,
    ) -> CatalogResult<PhysicalEntity> {
        self.ensure_ready()?;
        let entry = self.namespace_entry(namespace_id)?;
        let restored = self.restore_in(&entry, allocation_id)?;
        self.publish_pending();
        Ok(restored)
    }

    /// Restore every physical entity recorded for one adapter, e.g. right
    /// after attaching it on startup. Returns how many were restored.
    pub fn restore_adapter(&self, adapter_id: AdapterId) -> CatalogResult<usize> {
        self.ensure_ready()?;
        let mut restored = 0;
        for entry in self.namespace_list() {
            for physical in entry.physical.physicals_on(adapter_id) {
                self.restore_in(&entry, physical.allocation_id)?;
                restored += 1;
            }
        }
        info!("Restored {} physical entities on adapter {}", restored, adapter_id);
        self.publish_pending();
        Ok(restored)
    }

    fn restore_in(
        &self,
        entry: &NamespaceCatalogs,
        allocation_id: AllocationId,
    ) -> CatalogResult<PhysicalEntity> {
        let saved = entry
            .physical
            .physical(allocation_id)
            .ok_or_else(|| CatalogError::not_found("physical entity", allocation_id))?;
        let allocation = entry
            .allocation
            .provider()
            .allocation(allocation_id)
            .ok_or_else(|| CatalogError::not_found("allocation", allocation_id))?;
        let restored = self
            .runtime_adapter(saved.adapter_id)?
            .restore_physical(&allocation, &saved)?;
        if restored != saved {
            entry.physical.update_physical(restored.clone())?;
        }
        Ok(restored)
    }
}

impl Drop for Catalog {
    fn drop(&mut self) {
        if self.state() != CatalogState::Closed {
            if let Err(e) = self.close() {
                warn!("Failed to close catalog cleanly: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("state", &self.state())
            .field("namespaces", &self.publisher.namespaces.read().len())
            .field("store", &self.store)
            .finish()
    }
}

fn mismatch(namespace_id: NamespaceId, expected: DataModel) -> CatalogError {
    CatalogError::NamespaceTypeMismatch {
        namespace_id,
        expected: expected.to_string(),
    }
}

fn ensure_namespace_name_free(
    namespaces: &BTreeMap<NamespaceId, Arc<NamespaceCatalogs>>,
    name: &str,
    except: Option<NamespaceId>,
) -> CatalogResult<()> {
    let taken = namespaces.iter().any(|(id, ns)| {
        Some(*id) != except && ns.namespace.read().name.eq_ignore_ascii_case(name)
    });
    if taken {
        return Err(CatalogError::NameConflict(format!(
            "namespace '{}' already exists",
            name
        )));
    }
    Ok(())
}

/// Logical columns a relational placement holds, in allocation order
fn placed_columns(entry: &NamespaceCatalogs, placement_id: u64) -> Vec<LogicalColumn> {
    match (&entry.logical, &entry.allocation) {
        (LogicalCatalog::Relational(logical), AllocationCatalog::Relational(allocation)) => {
            allocation
                .columns(placement_id)
                .iter()
                .filter_map(|placed| logical.column(placed.column_id))
                .collect()
        }
        _ => Vec::new(),
    }
}
