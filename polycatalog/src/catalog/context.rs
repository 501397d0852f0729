// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared state handed to every catalog component at construction

use super::error::{CatalogError, CatalogResult};
use super::events::CatalogEvent;
use super::id::{AllocationId, ColumnId, EntityId, IdGenerator};
use super::registry::CatalogRegistry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Weak};

/// Serialises multi-map edits of one namespace against each other and against
/// the snapshot builder.
pub type WriteGate = Arc<Mutex<()>>;

pub fn new_write_gate() -> WriteGate {
    Arc::new(Mutex::new(()))
}

/// Turns pending change events into a new snapshot
pub trait PublishChanges: Send + Sync {
    fn publish_pending(&self);
}

/// Holds a namespace write gate. Dropping it releases the gate first and then
/// publishes, so a mutation is visible to `snapshot()` once it has returned.
pub struct WriteGuard<'a> {
    gate: Option<MutexGuard<'a, ()>>,
    ctx: &'a CatalogContext,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        drop(self.gate.take());
        self.ctx.publish();
    }
}

/// Injected dependencies of the per-namespace catalogs
#[derive(Clone)]
pub struct CatalogContext {
    ids: Arc<IdGenerator>,
    events: Sender<CatalogEvent>,
    closed: Arc<AtomicBool>,
    /// Set when the catalogs built on this context were replaced or removed
    retired: Arc<AtomicBool>,
    registry: Arc<CatalogRegistry>,
    publisher: Option<Weak<dyn PublishChanges>>,
}

impl CatalogContext {
    pub fn new(
        ids: Arc<IdGenerator>,
        events: Sender<CatalogEvent>,
        registry: Arc<CatalogRegistry>,
    ) -> Self {
        Self {
            ids,
            events,
            closed: Arc::new(AtomicBool::new(false)),
            retired: Arc::new(AtomicBool::new(false)),
            registry,
            publisher: None,
        }
    }

    pub fn with_publisher(mut self, publisher: Weak<dyn PublishChanges>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Same ids and registry, but events go nowhere and closing the original
    /// does not close the copy.
    pub fn detached(&self) -> Self {
        let (events, _) = std::sync::mpsc::channel();
        Self {
            ids: self.ids.clone(),
            events,
            closed: Arc::new(AtomicBool::new(false)),
            retired: Arc::new(AtomicBool::new(false)),
            registry: self.registry.clone(),
            publisher: None,
        }
    }

    /// Context for the catalogs of one namespace; shares everything but can be
    /// retired on its own
    pub fn for_namespace(&self) -> Self {
        Self {
            retired: Arc::new(AtomicBool::new(false)),
            ..self.clone()
        }
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    pub fn registry(&self) -> &CatalogRegistry {
        &self.registry
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Caller holds the namespace gate, so no write is in flight
    pub fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
    }

    pub fn ensure_open(&self) -> CatalogResult<()> {
        if self.is_closed() {
            return Err(CatalogError::CatalogClosed);
        }
        Ok(())
    }

    /// Take the namespace write gate, refusing when the catalog is closed or
    /// the namespace catalogs behind this context were replaced
    pub fn begin_write<'a>(&'a self, gate: &'a WriteGate) -> CatalogResult<WriteGuard<'a>> {
        self.ensure_open()?;
        let guard = gate.lock();
        if self.retired.load(Ordering::SeqCst) {
            return Err(CatalogError::StaleHandle);
        }
        Ok(WriteGuard {
            gate: Some(guard),
            ctx: self,
        })
    }

    fn publish(&self) {
        if let Some(publisher) = self.publisher.as_ref().and_then(Weak::upgrade) {
            publisher.publish_pending();
        }
    }

    pub fn emit(&self, event: CatalogEvent) {
        if let Err(e) = self.events.send(event) {
            // Detached copies have nobody listening
            log::debug!("Dropped catalog event {:?}", e.0);
        }
    }
}

/// Counts references from a lower layer into the layer above it.
///
/// The allocation catalog of a namespace counts its references to logical
/// entities and columns, the physical catalog its references to allocations.
/// The referenced layer consults the counts before deleting. All of them run
/// under the same write gate.
#[derive(Debug, Default)]
pub struct ReferenceTracker {
    entities: DashMap<EntityId, usize>,
    columns: DashMap<ColumnId, usize>,
    allocations: DashMap<AllocationId, usize>,
}

impl ReferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retain_entity(&self, id: EntityId) {
        *self.entities.entry(id).or_insert(0) += 1;
    }

    pub fn release_entity(&self, id: EntityId) {
        release(&self.entities, id);
    }

    pub fn retain_column(&self, id: ColumnId) {
        *self.columns.entry(id).or_insert(0) += 1;
    }

    pub fn release_column(&self, id: ColumnId) {
        release(&self.columns, id);
    }

    pub fn retain_allocation(&self, id: AllocationId) {
        *self.allocations.entry(id).or_insert(0) += 1;
    }

    pub fn release_allocation(&self, id: AllocationId) {
        release(&self.allocations, id);
    }

    pub fn allocation_refs(&self, id: AllocationId) -> usize {
        self.allocations.get(&id).map_or(0, |r| *r)
    }

    pub fn entity_refs(&self, id: EntityId) -> usize {
        self.entities.get(&id).map_or(0, |r| *r)
    }

    pub fn column_refs(&self, id: ColumnId) -> usize {
        self.columns.get(&id).map_or(0, |r| *r)
    }

    pub fn duplicate(&self) -> Self {
        Self {
            entities: self.entities.clone(),
            columns: self.columns.clone(),
            allocations: self.allocations.clone(),
        }
    }

    pub fn clear(&self) {
        self.entities.clear();
        self.columns.clear();
        self.allocations.clear();
    }
}

fn release(map: &DashMap<u64, usize>, id: u64) {
    let emptied = match map.get_mut(&id) {
        Some(mut count) => {
            *count = count.saturating_sub(1);
            *count == 0
        }
        None => {
            log::warn!("Released reference {} that was never retained", id);
            false
        }
    };
    if emptied {
        map.remove_if(&id, |_, count| *count == 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_counts() {
        let tracker = ReferenceTracker::new();
        tracker.retain_entity(7);
        tracker.retain_entity(7);
        tracker.retain_column(3);
        assert_eq!(tracker.entity_refs(7), 2);
        tracker.release_entity(7);
        tracker.release_entity(7);
        tracker.release_entity(7);
        assert_eq!(tracker.entity_refs(7), 0);
        assert_eq!(tracker.column_refs(3), 1);
        tracker.clear();
        assert_eq!(tracker.column_refs(3), 0);
    }

    #[test]
    fn test_closed_context_refuses_writes() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let ctx = CatalogContext::new(
            Arc::new(IdGenerator::new()),
            tx,
            Arc::new(CatalogRegistry::new()),
        );
        let gate = new_write_gate();
        assert!(ctx.begin_write(&gate).is_ok());
        ctx.mark_closed();
        assert_eq!(
            ctx.begin_write(&gate).err(),
            Some(CatalogError::CatalogClosed)
        );
    }

    #[test]
    fn test_retired_namespace_context_refuses_writes() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let ctx = CatalogContext::new(
            Arc::new(IdGenerator::new()),
            tx,
            Arc::new(CatalogRegistry::new()),
        );
        let ns = ctx.for_namespace();
        let gate = new_write_gate();
        ns.retire();
        assert_eq!(ns.begin_write(&gate).err(), Some(CatalogError::StaleHandle));
        // siblings keep working
        assert!(ctx.begin_write(&gate).is_ok());
        assert!(ctx.for_namespace().begin_write(&gate).is_ok());
    }

    struct Counter(std::sync::atomic::AtomicUsize);

    impl PublishChanges for Counter {
        fn publish_pending(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_write_guard_publishes_after_release() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let counter = Arc::new(Counter(std::sync::atomic::AtomicUsize::new(0)));
        let weak: Weak<Counter> = Arc::downgrade(&counter);
        let ctx = CatalogContext::new(
            Arc::new(IdGenerator::new()),
            tx,
            Arc::new(CatalogRegistry::new()),
        )
        .with_publisher(weak);
        let gate = new_write_gate();
        {
            let _guard = ctx.begin_write(&gate).unwrap();
            assert_eq!(counter.0.load(Ordering::SeqCst), 0);
        }
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(gate.try_lock().is_some());
    }
}
