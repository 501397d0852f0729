// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Identifier generation
//!
//! One monotonic counter per identifier class. Ids are never handed out twice,
//! not even after a rollback or a restart, because restoring counters can only
//! raise them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub type NamespaceId = u64;
pub type EntityId = u64;
pub type ColumnId = u64;
pub type KeyId = u64;
pub type ConstraintId = u64;
pub type IndexId = u64;
pub type AdapterId = u64;
pub type UserId = u64;
pub type PlacementId = u64;
pub type PartitionId = u64;
pub type PartitionGroupId = u64;
pub type AllocationId = u64;
pub type SnapshotId = u64;

/// Identifier classes handed out by [`IdGenerator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdKind {
    Namespace,
    Entity,
    Column,
    Key,
    Constraint,
    Index,
    Adapter,
    User,
    Placement,
    Partition,
    PartitionGroup,
    Allocation,
    Snapshot,
}

impl IdKind {
    pub const ALL: [IdKind; 13] = [
        IdKind::Namespace,
        IdKind::Entity,
        IdKind::Column,
        IdKind::Key,
        IdKind::Constraint,
        IdKind::Index,
        IdKind::Adapter,
        IdKind::User,
        IdKind::Placement,
        IdKind::Partition,
        IdKind::PartitionGroup,
        IdKind::Allocation,
        IdKind::Snapshot,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IdKind::Namespace => "namespace",
            IdKind::Entity => "entity",
            IdKind::Column => "column",
            IdKind::Key => "key",
            IdKind::Constraint => "constraint",
            IdKind::Index => "index",
            IdKind::Adapter => "adapter",
            IdKind::User => "user",
            IdKind::Placement => "placement",
            IdKind::Partition => "partition",
            IdKind::PartitionGroup => "partition_group",
            IdKind::Allocation => "allocation",
            IdKind::Snapshot => "snapshot",
        };
        write!(f, "{}", s)
    }
}

/// Persisted form of the generator: the next id of every class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounters {
    pub next: Vec<(IdKind, u64)>,
}

impl IdCounters {
    pub fn get(&self, kind: IdKind) -> u64 {
        self.next
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, v)| *v)
            .unwrap_or(0)
    }
}

/// Process-wide id source, shared through the catalog context
#[derive(Debug)]
pub struct IdGenerator {
    counters: [AtomicU64; 13],
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            counters: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Build a generator that continues after the persisted counters
    pub fn from_counters(counters: &IdCounters) -> Self {
        let generator = Self::new();
        generator.restore(counters);
        generator
    }

    pub fn next_id(&self, kind: IdKind) -> u64 {
        self.counters[kind.slot()].fetch_add(1, Ordering::SeqCst)
    }

    /// Next id without consuming it
    pub fn peek(&self, kind: IdKind) -> u64 {
        self.counters[kind.slot()].load(Ordering::SeqCst)
    }

    pub fn counters(&self) -> IdCounters {
        IdCounters {
            next: IdKind::ALL
                .iter()
                .map(|kind| (*kind, self.peek(*kind)))
                .collect(),
        }
    }

    /// Raise every counter to at least the persisted value; never lowers one.
    pub fn restore(&self, counters: &IdCounters) {
        for (kind, next) in &counters.next {
            self.counters[kind.slot()].fetch_max(*next, Ordering::SeqCst);
        }
    }

    pub fn next_namespace_id(&self) -> NamespaceId {
        self.next_id(IdKind::Namespace)
    }

    pub fn next_entity_id(&self) -> EntityId {
        self.next_id(IdKind::Entity)
    }

    pub fn next_column_id(&self) -> ColumnId {
        self.next_id(IdKind::Column)
    }

    pub fn next_key_id(&self) -> KeyId {
        self.next_id(IdKind::Key)
    }

    pub fn next_constraint_id(&self) -> ConstraintId {
        self.next_id(IdKind::Constraint)
    }

    pub fn next_index_id(&self) -> IndexId {
        self.next_id(IdKind::Index)
    }

    pub fn next_adapter_id(&self) -> AdapterId {
        self.next_id(IdKind::Adapter)
    }

    pub fn next_user_id(&self) -> UserId {
        self.next_id(IdKind::User)
    }

    pub fn next_placement_id(&self) -> PlacementId {
        self.next_id(IdKind::Placement)
    }

    pub fn next_partition_id(&self) -> PartitionId {
        self.next_id(IdKind::Partition)
    }

    pub fn next_partition_group_id(&self) -> PartitionGroupId {
        self.next_id(IdKind::PartitionGroup)
    }

    pub fn next_allocation_id(&self) -> AllocationId {
        self.next_id(IdKind::Allocation)
    }

    pub fn next_snapshot_id(&self) -> SnapshotId {
        self.next_id(IdKind::Snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counters_are_independent_per_kind() {
        let ids = IdGenerator::new();
        assert_eq!(ids.next_entity_id(), 0);
        assert_eq!(ids.next_entity_id(), 1);
        assert_eq!(ids.next_column_id(), 0);
        assert_eq!(ids.peek(IdKind::Entity), 2);
    }

    #[test]
    fn test_restore_never_lowers_counters() {
        let ids = IdGenerator::new();
        for _ in 0..10 {
            ids.next_key_id();
        }
        let stale = IdCounters {
            next: vec![(IdKind::Key, 3), (IdKind::Index, 7)],
        };
        ids.restore(&stale);
        assert_eq!(ids.next_key_id(), 10);
        assert_eq!(ids.next_index_id(), 7);
    }

    #[test]
    fn test_counters_round_trip() {
        let ids = IdGenerator::new();
        ids.next_namespace_id();
        ids.next_allocation_id();
        ids.next_allocation_id();
        let restored = IdGenerator::from_counters(&ids.counters());
        assert_eq!(restored.next_namespace_id(), 1);
        assert_eq!(restored.next_allocation_id(), 2);
    }

    #[test]
    fn test_concurrent_ids_are_unique() {
        let ids = Arc::new(IdGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = ids.clone();
                thread::spawn(move || (0..500).map(|_| ids.next_column_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "id {} handed out twice", id);
            }
        }
        assert_eq!(seen.len(), 4000);
    }
}
