// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Allocation catalog of a graph namespace

use super::{AllocationCore, AllocationProvider};

pub struct GraphAllocationCatalog {
    core: AllocationCore,
}

impl GraphAllocationCatalog {
    pub(crate) fn from_core(core: AllocationCore) -> Self {
        Self { core }
    }

    pub fn copy(&self) -> Self {
        Self::from_core(self.core.copy())
    }
}

impl AllocationProvider for GraphAllocationCatalog {
    fn core(&self) -> &AllocationCore {
        &self.core
    }
}
