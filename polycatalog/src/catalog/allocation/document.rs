// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Allocation catalog of a document namespace

use super::{AllocationCore, AllocationProvider};

/// Collections are placed as a whole; there are no allocation columns
pub struct DocumentAllocationCatalog {
    core: AllocationCore,
}

impl DocumentAllocationCatalog {
    pub(crate) fn from_core(core: AllocationCore) -> Self {
        Self { core }
    }

    pub fn copy(&self) -> Self {
        Self::from_core(self.core.copy())
    }
}

impl AllocationProvider for DocumentAllocationCatalog {
    fn core(&self) -> &AllocationCore {
        &self.core
    }
}
