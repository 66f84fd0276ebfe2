//! Authoritative tag taxonomy — three refreshable category lists.
//!
//! The external store is the source of truth for which tags exist. The cache
//! holds the three category lists (Assign To, Assign By, Type) as of the last
//! read and is rebuilt after every successful write and whenever tags or
//! names are about to be validated.

use std::fmt;

use tokio::sync::RwLock;

use crate::store::{StoreError, TaskStore};

/// One of the three independent tag categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyCategory {
    AssignTo,
    AssignBy,
    TaskType,
}

impl TaxonomyCategory {
    /// Human-readable label, as it appears in user-facing messages and in
    /// the store's schema.
    pub fn label(&self) -> &'static str {
        match self {
            TaxonomyCategory::AssignTo => "Assign To",
            TaxonomyCategory::AssignBy => "Assign By",
            TaxonomyCategory::TaskType => "Task Type",
        }
    }
}

impl fmt::Display for TaxonomyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of all three category lists, in store order.
///
/// A category may legitimately be empty (no tags configured externally);
/// that state is distinct from "all submitted tags invalid".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Taxonomy {
    pub assign_to: Vec<String>,
    pub assign_by: Vec<String>,
    pub task_type: Vec<String>,
}

impl Taxonomy {
    pub fn category(&self, category: TaxonomyCategory) -> &[String] {
        match category {
            TaxonomyCategory::AssignTo => &self.assign_to,
            TaxonomyCategory::AssignBy => &self.assign_by,
            TaxonomyCategory::TaskType => &self.task_type,
        }
    }
}

/// Process-wide taxonomy cache.
///
/// Mutated only by the command currently executing; the lock keeps the
/// refresh-then-snapshot sequence sound if a future gateway interleaves
/// commands.
pub struct TaxonomyCache {
    inner: RwLock<Taxonomy>,
}

impl TaxonomyCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Taxonomy::default()),
        }
    }

    /// Rebuild all three category lists from the store's current schema.
    pub async fn refresh(&self, store: &dyn TaskStore) -> Result<(), StoreError> {
        let fresh = store.read_taxonomy().await?;
        *self.inner.write().await = fresh;
        Ok(())
    }

    /// Hand out a snapshot for validation. Stale external changes are not
    /// retroactively enforced — membership is checked at write time only.
    pub async fn snapshot(&self) -> Taxonomy {
        self.inner.read().await.clone()
    }
}

impl Default for TaxonomyCache {
    fn default() -> Self {
        Self::new()
    }
}
