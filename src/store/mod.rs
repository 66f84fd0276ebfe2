//! External document store boundary.
//!
//! The store is canonical for task records and for the tag taxonomy; this
//! engine is a stateless-between-requests gate in front of it. The trait is
//! the seam: the production implementation speaks the Notion-style HTTP API
//! ([`notion::NotionStore`]), while tests and offline runs use the in-memory
//! double ([`memory::MemoryStore`]).

pub mod memory;
pub mod notion;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::taxonomy::Taxonomy;
use crate::validate::fields::FieldUpdate;

pub use memory::MemoryStore;
pub use notion::NotionStore;

/// External-store failure. The store offers no finer-grained taxonomy than
/// "not success"; these are operator-facing and never auto-retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-success status code.
    #[error("store returned status {0}")]
    Status(u16),

    /// The store answered 200 but the payload did not have the expected
    /// shape.
    #[error("unexpected store payload: {0}")]
    Payload(String),

    #[error("task not found in store: {0}")]
    NotFound(String),
}

/// A task record as last read from the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSnapshot {
    pub name: String,
    pub description: String,
    /// ISO-8601 local instant, as stored.
    pub date_time: String,
    pub assigned_to: Vec<String>,
    pub assigned_by: Vec<String>,
    pub task_type: Vec<String>,
    pub completion: bool,
    /// Opaque reference assigned by the store; read-only from this engine.
    pub url: String,
}

/// A fully-validated new task, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub name: String,
    pub description: String,
    pub date_time: NaiveDateTime,
    pub assigned_to: Vec<String>,
    pub assigned_by: Vec<String>,
    pub task_type: Vec<String>,
}

/// Boundary contract to the external document store. Success is the store's
/// HTTP 200; anything else surfaces as [`StoreError`].
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Read all task snapshots (full refresh).
    async fn read_all(&self) -> Result<Vec<TaskSnapshot>, StoreError>;

    /// Read one task by name (case-insensitive).
    async fn get(&self, name: &str) -> Result<TaskSnapshot, StoreError>;

    /// Create a new task record.
    async fn create(&self, draft: &TaskDraft) -> Result<(), StoreError>;

    /// Update exactly one field of an existing task.
    async fn update(&self, name: &str, update: &FieldUpdate) -> Result<(), StoreError>;

    /// Delete (archive) a task by name.
    async fn delete(&self, name: &str) -> Result<(), StoreError>;

    /// Read the current authoritative tag lists from the store's schema.
    async fn read_taxonomy(&self) -> Result<Taxonomy, StoreError>;
}
