//! In-memory store double.
//!
//! Mirrors the external store's observable behavior for tests and offline
//! runs: it holds snapshots and a taxonomy, and can be told to fail the next
//! write the way a non-200 response would. Like the real store, it enforces
//! nothing — validity is entirely the engine's job.

use std::sync::Mutex;

use super::{StoreError, TaskDraft, TaskSnapshot, TaskStore};
use crate::store::notion::ISO_FORMAT;
use crate::taxonomy::Taxonomy;
use crate::validate::fields::FieldUpdate;

#[derive(Default)]
struct MemoryState {
    tasks: Vec<TaskSnapshot>,
    taxonomy: Taxonomy,
    next_id: u64,
    /// Pending injected failure status for the next write call.
    fail_next: Option<u16>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_taxonomy(taxonomy: Taxonomy) -> Self {
        let store = Self::new();
        store.state.lock().unwrap().taxonomy = taxonomy;
        store
    }

    /// Replace the taxonomy, as if it changed externally.
    pub fn set_taxonomy(&self, taxonomy: Taxonomy) {
        self.state.lock().unwrap().taxonomy = taxonomy;
    }

    /// Make the next write call fail with the given status code.
    pub fn fail_next_write(&self, status: u16) {
        self.state.lock().unwrap().fail_next = Some(status);
    }

    fn take_injected_failure(state: &mut MemoryState) -> Result<(), StoreError> {
        match state.fail_next.take() {
            Some(status) => Err(StoreError::Status(status)),
            None => Ok(()),
        }
    }

    fn position(state: &MemoryState, name: &str) -> Option<usize> {
        let lowered = name.to_lowercase();
        state
            .tasks
            .iter()
            .position(|task| task.name.to_lowercase() == lowered)
    }
}

#[async_trait::async_trait]
impl TaskStore for MemoryStore {
    async fn read_all(&self) -> Result<Vec<TaskSnapshot>, StoreError> {
        Ok(self.state.lock().unwrap().tasks.clone())
    }

    async fn get(&self, name: &str) -> Result<TaskSnapshot, StoreError> {
        let state = self.state.lock().unwrap();
        Self::position(&state, name)
            .map(|index| state.tasks[index].clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn create(&self, draft: &TaskDraft) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        Self::take_injected_failure(&mut state)?;
        state.next_id += 1;
        let url = format!("memory://task/{}", state.next_id);
        state.tasks.push(TaskSnapshot {
            name: draft.name.clone(),
            description: draft.description.clone(),
            date_time: draft.date_time.format(ISO_FORMAT).to_string(),
            assigned_to: draft.assigned_to.clone(),
            assigned_by: draft.assigned_by.clone(),
            task_type: draft.task_type.clone(),
            completion: false,
            url,
        });
        Ok(())
    }

    async fn update(&self, name: &str, update: &FieldUpdate) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        Self::take_injected_failure(&mut state)?;
        let index =
            Self::position(&state, name).ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let task = &mut state.tasks[index];
        match update {
            FieldUpdate::Name(value) => task.name = value.clone(),
            FieldUpdate::Description(value) => task.description = value.clone(),
            FieldUpdate::DateTime(value) => {
                task.date_time = value.format(ISO_FORMAT).to_string();
            }
            FieldUpdate::AssignedTo(tags) => task.assigned_to = tags.clone(),
            FieldUpdate::AssignedBy(tags) => task.assigned_by = tags.clone(),
            FieldUpdate::TaskType(tags) => task.task_type = tags.clone(),
            FieldUpdate::Completion(done) => task.completion = *done,
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        Self::take_injected_failure(&mut state)?;
        let index =
            Self::position(&state, name).ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        state.tasks.remove(index);
        Ok(())
    }

    async fn read_taxonomy(&self) -> Result<Taxonomy, StoreError> {
        Ok(self.state.lock().unwrap().taxonomy.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn draft(name: &str) -> TaskDraft {
        TaskDraft {
            name: name.to_string(),
            description: "desc".to_string(),
            date_time: NaiveDate::from_ymd_opt(2030, 1, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            assigned_to: vec!["Alice".to_string()],
            assigned_by: vec![],
            task_type: vec![],
        }
    }

    #[tokio::test]
    async fn create_then_get_is_case_insensitive() {
        let store = MemoryStore::new();
        store.create(&draft("Report")).await.unwrap();
        let task = store.get("report").await.unwrap();
        assert_eq!(task.name, "Report");
        assert_eq!(task.date_time, "2030-01-01T09:00:00");
        assert!(task.url.starts_with("memory://task/"));
    }

    #[tokio::test]
    async fn injected_failure_hits_exactly_one_write() {
        let store = MemoryStore::new();
        store.fail_next_write(500);
        assert!(matches!(
            store.create(&draft("Report")).await,
            Err(StoreError::Status(500))
        ));
        store.create(&draft("Report")).await.unwrap();
    }

    #[tokio::test]
    async fn update_rewrites_a_single_field() {
        let store = MemoryStore::new();
        store.create(&draft("Report")).await.unwrap();
        store
            .update("report", &FieldUpdate::Completion(true))
            .await
            .unwrap();
        assert!(store.get("Report").await.unwrap().completion);
    }

    #[tokio::test]
    async fn delete_removes_the_task() {
        let store = MemoryStore::new();
        store.create(&draft("Report")).await.unwrap();
        store.delete("REPORT").await.unwrap();
        assert!(matches!(
            store.get("Report").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
