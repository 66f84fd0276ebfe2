//! Pending-deletion registry — the in-memory half of the two-phase delete.
//!
//! A name enters the registry only via an explicit mark on a task the store
//! currently holds (the existence lookup is the dispatcher's job, done
//! against the store, never against registry state). A name leaves only via
//! successful confirmed deletion or an explicit unmark; entries are never
//! silently dropped. Process-lifetime state only — losing it on restart just
//! re-requires the confirmation step, it cannot lose data.

use tokio::sync::Mutex;

/// Names awaiting confirmed deletion, in mark order.
pub struct PendingDeletions {
    inner: Mutex<Vec<String>>,
}

impl PendingDeletions {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }

    /// Mark a name for deletion. Idempotent — re-marking an already-pending
    /// name keeps its original position.
    pub async fn mark(&self, name: &str) {
        let mut names = self.inner.lock().await;
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    /// Remove a name, either after a confirmed external delete succeeded or
    /// as an explicit unmark. Returns whether the name was present.
    pub async fn remove(&self, name: &str) -> bool {
        let mut names = self.inner.lock().await;
        match names.iter().position(|n| n == name) {
            Some(index) => {
                names.remove(index);
                true
            }
            None => false,
        }
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.inner.lock().await.iter().any(|n| n == name)
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Snapshot of all pending names, in mark order.
    pub async fn names(&self) -> Vec<String> {
        self.inner.lock().await.clone()
    }
}

impl Default for PendingDeletions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mark_then_remove_round_trip() {
        let pending = PendingDeletions::new();
        assert!(pending.is_empty().await);

        pending.mark("Report").await;
        assert!(pending.contains("Report").await);
        assert!(!pending.is_empty().await);

        assert!(pending.remove("Report").await);
        assert!(pending.is_empty().await);
    }

    #[tokio::test]
    async fn remove_of_unmarked_name_reports_absence() {
        let pending = PendingDeletions::new();
        pending.mark("Report").await;
        assert!(!pending.remove("Other").await);
        assert!(pending.contains("Report").await);
    }

    #[tokio::test]
    async fn marking_twice_keeps_one_entry_in_order() {
        let pending = PendingDeletions::new();
        pending.mark("A").await;
        pending.mark("B").await;
        pending.mark("A").await;
        assert_eq!(pending.names().await, vec!["A".to_string(), "B".to_string()]);
    }
}
