//! Per-task append-only memory store (spec.md §4.B).
//!
//! There is no retrieval corpus here, no persistence across restarts, and
//! no embeddings — memory is a plain per-task list of entries kept for the
//! lifetime of the process, behind a `RwLock<HashMap<TaskId, Vec<MemoryEntry>>>`.

use std::collections::HashMap;
use std::sync::Arc;

use agentrun_types::{MemoryEntry, MemoryEntryType, Observation};
use tokio::sync::RwLock;

const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Vec<MemoryEntry>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn remember(&self, task_id: &str, entry: MemoryEntry) {
        let mut guard = self.entries.write().await;
        guard.entry(task_id.to_string()).or_default().push(entry);
    }

    /// Last `limit` entries in insertion order; `limit == 0` returns all.
    pub async fn get_recent(&self, task_id: &str, limit: usize) -> Vec<MemoryEntry> {
        let guard = self.entries.read().await;
        let Some(all) = guard.get(task_id) else {
            return Vec::new();
        };
        if limit == 0 || limit >= all.len() {
            all.clone()
        } else {
            all[all.len() - limit..].to_vec()
        }
    }

    /// Builds a textual summary of goal + observation, appends it as a
    /// `summary` entry, and returns it.
    pub async fn summarise(&self, task_id: &str, goal: &str, observation: &Observation) -> String {
        let data = observation
            .data
            .as_ref()
            .map(|d| serde_json::to_string(d).unwrap_or_default())
            .unwrap_or_default();

        let summary = if data.is_empty() {
            format!(
                "Goal: {goal}. Outcome: {:?} — {}",
                observation.result, observation.message
            )
        } else {
            format!(
                "Goal: {goal}. Outcome: {:?} — {}. Data: {data}",
                observation.result, observation.message
            )
        };

        self.remember(task_id, MemoryEntry::new(MemoryEntryType::Summary, summary.clone()))
            .await;
        summary
    }

    pub async fn clear(&self, task_id: &str) {
        self.entries.write().await.remove(task_id);
    }
}

pub const DEFAULT_LIMIT: usize = DEFAULT_RECENT_LIMIT;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_recent_returns_last_n_in_order() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .remember("t1", MemoryEntry::new(MemoryEntryType::Thought, format!("thought {i}")))
                .await;
        }

        let recent = store.get_recent("t1", 2).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "thought 3");
        assert_eq!(recent[1].content, "thought 4");
    }

    #[tokio::test]
    async fn zero_limit_returns_all() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store
                .remember("t1", MemoryEntry::new(MemoryEntryType::Action, format!("a{i}")))
                .await;
        }
        assert_eq!(store.get_recent("t1", 0).await.len(), 3);
    }

    #[tokio::test]
    async fn unknown_task_returns_empty() {
        let store = MemoryStore::new();
        assert!(store.get_recent("missing", 10).await.is_empty());
    }

    #[tokio::test]
    async fn summarise_appends_summary_entry() {
        let store = MemoryStore::new();
        let observation = Observation::success("done");
        let summary = store.summarise("t1", "buy milk", &observation).await;
        assert!(summary.contains("buy milk"));

        let recent = store.get_recent("t1", 1).await;
        assert_eq!(recent.len(), 1);
        assert!(matches!(recent[0].entry_type, MemoryEntryType::Summary));
        assert_eq!(recent[0].content, summary);
    }

    #[tokio::test]
    async fn clear_removes_all_entries_for_task() {
        let store = MemoryStore::new();
        store
            .remember("t1", MemoryEntry::new(MemoryEntryType::Thought, "x"))
            .await;
        store.clear("t1").await;
        assert!(store.get_recent("t1", 0).await.is_empty());
    }

    #[tokio::test]
    async fn memory_is_isolated_per_task() {
        let store = MemoryStore::new();
        store
            .remember("t1", MemoryEntry::new(MemoryEntryType::Thought, "a"))
            .await;
        store
            .remember("t2", MemoryEntry::new(MemoryEntryType::Thought, "b"))
            .await;
        assert_eq!(store.get_recent("t1", 0).await.len(), 1);
        assert_eq!(store.get_recent("t2", 0).await.len(), 1);
    }
}
