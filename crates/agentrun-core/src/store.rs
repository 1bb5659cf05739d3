use std::collections::HashMap;
use std::sync::Arc;

use agentrun_types::Task;
use tokio::sync::RwLock;

pub type TaskId = String;

/// The `taskId → Task` map from spec.md §4.F, shared between the Runtime's
/// scheduler and the Orchestrator loop that mutates one task at a time.
#[derive(Clone, Default)]
pub struct TaskStore {
    inner: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, task: Task) {
        self.inner.write().await.insert(task.id.clone(), task);
    }

    pub async fn get(&self, id: &str) -> Option<Task> {
        self.inner.read().await.get(id).cloned()
    }

    /// Reverse-chronological by `created_at`, per spec.md §4.F `listTasks`.
    pub async fn list(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.inner.read().await.values().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    pub async fn update<F>(&self, id: &str, mutate: F)
    where
        F: FnOnce(&mut Task),
    {
        if let Some(task) = self.inner.write().await.get_mut(id) {
            mutate(task);
        }
    }

    pub async fn count_running(&self) -> usize {
        self.inner
            .read()
            .await
            .values()
            .filter(|t| t.status == agentrun_types::TaskStatus::Running)
            .count()
    }
}
