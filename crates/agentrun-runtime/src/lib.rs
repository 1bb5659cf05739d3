//! The Runtime (spec.md §4.F): task store ownership, FIFO queue, and the
//! bounded-concurrency scheduler. Orchestration itself lives in
//! `agentrun-core`; this crate is the part that decides *when* an
//! orchestration gets to run.
//!
//! The concurrency bound is a `tokio::sync::Semaphore` sized to
//! `max_parallel_tasks`, the same shape used for agent concurrency limits
//! in other DAG-style orchestrators in this ecosystem (a bare
//! `Semaphore::new(config.max_agents)` gate around spawned work).

use std::collections::VecDeque;
use std::sync::Arc;

use agentrun_core::{DefaultExecutor, EventBus, Executor, Orchestrator, SafetyPolicy, TaskStore};
use agentrun_memory::MemoryStore;
use agentrun_providers::Planner;
use agentrun_tools::ToolRegistry;
use agentrun_types::{AgentError, EngineEvent, Task, TaskContext};
use serde_json::json;
use tokio::sync::{Mutex, RwLock, Semaphore};

#[derive(Clone)]
pub struct Runtime {
    store: TaskStore,
    event_bus: EventBus,
    memory: MemoryStore,
    tools: ToolRegistry,
    planner: Option<Arc<dyn Planner>>,
    executor: Arc<RwLock<Arc<dyn Executor>>>,
    policy: SafetyPolicy,
    queue: Arc<Mutex<VecDeque<String>>>,
    semaphore: Arc<Semaphore>,
}

impl Runtime {
    pub fn new(
        event_bus: EventBus,
        memory: MemoryStore,
        tools: ToolRegistry,
        planner: Option<Arc<dyn Planner>>,
        policy: SafetyPolicy,
    ) -> Self {
        let permits = policy.max_parallel_tasks.max(1);
        Self {
            store: TaskStore::new(),
            event_bus,
            memory,
            tools,
            planner,
            executor: Arc::new(RwLock::new(Arc::new(DefaultExecutor))),
            policy,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub async fn register_executor(&self, executor: Arc<dyn Executor>) {
        *self.executor.write().await = executor;
    }

    /// Rejects an empty/whitespace goal with `ValidationError`, and an
    /// unconfigured planner with `ConfigError`, per spec.md §4.F.
    pub async fn create_task(&self, goal: String, context: Option<TaskContext>) -> Result<Task, AgentError> {
        if goal.trim().is_empty() {
            return Err(AgentError::Validation("Goal must not be empty.".to_string()));
        }
        if self.planner.is_none() {
            return Err(AgentError::Config(
                "No model provider configured; set AGENT_MODEL_PROVIDER and the matching API key.".to_string(),
            ));
        }

        let task = Task::new(goal, context);
        let task_id = task.id.clone();
        self.store.insert(task.clone()).await;
        self.event_bus
            .publish(EngineEvent::new("task-created", json!({"taskId": task_id, "task": task})));

        self.queue.lock().await.push_back(task_id.clone());
        self.try_drain().await;

        Ok(self.store.get(&task_id).await.expect("task just inserted"))
    }

    pub async fn get_task(&self, id: &str) -> Option<Task> {
        self.store.get(id).await
    }

    pub async fn list_tasks(&self) -> Vec<Task> {
        self.store.list().await
    }

    /// Shallow merge into `context`; emits `task-updated`.
    pub async fn update_task_context(&self, id: &str, patch: TaskContext) {
        self.store
            .update(id, |t| {
                let mut merged = t.context.clone().unwrap_or_default();
                if patch.url.is_some() {
                    merged.url = patch.url;
                }
                if patch.title.is_some() {
                    merged.title = patch.title;
                }
                if patch.description.is_some() {
                    merged.description = patch.description;
                }
                if patch.html_excerpt.is_some() {
                    merged.html_excerpt = patch.html_excerpt;
                }
                t.context = Some(merged);
                t.touch();
            })
            .await;
        self.event_bus
            .publish(EngineEvent::new("task-updated", json!({"taskId": id})));
    }

    /// While capacity is available and the queue is non-empty, pop the head
    /// and spawn a concurrent orchestration. Never skips queue entries
    /// (strict FIFO) and is called again after every completion.
    async fn try_drain(&self) {
        loop {
            let permit = match Arc::clone(&self.semaphore).try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let task_id = {
                let mut queue = self.queue.lock().await;
                queue.pop_front()
            };

            let Some(task_id) = task_id else {
                drop(permit);
                return;
            };

            tracing::debug!(task_id = %task_id, "runtime acquired a scheduler permit");
            self.spawn_orchestration(task_id, permit);
        }
    }

    fn spawn_orchestration(&self, task_id: String, permit: tokio::sync::OwnedSemaphorePermit) {
        let runtime = self.clone();
        tokio::spawn(async move {
            let executor = runtime.executor.read().await.clone();
            let planner = runtime
                .planner
                .clone()
                .expect("planner must be configured for a task to have been enqueued");
            let orchestrator = Orchestrator::new(
                runtime.store.clone(),
                runtime.event_bus.clone(),
                runtime.memory.clone(),
                runtime.tools.clone(),
                planner,
                executor,
                runtime.policy.clone(),
            );

            let run_id = task_id.clone();
            let handle = tokio::spawn(async move { orchestrator.run(&run_id).await });

            if handle.await.is_err() {
                let message = "Orchestrator task panicked.".to_string();
                runtime
                    .store
                    .update(&task_id, |t| {
                        t.status = agentrun_types::TaskStatus::Failed;
                        t.last_error = Some(message.clone());
                        t.summary = Some(message.clone());
                        t.touch();
                    })
                    .await;
                runtime
                    .event_bus
                    .publish(EngineEvent::new("task-failed", json!({"taskId": task_id, "error": message})));
                tracing::warn!(task_id = %task_id, "orchestrator task panicked");
            }

            tracing::debug!(task_id = %task_id, "runtime releasing scheduler permit");
            drop(permit);
            runtime.try_drain().await;
        });
    }
}
