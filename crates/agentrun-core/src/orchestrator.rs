use std::sync::Arc;

use agentrun_providers::Planner;
use agentrun_tools::ToolRegistry;
use agentrun_types::{
    Action, EngineEvent, FinishStatus, MemoryEntry, MemoryEntryType, Observation, Step, Task,
    TaskStatus,
};
use agentrun_memory::MemoryStore;
use serde_json::{json, Value};
use tracing::info;

use crate::executor::Executor;
use crate::policy::SafetyPolicy;
use crate::prompt::build_prompt;
use crate::store::TaskStore;

/// Drives one task through `run` (spec.md §4.E): a cloneable struct over
/// `Arc`-wrapped shared state, an explicit iteration counter, and `tracing`
/// calls at every loop milestone.
#[derive(Clone)]
pub struct Orchestrator {
    store: TaskStore,
    event_bus: crate::event_bus::EventBus,
    memory: MemoryStore,
    tools: ToolRegistry,
    planner: Arc<dyn Planner>,
    executor: Arc<dyn Executor>,
    policy: SafetyPolicy,
}

impl Orchestrator {
    pub fn new(
        store: TaskStore,
        event_bus: crate::event_bus::EventBus,
        memory: MemoryStore,
        tools: ToolRegistry,
        planner: Arc<dyn Planner>,
        executor: Arc<dyn Executor>,
        policy: SafetyPolicy,
    ) -> Self {
        Self {
            store,
            event_bus,
            memory,
            tools,
            planner,
            executor,
            policy,
        }
    }

    pub async fn run(&self, task_id: &str) {
        self.store
            .update(task_id, |t| {
                t.status = TaskStatus::Running;
                t.touch();
            })
            .await;
        self.emit(task_id, "task-started", json!({})).await;
        info!(task_id, event = "task-started");

        for step_index in 0..self.policy.max_steps {
            let Some(task) = self.store.get(task_id).await else {
                return;
            };

            if let Some(outcome) = self.plan_and_act(task_id, &task, step_index).await {
                let _ = outcome;
                return;
            }
        }

        let goal = self.store.get(task_id).await.map(|t| t.goal).unwrap_or_default();
        let observation = Observation::error("Max step count reached without completion.");
        let summary = self.memory.summarise(task_id, &goal, &observation).await;
        self.fail_task(task_id, &summary).await;
    }

    /// Runs steps a-j of one loop iteration. Returns `Some(())` when the
    /// task reached a terminal state and the caller should stop looping.
    async fn plan_and_act(&self, task_id: &str, task: &Task, step_index: usize) -> Option<()> {
        // a. Plan.
        let recent = self.memory.get_recent(task_id, 16).await;
        let tools = self.tools.list().to_vec();
        let prompt = build_prompt(task, &recent, &tools, &self.policy);

        self.emit(task_id, "planning-started", json!({})).await;
        info!(task_id, step_index, event = "planning-started");

        let plan = match self.planner.plan(&prompt).await {
            Ok(plan) => plan,
            Err(e) => {
                self.fail_task(task_id, &e.to_string()).await;
                return Some(());
            }
        };

        self.memory
            .remember(task_id, MemoryEntry::new(MemoryEntryType::Thought, plan.thought.clone()))
            .await;
        self.emit(
            task_id,
            "planning-finished",
            json!({"thought": plan.thought, "action": plan.action, "finish": plan.finish}),
        )
        .await;

        // b. Caution.
        if let Some(caution) = &plan.caution {
            self.memory
                .remember(
                    task_id,
                    MemoryEntry::new(MemoryEntryType::Thought, format!("Safety note: {caution}")),
                )
                .await;
        }

        // c. Finish short-circuit.
        if let Some(finish) = &plan.finish {
            match finish.status {
                FinishStatus::Success => {
                    self.memory
                        .remember(task_id, MemoryEntry::new(MemoryEntryType::Summary, finish.summary.clone()))
                        .await;
                    let summary = finish.summary.clone();
                    self.store
                        .update(task_id, |t| {
                            t.status = TaskStatus::Succeeded;
                            t.summary = Some(summary.clone());
                            t.touch();
                        })
                        .await;
                    self.emit(task_id, "task-completed", json!({"summary": finish.summary})).await;
                }
                FinishStatus::Failed => {
                    self.fail_task(task_id, &finish.summary).await;
                }
            }
            return Some(());
        }

        // d. Missing action.
        let Some(action) = plan.action.clone() else {
            self.fail_task(task_id, "Planner output missing both action and finish.").await;
            return Some(());
        };

        // e. Validate action.
        let outcome = self.tools.validate(&action);
        if !outcome.ok {
            self.fail_task(
                task_id,
                &format!("Action validation failed: {}", outcome.issues.join("; ")),
            )
            .await;
            return Some(());
        }

        // f. Create step.
        let step = Step::new(step_index, action.clone(), plan.thought.clone());
        let step_id = step.id.clone();
        self.store.update(task_id, |t| t.push_step(step.clone())).await;
        self.emit(task_id, "step-created", json!({"step": step})).await;

        // g. Record intent.
        self.memory
            .remember(
                task_id,
                MemoryEntry::new(
                    MemoryEntryType::Action,
                    format!("{} {}", action.kind, serde_json::Value::Object(action.params.clone())),
                ),
            )
            .await;
        self.emit(task_id, "step-executing", json!({"stepId": step_id, "action": action})).await;

        // h. Execute.
        let task_snapshot = self.store.get(task_id).await?;
        let step_snapshot = task_snapshot.steps.last()?.clone();
        let exec_result = match self.executor.execute(&task_snapshot, &step_snapshot, &action).await {
            Ok(result) => result,
            Err(e) => {
                self.memory
                    .remember(task_id, MemoryEntry::new(MemoryEntryType::Observation, format!("ERROR: {e}")))
                    .await;
                self.emit(task_id, "task-error", json!({"error": e.to_string()})).await;
                self.fail_task(task_id, &e.to_string()).await;
                return Some(());
            }
        };

        // i. Finalize step.
        let observation = exec_result.observation.clone();
        self.store
            .update(task_id, |t| {
                if let Some(last) = t.steps.last_mut() {
                    last.finalize(observation.clone());
                }
                t.touch();
            })
            .await;

        let obs_line = if observation.result.is_success() {
            format!("SUCCESS: {}", observation.message)
        } else {
            format!("ERROR: {}", observation.message)
        };
        let mut entry = MemoryEntry::new(MemoryEntryType::Observation, obs_line);
        if let Some(data) = &observation.data {
            entry = entry.with_metadata(data.clone());
        }
        self.memory.remember(task_id, entry).await;
        self.emit(
            task_id,
            "step-updated",
            json!({"stepId": step_id, "observation": observation}),
        )
        .await;

        // j. Terminal observation.
        if exec_result.did_terminate {
            let summary = match exec_result.summary.clone() {
                Some(s) if !s.trim().is_empty() => s,
                _ => self.memory.summarise(task_id, &task_snapshot.goal, &observation).await,
            };

            if observation.result.is_success() {
                self.store
                    .update(task_id, |t| {
                        t.status = TaskStatus::Succeeded;
                        t.summary = Some(summary.clone());
                        t.touch();
                    })
                    .await;
                self.emit(task_id, "task-completed", json!({"summary": summary})).await;
            } else {
                self.fail_task(task_id, &summary).await;
            }
            return Some(());
        }

        None
    }

    async fn fail_task(&self, task_id: &str, message: &str) {
        let message = message.to_string();
        self.store
            .update(task_id, |t| {
                t.status = TaskStatus::Failed;
                t.last_error = Some(message.clone());
                t.summary = Some(message.clone());
                t.touch();
            })
            .await;
        self.emit(task_id, "task-failed", json!({"error": message})).await;
        info!(task_id, event = "task-failed");
    }

    async fn emit(&self, task_id: &str, event_type: &str, mut payload: Value) {
        if let Value::Object(ref mut map) = payload {
            map.insert("taskId".to_string(), Value::String(task_id.to_string()));
        }
        self.event_bus.publish(EngineEvent::new(event_type, payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentrun_providers::PlannerInfo;
    use agentrun_types::{ActionKind, AgentError, ExecutionResult, PlanFinish, PlanOutput};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedPlanner {
        outputs: Mutex<Vec<PlanOutput>>,
    }

    #[async_trait]
    impl Planner for ScriptedPlanner {
        fn info(&self) -> PlannerInfo {
            PlannerInfo {
                id: "scripted".to_string(),
                default_model: "scripted".to_string(),
            }
        }

        async fn plan(&self, _prompt: &str) -> Result<PlanOutput, AgentError> {
            let mut outputs = self.outputs.lock().unwrap();
            if outputs.is_empty() {
                Ok(PlanOutput {
                    thought: "out of script".to_string(),
                    action: None,
                    finish: Some(PlanFinish {
                        status: FinishStatus::Failed,
                        summary: "Ran out of scripted plans.".to_string(),
                    }),
                    caution: None,
                })
            } else {
                Ok(outputs.remove(0))
            }
        }
    }

    struct EchoExecutor;

    #[async_trait]
    impl Executor for EchoExecutor {
        async fn execute(&self, _task: &Task, _step: &Step, action: &Action) -> Result<ExecutionResult, AgentError> {
            if action.kind == ActionKind::Navigate.as_str() {
                Ok(ExecutionResult::new(Observation::success("Navigated.").with_data(
                    [("url".to_string(), action.params.get("url").cloned().unwrap_or_default())]
                        .into_iter()
                        .collect(),
                )))
            } else {
                Ok(ExecutionResult::new(Observation::error("Selector not found.")))
            }
        }
    }

    fn orchestrator(outputs: Vec<PlanOutput>) -> (Orchestrator, TaskStore) {
        let store = TaskStore::new();
        let orchestrator = Orchestrator::new(
            store.clone(),
            crate::event_bus::EventBus::new(),
            MemoryStore::new(),
            ToolRegistry::new(),
            Arc::new(ScriptedPlanner { outputs: Mutex::new(outputs) }),
            Arc::new(EchoExecutor),
            SafetyPolicy::default(),
        );
        (orchestrator, store)
    }

    #[tokio::test]
    async fn happy_path_single_step_succeeds() {
        let outputs = vec![
            PlanOutput {
                thought: "I will open the site".to_string(),
                action: Some(Action {
                    kind: "navigate".to_string(),
                    params: [("url".to_string(), json!("https://example.com"))].into_iter().collect(),
                }),
                finish: None,
                caution: None,
            },
            PlanOutput {
                thought: "Done".to_string(),
                action: None,
                finish: Some(PlanFinish {
                    status: FinishStatus::Success,
                    summary: "Opened example.com".to_string(),
                }),
                caution: None,
            },
        ];
        let (orchestrator, store) = orchestrator(outputs);
        let task = Task::new("Open example.com".to_string(), None);
        let id = task.id.clone();
        store.insert(task).await;

        orchestrator.run(&id).await;

        let task = store.get(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(task.summary.as_deref(), Some("Opened example.com"));
        assert_eq!(task.steps.len(), 1);
        assert_eq!(task.steps[0].status, agentrun_types::StepStatus::Succeeded);
    }

    #[tokio::test]
    async fn invalid_action_fails_without_creating_a_step() {
        let outputs = vec![PlanOutput {
            thought: "click".to_string(),
            action: Some(Action {
                kind: "click".to_string(),
                params: Default::default(),
            }),
            finish: None,
            caution: None,
        }];
        let (orchestrator, store) = orchestrator(outputs);
        let task = Task::new("Click something".to_string(), None);
        let id = task.id.clone();
        store.insert(task).await;

        orchestrator.run(&id).await;

        let task = store.get(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.last_error.as_deref().unwrap().contains("\"selector\""));
        assert!(task.steps.is_empty());
    }

    #[tokio::test]
    async fn non_terminal_executor_error_continues_the_loop() {
        let outputs = vec![
            PlanOutput {
                thought: "click it".to_string(),
                action: Some(Action {
                    kind: "click".to_string(),
                    params: [("selector".to_string(), json!("#missing"))].into_iter().collect(),
                }),
                finish: None,
                caution: None,
            },
            PlanOutput {
                thought: "give up".to_string(),
                action: None,
                finish: Some(PlanFinish {
                    status: FinishStatus::Failed,
                    summary: "Could not click.".to_string(),
                }),
                caution: None,
            },
        ];
        let (orchestrator, store) = orchestrator(outputs);
        let task = Task::new("Click something".to_string(), None);
        let id = task.id.clone();
        store.insert(task).await;

        orchestrator.run(&id).await;

        let task = store.get(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.last_error.as_deref(), Some("Could not click."));
        assert_eq!(task.steps.len(), 1);
        assert_eq!(task.steps[0].status, agentrun_types::StepStatus::Failed);
    }

    /// A stand-in for a real browser-backed `Executor`: checks the policy's
    /// blocked origins itself, the way any concrete Executor is expected to
    /// (spec.md §8: "navigate to a blocked origin ⇒ executor returns a
    /// terminal error observation; task → failed").
    struct PolicyAwareExecutor {
        policy: SafetyPolicy,
    }

    #[async_trait]
    impl Executor for PolicyAwareExecutor {
        async fn execute(&self, _task: &Task, _step: &Step, action: &Action) -> Result<ExecutionResult, AgentError> {
            if action.kind == ActionKind::Navigate.as_str() {
                if let Some(url) = action.params.get("url").and_then(|v| v.as_str()) {
                    if self.policy.is_blocked_origin(url) {
                        return Ok(ExecutionResult::terminal(
                            Observation::error(format!("Navigation to {url} is blocked by policy.")),
                            "blocked origin",
                        ));
                    }
                }
            }
            Ok(ExecutionResult::new(Observation::success("Navigated.")))
        }
    }

    #[tokio::test]
    async fn blocked_origin_navigate_terminates_the_task_as_failed() {
        let policy = SafetyPolicy::default();
        let store = TaskStore::new();
        let outputs = vec![PlanOutput {
            thought: "opening a local file".to_string(),
            action: Some(Action {
                kind: "navigate".to_string(),
                params: [("url".to_string(), json!("file:///etc/passwd"))].into_iter().collect(),
            }),
            finish: None,
            caution: None,
        }];
        let orchestrator = Orchestrator::new(
            store.clone(),
            crate::event_bus::EventBus::new(),
            MemoryStore::new(),
            ToolRegistry::new(),
            Arc::new(ScriptedPlanner { outputs: Mutex::new(outputs) }),
            Arc::new(PolicyAwareExecutor { policy: policy.clone() }),
            policy,
        );
        let task = Task::new("Open a local file".to_string(), None);
        let id = task.id.clone();
        store.insert(task).await;

        orchestrator.run(&id).await;

        let task = store.get(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.steps.len(), 1);
        assert_eq!(task.steps[0].status, agentrun_types::StepStatus::Failed);
    }

    #[tokio::test]
    async fn step_budget_exhaustion_fails_with_synthesized_summary() {
        let mut policy = SafetyPolicy::default();
        policy.max_steps = 2;
        let store = TaskStore::new();
        let looping_action = Action {
            kind: "wait".to_string(),
            params: [("ms".to_string(), json!(1))].into_iter().collect(),
        };
        let outputs: Vec<PlanOutput> = (0..5)
            .map(|_| PlanOutput {
                thought: "waiting".to_string(),
                action: Some(looping_action.clone()),
                finish: None,
                caution: None,
            })
            .collect();
        let orchestrator = Orchestrator::new(
            store.clone(),
            crate::event_bus::EventBus::new(),
            MemoryStore::new(),
            ToolRegistry::new(),
            Arc::new(ScriptedPlanner { outputs: Mutex::new(outputs) }),
            Arc::new(EchoExecutor),
            policy,
        );
        let task = Task::new("loop forever".to_string(), None);
        let id = task.id.clone();
        store.insert(task).await;

        orchestrator.run(&id).await;

        let task = store.get(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.steps.len(), 2);
        assert!(task
            .last_error
            .as_deref()
            .unwrap()
            .contains("Max step count reached without completion."));
    }
}
