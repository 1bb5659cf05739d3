use async_trait::async_trait;

use agentrun_types::{Action, AgentError, ExecutionResult, Observation, Step, Task};

/// The Executor external contract (spec.md §4.D): one `async fn` that
/// returns a `Result`, never panics, never blocks the caller indefinitely.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, task: &Task, step: &Step, action: &Action) -> Result<ExecutionResult, AgentError>;
}

/// Used when no executor is registered. Returns a terminal error
/// observation immediately so tasks never spin waiting on a world that
/// can't be acted on.
pub struct DefaultExecutor;

#[async_trait]
impl Executor for DefaultExecutor {
    async fn execute(&self, _task: &Task, _step: &Step, _action: &Action) -> Result<ExecutionResult, AgentError> {
        Ok(ExecutionResult::terminal(
            Observation::error("No executor registered."),
            "No executor registered.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentrun_types::{ObservationResult, TaskContext};

    #[tokio::test]
    async fn default_executor_always_terminates() {
        let executor = DefaultExecutor;
        let task = Task::new("goal".to_string(), None::<TaskContext>);
        let action = Action {
            kind: "navigate".to_string(),
            params: Default::default(),
        };
        let step = Step::new(0, action.clone(), "thought".to_string());
        let result = executor.execute(&task, &step, &action).await.unwrap();
        assert!(result.did_terminate);
        assert_eq!(result.observation.result, ObservationResult::Error);
    }
}
