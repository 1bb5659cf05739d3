use thiserror::Error;

/// Closed error taxonomy (spec.md §7). Each kind carries the propagation
/// policy described there; `status_code` is what `agentrun-server` uses to
/// map a surfaced error to an HTTP response.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Config(String),
    #[error("planner returned unparsable output: {0}")]
    PlannerParse(String),
    #[error("planner output missing both action and finish")]
    PlannerContract,
    #[error("action validation failed: {0}")]
    ActionValidation(String),
    #[error("executor error: {0}")]
    Executor(String),
    #[error("step budget exhausted without completion")]
    StepBudgetExhausted,
}

impl AgentError {
    pub fn status_code(&self) -> u16 {
        match self {
            AgentError::Validation(_) | AgentError::Config(_) => 400,
            _ => 500,
        }
    }
}
