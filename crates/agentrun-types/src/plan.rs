use serde::{Deserialize, Serialize};

use crate::action::Action;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanFinish {
    pub status: FinishStatus,
    pub summary: String,
}

/// The planner's structured output for one loop iteration (spec.md §4.C).
///
/// `action` and `finish` are mutually exclusive in practice but both
/// `Option` at the type level — the Orchestrator, not serde, enforces the
/// "at most one of" contract (spec.md §4.E step d).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutput {
    pub thought: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish: Option<PlanFinish>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caution: Option<String>,
}
