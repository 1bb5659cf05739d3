use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Navigate,
    Click,
    Type,
    Wait,
    Scroll,
    Extract,
    Finish,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Navigate => "navigate",
            ActionKind::Click => "click",
            ActionKind::Type => "type",
            ActionKind::Wait => "wait",
            ActionKind::Scroll => "scroll",
            ActionKind::Extract => "extract",
            ActionKind::Finish => "finish",
        }
    }

    pub const ALL: [ActionKind; 7] = [
        ActionKind::Navigate,
        ActionKind::Click,
        ActionKind::Type,
        ActionKind::Wait,
        ActionKind::Scroll,
        ActionKind::Extract,
        ActionKind::Finish,
    ];
}

impl std::str::FromStr for ActionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObservationResult {
    Success,
    Error,
}

impl ObservationResult {
    pub fn is_success(self) -> bool {
        matches!(self, ObservationResult::Success)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub result: ObservationResult,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl Observation {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            result: ObservationResult::Success,
            message: message.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: ObservationResult::Error,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }
}

/// Result of one `Executor::execute` call. Mirrors the
/// `{ observation, didTerminate?, summary? }` contract of spec.md §4.D.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub observation: Observation,
    #[serde(default)]
    pub did_terminate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ExecutionResult {
    pub fn new(observation: Observation) -> Self {
        Self {
            observation,
            did_terminate: false,
            summary: None,
        }
    }

    pub fn terminal(observation: Observation, summary: impl Into<String>) -> Self {
        Self {
            observation,
            did_terminate: true,
            summary: Some(summary.into()),
        }
    }
}
