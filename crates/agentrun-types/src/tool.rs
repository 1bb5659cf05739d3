use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecution {
    pub invokes_executor: bool,
    pub expected_latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub schema: BTreeMap<String, ParamSpec>,
    pub execution: ToolExecution,
    #[serde(default)]
    pub safety_notes: Vec<String>,
}

impl ToolDefinition {
    pub fn required_params(&self) -> impl Iterator<Item = &str> {
        self.schema
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
    }
}
