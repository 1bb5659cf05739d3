use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemoryEntryType {
    Thought,
    Action,
    Observation,
    Summary,
}

impl MemoryEntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            MemoryEntryType::Thought => "THOUGHT",
            MemoryEntryType::Action => "ACTION",
            MemoryEntryType::Observation => "OBSERVATION",
            MemoryEntryType::Summary => "SUMMARY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    #[serde(rename = "type")]
    pub entry_type: MemoryEntryType,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl MemoryEntry {
    pub fn new(entry_type: MemoryEntryType, content: impl Into<String>) -> Self {
        Self {
            entry_type,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// `"<ISO-8601> <TYPE> <content>"` — the line format the Orchestrator
    /// feeds the Planner when assembling the recent-memory window.
    pub fn as_prompt_line(&self) -> String {
        format!(
            "{} {} {}",
            self.timestamp.to_rfc3339(),
            self.entry_type.as_str(),
            self.content
        )
    }
}
