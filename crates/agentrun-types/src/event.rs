use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A lifecycle event published on the `EventBus` and forwarded by the Event
/// Hub to every live subscriber (spec.md §4.E event set, §4.G).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: Value,
    pub emitted_at: DateTime<Utc>,
}

impl EngineEvent {
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            emitted_at: Utc::now(),
        }
    }
}
