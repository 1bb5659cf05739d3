use tokio::sync::broadcast;

use agentrun_runtime::Runtime;
use agentrun_types::EngineEvent;

/// The Event Hub (spec.md §4.G). Wraps the Runtime's `EventBus` 1:1 —
/// `tokio::sync::broadcast` already gives per-subscriber best-effort
/// delivery and drops a subscriber's receiver on disconnect, so the Hub
/// adds exactly one thing beyond the bus: the snapshot sent on subscribe.
#[derive(Clone)]
pub struct EventHub {
    runtime: Runtime,
}

impl EventHub {
    pub fn new(runtime: Runtime) -> Self {
        Self { runtime }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.runtime.event_bus().subscribe()
    }

    /// `{type: "snapshot", payload: {tasks, tools}}` — sent once, immediately
    /// after subscription, before any live event.
    pub async fn snapshot(&self) -> serde_json::Value {
        let tasks = self.runtime.list_tasks().await;
        let tools = self.runtime.tools().list().to_vec();
        serde_json::json!({"type": "snapshot", "payload": {"tasks": tasks, "tools": tools}})
    }
}
