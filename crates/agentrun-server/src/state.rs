use agentrun_runtime::Runtime;

use crate::event_hub::EventHub;

#[derive(Clone)]
pub struct AppState {
    pub runtime: Runtime,
    pub hub: EventHub,
}

impl AppState {
    pub fn new(runtime: Runtime) -> Self {
        let hub = EventHub::new(runtime.clone());
        Self { runtime, hub }
    }
}
