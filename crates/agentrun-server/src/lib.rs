pub mod event_hub;
pub mod http;
pub mod state;

pub use event_hub::EventHub;
pub use http::{app_router, serve};
pub use state::AppState;
