//! RagDesk server: HTTP surface over the salary/insurance coordinator.

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::{generation_options, load_knowledge, resolve_generator, AppState};
