//! Application wiring
//!
//! Shared state handed to every request handler, the factory that builds
//! it from configuration, and logging setup.

pub mod app_state;
pub mod factory;
pub mod logging;

// Re-export commonly used items
pub use app_state::{AppState, SharedState};
pub use factory::{create_app_state, state_with_store};
pub use logging::init_logging;
