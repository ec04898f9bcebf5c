//! Factory for building application state from configuration

use std::sync::Arc;
use tracing::info;

use social_presence_core::core::config::format_duration;
use social_presence_core::system::metrics;
use social_presence_core::{Config, ConfiguredStore, PresenceService, Result, StatusStore};

use super::app_state::{AppState, SharedState};

/// Build the shared application state
///
/// Connects to the backend named by `store.backend`. A Redis backend that
/// cannot be reached here fails startup.
pub async fn create_app_state(config: Config) -> Result<SharedState<ConfiguredStore>> {
    let store = ConfiguredStore::from_config(&config.store).await?;
    info!(
        backend = store.backend().as_str(),
        shadow_grace = %format_duration(config.store.shadow_grace),
        call_timeout = %format_duration(config.store.call_timeout),
        "Status store initialized"
    );
    Ok(state_with_store(Arc::new(store), config))
}

/// Build the shared application state around an existing store
pub fn state_with_store<S: StatusStore>(store: Arc<S>, config: Config) -> SharedState<S> {
    if config.metrics.enable_prometheus {
        metrics::init_registry();
    }

    let service = PresenceService::with_store(store, config.store.call_timeout);
    Arc::new(AppState::new(service, config))
}
