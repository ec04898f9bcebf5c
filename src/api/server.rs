//! HTTP server implementation for the Social Presence API

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post, put},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use social_presence_core::StatusStore;

use super::handlers;
use crate::core::SharedState;

/// Creates the main application router with all routes and middleware
pub fn create_app<S: StatusStore>(state: SharedState<S>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_origin(Any);

    let metrics_enabled = state.config.metrics.enable_prometheus;

    let mut router = Router::new()
        // Root route
        .route("/", get(handlers::root_handler))

        // Bulk status
        .route("/api/v1/users/status", get(handlers::get_multiple::<S>))

        // Single-user status
        .route(
            "/api/v1/users/:id/status",
            post(handlers::set_status::<S>).get(handlers::get_status::<S>),
        )
        .route("/api/v1/users/:id/status/public", get(handlers::get_public_status::<S>))
        .route("/api/v1/users/:id/heartbeat", post(handlers::heartbeat::<S>))

        // Status shortcuts
        .route("/api/v1/users/:id/status/away", put(handlers::set_away::<S>))
        .route("/api/v1/users/:id/status/offline", put(handlers::set_offline::<S>))
        .route("/api/v1/users/:id/status/invisible", put(handlers::set_invisible::<S>))
        .route("/api/v1/users/:id/status/dnd", put(handlers::set_dnd::<S>))

        // System routes
        .route("/health", get(handlers::health_check::<S>));

    if metrics_enabled {
        router = router.route("/metrics", get(handlers::metrics_handler));
    }

    router
        // Apply middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Start the HTTP server and run until `shutdown` resolves
pub async fn start_server<S, F>(
    addr: SocketAddr,
    state: SharedState<S>,
    shutdown: F,
) -> std::io::Result<()>
where
    S: StatusStore,
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!("Starting Social Presence API server on {}", addr);

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    tracing::info!("Health check available at http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
