//! Request Gateway - HTTP/JSON and WebSocket surface over the registries

pub mod error;
pub mod handlers;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::connection::ConnectionRegistry;
use crate::events::EventBus;
use crate::profile::ProfileStore;

pub use error::{ApiError, ErrorResponse};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub connections: ConnectionRegistry,
    pub profiles: ProfileStore,
    pub events: EventBus,
}

/// Build the gateway router
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health_check))
        // Connections
        .route("/connections", get(handlers::list_connections))
        .route("/connections/{id}", get(handlers::get_connection))
        .route("/connections/{id}/connect", post(handlers::connect))
        .route("/connections/{id}/disconnect", post(handlers::disconnect))
        .route("/connections/{id}/cancel", post(handlers::cancel))
        // Profiles
        .route(
            "/profiles",
            get(handlers::list_profiles).post(handlers::create_profile),
        )
        .route(
            "/profiles/{id}",
            get(handlers::get_profile)
                .put(handlers::update_profile)
                .delete(handlers::delete_profile),
        )
        // Events
        .route("/ws", get(ws::events_ws));

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
