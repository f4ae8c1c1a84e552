//! HTTP surface over the application and listing services.

pub mod error;
pub mod handlers;
pub mod principal;

use crate::error::{Error, Result};
use crate::service::{ApplicationService, ListingService};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub applications: Arc<ApplicationService>,
    pub listing: Arc<ListingService>,
}

impl AppState {
    pub fn new(applications: ApplicationService, listing: ListingService) -> Self {
        AppState {
            applications: Arc::new(applications),
            listing: Arc::new(listing),
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/applications", get(handlers::list_applications))
        .route("/applications/stats", get(handlers::application_stats))
        .route("/applications/submit", post(handlers::submit_application))
        .route("/applications/:id", get(handlers::get_application))
        .route("/applications/:id/approve", post(handlers::approve_application))
        .route("/applications/:id/reject", post(handlers::reject_application))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| Error::Server(format!("Failed to bind {}: {}", bind_addr, e)))?;
    tracing::info!(addr = %bind_addr, "listening");

    axum::serve(listener, create_router(state))
        .await
        .map_err(|e| Error::Server(e.to_string()))
}
