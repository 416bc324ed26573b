//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for the fiscal years screen
//! - Authentication middleware
//! - Error responses

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use periodo_core::fiscal::{Clock, FiscalYearsViewModel, LifecycleManager};
use periodo_shared::JwtService;
use periodo_store::InMemoryPeriodStore;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Lifecycle manager as wired into the API.
pub type FiscalManager = LifecycleManager<InMemoryPeriodStore, Arc<dyn Clock>>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Fiscal lifecycle manager.
    pub manager: Arc<FiscalManager>,
    /// Fiscal years screen state.
    pub view: Arc<RwLock<FiscalYearsViewModel>>,
}

impl AppState {
    /// Builds the state around a store, starting from an empty view.
    #[must_use]
    pub fn new(
        jwt_service: Arc<JwtService>,
        store: Arc<InMemoryPeriodStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let view = FiscalYearsViewModel::new(clock.today());
        Self {
            jwt_service,
            manager: Arc::new(LifecycleManager::new(store, clock)),
            view: Arc::new(RwLock::new(view)),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
