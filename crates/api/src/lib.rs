//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for invoices, payments and the party dashboard
//! - Bearer-token authentication middleware
//! - Error to response mapping

pub mod error;
pub mod middleware;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bahi_core::invoice::{InvoiceRepository, InvoiceService};
use bahi_shared::JwtService;

/// Application state shared across handlers.
pub struct AppState<R: InvoiceRepository> {
    /// Invoice lifecycle service.
    pub invoice_service: Arc<InvoiceService<R>>,
    /// JWT service for token verification.
    pub jwt_service: Arc<JwtService>,
}

// Manual impl: `R` itself need not be `Clone`.
impl<R: InvoiceRepository> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            invoice_service: Arc::clone(&self.invoice_service),
            jwt_service: Arc::clone(&self.jwt_service),
        }
    }
}

impl<R: InvoiceRepository> AppState<R> {
    /// Builds the state from a service and token verifier.
    #[must_use]
    pub fn new(invoice_service: InvoiceService<R>, jwt_service: JwtService) -> Self {
        Self {
            invoice_service: Arc::new(invoice_service),
            jwt_service: Arc::new(jwt_service),
        }
    }
}

/// Creates the main application router.
pub fn create_router<R: InvoiceRepository + 'static>(state: AppState<R>) -> Router {
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
