//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};
use bahi_core::invoice::InvoiceRepository;

pub mod dashboard;
pub mod health;
pub mod invoices;

/// Creates the API router with public and protected routes.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state<R: InvoiceRepository + 'static>(
    state: AppState<R>,
) -> Router<AppState<R>> {
    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(invoices::routes::<R>())
        .merge(dashboard::routes::<R>())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<R>,
        ));

    Router::new()
        .merge(health::routes::<R>())
        .merge(protected_routes)
}
