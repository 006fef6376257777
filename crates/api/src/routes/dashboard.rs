//! Dashboard routes.

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use serde::Serialize;

use crate::{AppState, error::ApiError, middleware::AuthUser};
use bahi_core::dashboard::PartySummary;
use bahi_core::invoice::InvoiceRepository;

/// Creates the dashboard routes (requires auth middleware to be applied externally).
pub fn routes<R: InvoiceRepository + 'static>() -> Router<AppState<R>> {
    Router::new().route("/dashboard", get(get_summary::<R>))
}

/// Response for the party summary.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    /// Receivables, payables and sales for the caller.
    pub summary: PartySummary,
}

/// GET `/dashboard`
async fn get_summary<R: InvoiceRepository + 'static>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
) -> Result<Json<SummaryResponse>, ApiError> {
    let summary = state
        .invoice_service
        .summary(&auth.principal(), Utc::now().date_naive())
        .await?;
    Ok(Json(SummaryResponse { summary }))
}
