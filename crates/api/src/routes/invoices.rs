//! Invoice and payment routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{AppState, error::ApiError, middleware::AuthUser};
use bahi_core::invoice::{
    Invoice, InvoiceDraft, InvoiceRepository, Payment, PaymentDraft,
};
use bahi_shared::types::{InvoiceId, PageResponse};

/// Creates the invoice routes (requires auth middleware to be applied externally).
pub fn routes<R: InvoiceRepository + 'static>() -> Router<AppState<R>> {
    Router::new()
        .route("/invoices", get(list_invoices::<R>).post(create_invoice::<R>))
        .route(
            "/invoices/{id}",
            get(get_invoice::<R>).delete(delete_invoice::<R>),
        )
        .route("/invoices/{id}/payments", post(record_payment::<R>))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing invoices.
#[derive(Debug, Default, Deserialize)]
pub struct ListInvoicesQuery {
    /// Page number, 1-based.
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
}

/// Single invoice envelope.
#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    /// The invoice with lines and payments.
    pub invoice: Invoice,
}

/// Response for a recorded payment.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    /// The new payment.
    pub payment: Payment,
    /// The invoice after settlement.
    pub invoice: Invoice,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/invoices`
async fn list_invoices<R: InvoiceRepository + 'static>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<PageResponse<Invoice>>, ApiError> {
    let page = state
        .invoice_service
        .list(&auth.principal(), query.page, query.limit)
        .await?;
    Ok(Json(page))
}

/// POST `/invoices`
async fn create_invoice<R: InvoiceRepository + 'static>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Json(draft): Json<InvoiceDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let invoice = state
        .invoice_service
        .create(draft, &auth.principal())
        .await?;

    info!(
        invoice_id = %invoice.id,
        invoice_number = %invoice.invoice_number,
        amount = %invoice.total_amount,
        user_id = %auth.principal().user_id,
        "Invoice created"
    );
    Ok((StatusCode::CREATED, Json(InvoiceResponse { invoice })))
}

/// GET `/invoices/{id}`
async fn get_invoice<R: InvoiceRepository + 'static>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = state
        .invoice_service
        .get(InvoiceId::new(id), &auth.principal())
        .await?;
    Ok(Json(InvoiceResponse { invoice }))
}

/// DELETE `/invoices/{id}`
async fn delete_invoice<R: InvoiceRepository + 'static>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .invoice_service
        .delete(InvoiceId::new(id), &auth.principal())
        .await?;

    info!(invoice_id = id, user_id = %auth.principal().user_id, "Invoice deleted");
    Ok(Json(json!({ "message": "Invoice deleted successfully" })))
}

/// POST `/invoices/{id}/payments`
async fn record_payment<R: InvoiceRepository + 'static>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(draft): Json<PaymentDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state
        .invoice_service
        .record_payment(InvoiceId::new(id), draft, &auth.principal())
        .await?;

    info!(
        invoice_id = id,
        payment_id = %receipt.payment.id,
        amount = %receipt.payment.amount,
        status = %receipt.invoice.payment_status,
        "Payment recorded"
    );
    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            payment: receipt.payment,
            invoice: receipt.invoice,
        }),
    ))
}
