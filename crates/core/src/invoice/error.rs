//! Invoice error types.
//!
//! Every failure of an invoice operation maps onto one [`ErrorKind`], which
//! in turn decides the HTTP status and whether the caller may retry.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use bahi_shared::AppError;
use bahi_shared::types::InvoiceId;

/// Broad error category shared by all invoice operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input is malformed or violates a creation rule.
    Validation,
    /// The principal may not perform the operation.
    Authorization,
    /// The invoice does not exist or is not visible to the principal.
    NotFound,
    /// The operation conflicts with current state.
    Conflict,
    /// A payment would exceed the amount due.
    Overpayment,
    /// Storage or other unexpected failure.
    Internal,
}

/// Errors that can occur during invoice operations.
#[derive(Debug, Error)]
pub enum InvoiceError {
    // ========== Validation Errors ==========
    /// Invoice has no line items.
    #[error("Invoice must have at least one line item")]
    EmptyLineItems,

    /// Line description is blank.
    #[error("Line {line}: description is required")]
    BlankDescription {
        /// 1-based line number.
        line: usize,
    },

    /// Line quantity is negative.
    #[error("Line {line}: quantity cannot be negative")]
    NegativeQuantity {
        /// 1-based line number.
        line: usize,
    },

    /// Line rate is negative.
    #[error("Line {line}: rate cannot be negative")]
    NegativeRate {
        /// 1-based line number.
        line: usize,
    },

    /// Line GST rate is not in the rate table.
    #[error("Line {line}: GST rate {rate}% is not recognized")]
    UnrecognizedGstRate {
        /// 1-based line number.
        line: usize,
        /// The rejected percentage.
        rate: i32,
    },

    /// Line quantity, rate or a derived amount does not fit its column.
    #[error("Line {line}: amount exceeds the supported range")]
    AmountOutOfRange {
        /// 1-based line number.
        line: usize,
    },

    /// Invoice totals do not fit the money column.
    #[error("Invoice total exceeds the supported range")]
    TotalOutOfRange,

    /// Issuer and recipient are the same on a non-cash invoice.
    #[error("Issuer and recipient must differ for {0} invoices")]
    SameParties(String),

    /// Due date precedes the invoice date.
    #[error("Due date {due_date} is before invoice date {invoice_date}")]
    DueBeforeInvoiceDate {
        /// Invoice date.
        invoice_date: NaiveDate,
        /// Rejected due date.
        due_date: NaiveDate,
    },

    /// Payment amount is zero, negative or finer than currency precision.
    #[error("Payment amount must be a positive amount with at most 2 decimal places, got {0}")]
    InvalidPaymentAmount(Decimal),

    /// Payment amount does not fit the money column.
    #[error("Payment amount {0} exceeds the supported range")]
    PaymentAmountOutOfRange(Decimal),

    /// Payment reference is longer than the stored column.
    #[error("Payment reference must be at most {max} characters")]
    ReferenceTooLong {
        /// Maximum length in characters.
        max: usize,
    },

    /// Page or limit is zero.
    #[error("Invalid pagination: {0}")]
    InvalidPage(String),

    // ========== Authorization Errors ==========
    /// Principal may not perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    // ========== Lookup Errors ==========
    /// Invoice not found or not visible.
    #[error("Invoice not found: {0}")]
    NotFound(InvoiceId),

    // ========== State Errors ==========
    /// Payment exceeds the outstanding balance.
    #[error("Payment amount {amount} exceeds amount due {amount_due}")]
    Overpayment {
        /// Attempted payment.
        amount: Decimal,
        /// Outstanding balance at the time of the attempt.
        amount_due: Decimal,
    },

    /// Invoice with payments cannot be deleted.
    #[error("Invoice {invoice_id} has {count} payment(s) and cannot be deleted")]
    HasPayments {
        /// The invoice.
        invoice_id: InvoiceId,
        /// Number of recorded payments.
        count: u64,
    },

    /// Generated invoice number already exists.
    #[error("Invoice number {0} already exists, please retry")]
    NumberCollision(String),

    // ========== Storage Errors ==========
    /// Storage failure.
    #[error("Repository error: {0}")]
    Repository(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InvoiceError {
    /// Returns the broad category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyLineItems
            | Self::BlankDescription { .. }
            | Self::NegativeQuantity { .. }
            | Self::NegativeRate { .. }
            | Self::UnrecognizedGstRate { .. }
            | Self::AmountOutOfRange { .. }
            | Self::TotalOutOfRange
            | Self::SameParties(_)
            | Self::DueBeforeInvoiceDate { .. }
            | Self::InvalidPaymentAmount(_)
            | Self::PaymentAmountOutOfRange(_)
            | Self::ReferenceTooLong { .. }
            | Self::InvalidPage(_) => ErrorKind::Validation,
            Self::Forbidden(_) => ErrorKind::Authorization,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::HasPayments { .. } | Self::NumberCollision(_) => ErrorKind::Conflict,
            Self::Overpayment { .. } => ErrorKind::Overpayment,
            Self::Repository(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyLineItems => "EMPTY_LINE_ITEMS",
            Self::BlankDescription { .. } => "BLANK_DESCRIPTION",
            Self::NegativeQuantity { .. } => "NEGATIVE_QUANTITY",
            Self::NegativeRate { .. } => "NEGATIVE_RATE",
            Self::UnrecognizedGstRate { .. } => "UNRECOGNIZED_GST_RATE",
            Self::AmountOutOfRange { .. } => "AMOUNT_OUT_OF_RANGE",
            Self::TotalOutOfRange => "TOTAL_OUT_OF_RANGE",
            Self::SameParties(_) => "SAME_PARTIES",
            Self::DueBeforeInvoiceDate { .. } => "DUE_BEFORE_INVOICE_DATE",
            Self::InvalidPaymentAmount(_) => "INVALID_PAYMENT_AMOUNT",
            Self::PaymentAmountOutOfRange(_) => "PAYMENT_AMOUNT_OUT_OF_RANGE",
            Self::ReferenceTooLong { .. } => "REFERENCE_TOO_LONG",
            Self::InvalidPage(_) => "INVALID_PAGE",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "INVOICE_NOT_FOUND",
            Self::Overpayment { .. } => "OVERPAYMENT",
            Self::HasPayments { .. } => "INVOICE_HAS_PAYMENTS",
            Self::NumberCollision(_) => "INVOICE_NUMBER_COLLISION",
            Self::Repository(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Overpayment => 422,
            ErrorKind::Internal => 500,
        }
    }

    /// Returns true if the caller may retry after re-reading state.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Authorization => Self::Forbidden(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::Overpayment => Self::BusinessRule(message),
            ErrorKind::Internal => match err {
                InvoiceError::Repository(_) => Self::Database(message),
                _ => Self::Internal(message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(InvoiceError::EmptyLineItems.error_code(), "EMPTY_LINE_ITEMS");
        assert_eq!(
            InvoiceError::UnrecognizedGstRate { line: 2, rate: 7 }.error_code(),
            "UNRECOGNIZED_GST_RATE"
        );
        assert_eq!(
            InvoiceError::NotFound(InvoiceId::new(9)).error_code(),
            "INVOICE_NOT_FOUND"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(InvoiceError::EmptyLineItems.http_status_code(), 400);
        assert_eq!(
            InvoiceError::AmountOutOfRange { line: 1 }.http_status_code(),
            400
        );
        assert_eq!(
            InvoiceError::ReferenceTooLong { max: 100 }.http_status_code(),
            400
        );
        assert_eq!(
            InvoiceError::Forbidden("admin only".into()).http_status_code(),
            403
        );
        assert_eq!(
            InvoiceError::NotFound(InvoiceId::new(1)).http_status_code(),
            404
        );
        assert_eq!(
            InvoiceError::HasPayments {
                invoice_id: InvoiceId::new(1),
                count: 2,
            }
            .http_status_code(),
            409
        );
        assert_eq!(
            InvoiceError::Overpayment {
                amount: Decimal::new(500, 0),
                amount_due: Decimal::new(100, 0),
            }
            .http_status_code(),
            422
        );
        assert_eq!(
            InvoiceError::Repository("down".into()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(InvoiceError::NumberCollision("INV-2026-000001".into()).is_retryable());
        assert!(
            InvoiceError::HasPayments {
                invoice_id: InvoiceId::new(3),
                count: 1,
            }
            .is_retryable()
        );
        assert!(!InvoiceError::EmptyLineItems.is_retryable());
        assert!(!InvoiceError::Repository("down".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = InvoiceError::Overpayment {
            amount: Decimal::new(60000, 2),
            amount_due: Decimal::new(53100, 2),
        };
        assert_eq!(
            err.to_string(),
            "Payment amount 600.00 exceeds amount due 531.00"
        );

        let err = InvoiceError::DueBeforeInvoiceDate {
            invoice_date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Due date 2026-03-01 is before invoice date 2026-03-10"
        );
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = InvoiceError::Overpayment {
            amount: Decimal::ONE,
            amount_due: Decimal::ZERO,
        }
        .into();
        assert_eq!(app.status_code(), 422);

        let app: AppError = InvoiceError::Repository("pool closed".into()).into();
        assert_eq!(app.error_code(), "DATABASE_ERROR");

        let app: AppError = InvoiceError::NumberCollision("INV-1".into()).into();
        assert_eq!(app.status_code(), 409);

        let app: AppError = InvoiceError::SameParties("CREDIT".into()).into();
        assert_eq!(app.status_code(), 400);
    }
}
