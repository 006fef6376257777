//! Payment ledger rules and settlement derivation.
//!
//! Settlement is always recomputed from the full payment ledger. Repositories
//! call these functions inside the per-invoice critical section.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bahi_shared::types::money::{has_money_precision, within_money_range};

use super::error::InvoiceError;
use super::types::{PaymentDraft, PaymentStatus};

/// Longest payment reference the ledger stores, in characters.
pub const MAX_REFERENCE_LEN: usize = 100;

/// The derived settlement fields of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Sum of all payments.
    pub amount_paid: Decimal,
    /// `total_amount - amount_paid`.
    pub amount_due: Decimal,
    /// Derived status.
    pub status: PaymentStatus,
}

impl Settlement {
    /// Settlement of a freshly created invoice.
    #[must_use]
    pub fn opening(total_amount: Decimal) -> Self {
        Self {
            amount_paid: Decimal::ZERO,
            amount_due: total_amount,
            status: PaymentStatus::Pending,
        }
    }

    /// Settlement given the cumulative amount paid.
    #[must_use]
    pub fn from_paid(total_amount: Decimal, amount_paid: Decimal) -> Self {
        Self {
            amount_paid,
            amount_due: total_amount - amount_paid,
            status: PaymentLedger::status_for(total_amount, amount_paid),
        }
    }

    /// Settlement recomputed from every recorded payment amount.
    #[must_use]
    pub fn from_payments<I>(total_amount: Decimal, payments: I) -> Self
    where
        I: IntoIterator<Item = Decimal>,
    {
        Self::from_paid(total_amount, payments.into_iter().sum())
    }
}

/// Stateless payment rules.
pub struct PaymentLedger;

impl PaymentLedger {
    /// Derives the status from the total and the cumulative amount paid.
    ///
    /// Nothing paid is always `Pending`, which keeps zero-total invoices
    /// in their initial state.
    #[must_use]
    pub fn status_for(total_amount: Decimal, amount_paid: Decimal) -> PaymentStatus {
        if amount_paid <= Decimal::ZERO {
            PaymentStatus::Pending
        } else if amount_paid >= total_amount {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        }
    }

    /// Rejects zero, negative and sub-paisa amounts, and amounts too large
    /// for the money column.
    pub fn validate_amount(amount: Decimal) -> Result<(), InvoiceError> {
        if amount <= Decimal::ZERO || !has_money_precision(amount) {
            return Err(InvoiceError::InvalidPaymentAmount(amount));
        }
        if !within_money_range(amount) {
            return Err(InvoiceError::PaymentAmountOutOfRange(amount));
        }
        Ok(())
    }

    /// Checks a payment draft before it reaches the ledger.
    pub fn validate_draft(draft: &PaymentDraft) -> Result<(), InvoiceError> {
        Self::validate_amount(draft.amount)?;
        if draft
            .reference
            .as_deref()
            .is_some_and(|r| r.chars().count() > MAX_REFERENCE_LEN)
        {
            return Err(InvoiceError::ReferenceTooLong {
                max: MAX_REFERENCE_LEN,
            });
        }
        Ok(())
    }

    /// Rejects a payment larger than the outstanding balance.
    ///
    /// Must be evaluated against `amount_due` read under the invoice lock.
    pub fn ensure_within_due(amount: Decimal, amount_due: Decimal) -> Result<(), InvoiceError> {
        if amount > amount_due {
            return Err(InvoiceError::Overpayment { amount, amount_due });
        }
        Ok(())
    }
}
