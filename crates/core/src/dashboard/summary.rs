//! Party summary computation.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::invoice::access::{AccessPolicy, Principal};
use crate::invoice::types::{InvoiceBalanceRow, PaymentStatus};

use super::types::PartySummary;

/// Folds balance rows into a [`PartySummary`].
pub struct SummaryCalculator;

impl SummaryCalculator {
    /// Summarizes the rows visible to `principal` as of `today`.
    ///
    /// Rows outside the principal's visibility are ignored.
    #[must_use]
    pub fn summarize(
        principal: &Principal,
        rows: &[InvoiceBalanceRow],
        today: NaiveDate,
    ) -> PartySummary {
        let me = principal.user_id;
        let visibility = AccessPolicy::visibility(principal);
        let this_month = (today.year(), today.month());
        let last_month = previous_month(this_month);

        let mut summary = PartySummary {
            outstanding_amount: principal.is_admin.then_some(Decimal::ZERO),
            ..PartySummary::default()
        };

        for row in rows
            .iter()
            .filter(|row| visibility.admits(row.issuer_id, row.recipient_id))
        {
            summary.total_invoices += 1;
            let unpaid = row.payment_status != PaymentStatus::Paid;
            if unpaid {
                summary.pending_invoices += 1;
                if let Some(outstanding) = summary.outstanding_amount.as_mut() {
                    *outstanding += row.amount_due;
                }
            }

            if row.amount_due > Decimal::ZERO && row.issuer_id != row.recipient_id {
                if row.issuer_id == me {
                    summary.total_receivables += row.amount_due;
                } else if row.recipient_id == me {
                    summary.total_payables += row.amount_due;
                }
            }

            if row.issuer_id == me {
                let month = (row.invoice_date.year(), row.invoice_date.month());
                if row.invoice_date == today {
                    summary.today_sales += row.total_amount;
                }
                if month == this_month {
                    summary.this_month_sales += row.total_amount;
                } else if month == last_month {
                    summary.last_month_sales += row.total_amount;
                }
            }
        }

        summary
    }
}

fn previous_month((year, month): (i32, u32)) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}
