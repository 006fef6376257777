//! Party summary types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Receivables, payables and sales figures for one principal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartySummary {
    /// Outstanding amounts owed to the principal.
    pub total_receivables: Decimal,
    /// Outstanding amounts the principal owes.
    pub total_payables: Decimal,
    /// Total of invoices issued by the principal today.
    pub today_sales: Decimal,
    /// Total of invoices issued by the principal this calendar month.
    pub this_month_sales: Decimal,
    /// Total of invoices issued by the principal last calendar month.
    pub last_month_sales: Decimal,
    /// Visible invoices that are not fully paid.
    pub pending_invoices: u64,
    /// All visible invoices.
    pub total_invoices: u64,
    /// Sum of `amount_due` over every unpaid invoice. Admins only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outstanding_amount: Option<Decimal>,
}
