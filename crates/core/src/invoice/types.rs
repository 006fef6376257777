//! Invoice domain types.
//!
//! Drafts are what callers supply; computed and persisted types carry the
//! derived monetary fields, which are never accepted from callers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bahi_shared::types::{InvoiceId, ItemId, LineItemId, PaymentId, UserId};

use super::settlement::Settlement;

/// Commercial nature of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceType {
    /// Cash sale. Issuer and recipient may be the same user.
    Cash,
    /// Credit invoice (recipient owes the issuer).
    Credit,
    /// Debit invoice.
    Debit,
}

impl InvoiceType {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
        }
    }

    /// Returns true if the issuer may also be the recipient.
    #[must_use]
    pub const fn allows_self_billing(&self) -> bool {
        matches!(self, Self::Cash)
    }
}

/// Settlement state derived from cumulative payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Nothing paid yet.
    Pending,
    /// Partly paid.
    Partial,
    /// Fully paid (terminal).
    Paid,
}

impl PaymentStatus {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Partial => "PARTIAL",
            Self::Paid => "PAID",
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Partial => 1,
            Self::Paid => 2,
        }
    }

    /// Returns true if moving from `self` to `next` never goes backwards.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        next.rank() >= self.rank()
    }

    /// Returns true if no further payment can be accepted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Cash.
    Cash,
    /// Bank transfer (NEFT/RTGS/IMPS).
    BankTransfer,
    /// Cheque.
    Cheque,
    /// Unified Payments Interface.
    Upi,
    /// Debit or credit card.
    Card,
}

impl PaymentMethod {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::BankTransfer => "BANK_TRANSFER",
            Self::Cheque => "CHEQUE",
            Self::Upi => "UPI",
            Self::Card => "CARD",
        }
    }
}

macro_rules! impl_display_from_str {
    ($ty:ident, $label:literal, [$($variant:ident),+ $(,)?]) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let upper = s.trim().to_uppercase();
                $(
                    if upper == Self::$variant.as_str() {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!(concat!("Unknown ", $label, ": {}"), s))
            }
        }
    };
}

impl_display_from_str!(InvoiceType, "invoice type", [Cash, Credit, Debit]);
impl_display_from_str!(PaymentStatus, "payment status", [Pending, Partial, Paid]);
impl_display_from_str!(
    PaymentMethod,
    "payment method",
    [Cash, BankTransfer, Cheque, Upi, Card]
);

/// A line item as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemDraft {
    /// Free-text description (required).
    pub description: String,
    /// Optional catalog reference.
    #[serde(default)]
    pub item_id: Option<ItemId>,
    /// Quantity (non-negative).
    pub quantity: Decimal,
    /// Unit rate (non-negative).
    pub rate: Decimal,
    /// GST percentage.
    pub gst_rate: i32,
}

/// A line item with all derived amounts computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedLineItem {
    /// Free-text description.
    pub description: String,
    /// Optional catalog reference.
    pub item_id: Option<ItemId>,
    /// Quantity at 3-digit precision.
    pub quantity: Decimal,
    /// Unit rate at currency precision.
    pub rate: Decimal,
    /// GST percentage.
    pub gst_rate: i32,
    /// `quantity × rate`, rounded.
    pub amount: Decimal,
    /// `amount × gst_rate / 100`, rounded.
    pub gst_amount: Decimal,
    /// `amount + gst_amount`.
    pub total_amount: Decimal,
}

/// Invoice-level totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// Sum of line amounts.
    pub sub_total: Decimal,
    /// Sum of line GST amounts.
    pub total_gst: Decimal,
    /// `sub_total + total_gst`.
    pub total_amount: Decimal,
}

/// Calculator output: derived lines plus totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedInvoice {
    /// Lines in supply order.
    pub line_items: Vec<ComputedLineItem>,
    /// Totals over `line_items`.
    pub totals: InvoiceTotals,
}

/// Request to create an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    /// Issuer; defaults to the acting principal.
    #[serde(default)]
    pub issuer_id: Option<UserId>,
    /// Recipient.
    pub recipient_id: UserId,
    /// Invoice type.
    pub invoice_type: InvoiceType,
    /// Invoice date; defaults to the submission day.
    #[serde(default)]
    pub invoice_date: Option<NaiveDate>,
    /// Due date; defaults to invoice date plus the configured due days.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Notes printed on the invoice.
    #[serde(default)]
    pub notes: Option<String>,
    /// Payment terms.
    #[serde(default)]
    pub terms: Option<String>,
    /// Line items, at least one.
    pub line_items: Vec<LineItemDraft>,
}

/// Fully prepared invoice ready to be numbered and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedInvoice {
    /// Issuer.
    pub issuer_id: UserId,
    /// Recipient.
    pub recipient_id: UserId,
    /// Invoice type.
    pub invoice_type: InvoiceType,
    /// Invoice date.
    pub invoice_date: NaiveDate,
    /// Due date.
    pub due_date: NaiveDate,
    /// Notes.
    pub notes: Option<String>,
    /// Terms.
    pub terms: Option<String>,
    /// Computed lines and totals.
    pub computed: ComputedInvoice,
    /// Opening settlement (nothing paid).
    pub settlement: Settlement,
}

/// Invoice handed to the repository for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    /// Allocated invoice number.
    pub invoice_number: String,
    /// Everything else about the invoice.
    pub prepared: PreparedInvoice,
}

/// A persisted line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line item ID.
    pub id: LineItemId,
    /// Owning invoice.
    pub invoice_id: InvoiceId,
    /// 0-based position in supply order.
    pub position: i32,
    /// Description.
    pub description: String,
    /// Optional catalog reference.
    pub item_id: Option<ItemId>,
    /// Quantity.
    pub quantity: Decimal,
    /// Unit rate.
    pub rate: Decimal,
    /// GST percentage.
    pub gst_rate: i32,
    /// Line amount before tax.
    pub amount: Decimal,
    /// Line GST.
    pub gst_amount: Decimal,
    /// Line total.
    pub total_amount: Decimal,
}

/// A payment as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDraft {
    /// Amount paid (strictly positive).
    pub amount: Decimal,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Payment date; defaults to the recording day.
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    /// External reference (UTR, cheque number).
    #[serde(default)]
    pub reference: Option<String>,
    /// Notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Payment handed to the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    /// Invoice being paid.
    pub invoice_id: InvoiceId,
    /// Amount paid.
    pub amount: Decimal,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Payment date.
    pub payment_date: NaiveDate,
    /// External reference.
    pub reference: Option<String>,
    /// Notes.
    pub notes: Option<String>,
}

/// A recorded payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment ID.
    pub id: PaymentId,
    /// Invoice paid.
    pub invoice_id: InvoiceId,
    /// Amount paid.
    pub amount: Decimal,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Payment date.
    pub payment_date: NaiveDate,
    /// External reference.
    pub reference: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// When the payment was recorded.
    pub created_at: DateTime<Utc>,
}

/// An invoice with its line items and payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Surrogate key.
    pub id: InvoiceId,
    /// Human-facing unique number.
    pub invoice_number: String,
    /// Issuer (`generated_by`).
    pub issuer_id: UserId,
    /// Recipient (`generated_for`).
    pub recipient_id: UserId,
    /// Invoice type.
    pub invoice_type: InvoiceType,
    /// Derived settlement state.
    pub payment_status: PaymentStatus,
    /// Invoice date.
    pub invoice_date: NaiveDate,
    /// Due date.
    pub due_date: NaiveDate,
    /// Sum of line amounts.
    pub sub_total: Decimal,
    /// Sum of line GST.
    pub total_gst: Decimal,
    /// Grand total.
    pub total_amount: Decimal,
    /// Sum of payments.
    pub amount_paid: Decimal,
    /// Outstanding balance.
    pub amount_due: Decimal,
    /// Notes.
    pub notes: Option<String>,
    /// Terms.
    pub terms: Option<String>,
    /// Line items in position order.
    pub line_items: Vec<LineItem>,
    /// Payments in recording order.
    pub payments: Vec<Payment>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Returns the settlement fields as one value.
    #[must_use]
    pub fn settlement(&self) -> Settlement {
        Settlement {
            amount_paid: self.amount_paid,
            amount_due: self.amount_due,
            status: self.payment_status,
        }
    }

    /// Returns true if `user` is the issuer or the recipient.
    #[must_use]
    pub fn is_party(&self, user: UserId) -> bool {
        self.issuer_id == user || self.recipient_id == user
    }

    /// Projects the invoice onto the fields used by party summaries.
    #[must_use]
    pub fn balance_row(&self) -> InvoiceBalanceRow {
        InvoiceBalanceRow {
            issuer_id: self.issuer_id,
            recipient_id: self.recipient_id,
            invoice_date: self.invoice_date,
            total_amount: self.total_amount,
            amount_due: self.amount_due,
            payment_status: self.payment_status,
        }
    }
}

/// Outcome of recording a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// The recorded payment.
    pub payment: Payment,
    /// The invoice after settlement was recomputed.
    pub invoice: Invoice,
}

/// Minimal invoice projection for receivable/payable reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceBalanceRow {
    /// Issuer.
    pub issuer_id: UserId,
    /// Recipient.
    pub recipient_id: UserId,
    /// Invoice date.
    pub invoice_date: NaiveDate,
    /// Grand total.
    pub total_amount: Decimal,
    /// Outstanding balance.
    pub amount_due: Decimal,
    /// Settlement state.
    pub payment_status: PaymentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::BankTransfer).unwrap(),
            "\"BANK_TRANSFER\""
        );
        assert_eq!(serde_json::to_string(&InvoiceType::Credit).unwrap(), "\"CREDIT\"");
        assert_eq!(
            serde_json::from_str::<PaymentStatus>("\"PARTIAL\"").unwrap(),
            PaymentStatus::Partial
        );
    }

    #[test]
    fn test_enum_from_str() {
        assert_eq!(PaymentMethod::from_str("upi").unwrap(), PaymentMethod::Upi);
        assert_eq!(
            PaymentMethod::from_str("BANK_TRANSFER").unwrap(),
            PaymentMethod::BankTransfer
        );
        assert_eq!(InvoiceType::from_str(" debit ").unwrap(), InvoiceType::Debit);
        assert!(InvoiceType::from_str("BARTER").is_err());
        assert!(PaymentStatus::from_str("").is_err());
    }

    #[test]
    fn test_status_transitions_are_monotonic() {
        use PaymentStatus::{Paid, Partial, Pending};
        assert!(Pending.can_transition_to(Partial));
        assert!(Pending.can_transition_to(Paid));
        assert!(Partial.can_transition_to(Partial));
        assert!(Partial.can_transition_to(Paid));
        assert!(!Partial.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Partial));
        assert!(Paid.is_terminal());
        assert!(!Partial.is_terminal());
    }

    #[test]
    fn test_only_cash_allows_self_billing() {
        assert!(InvoiceType::Cash.allows_self_billing());
        assert!(!InvoiceType::Credit.allows_self_billing());
        assert!(!InvoiceType::Debit.allows_self_billing());
    }
}
