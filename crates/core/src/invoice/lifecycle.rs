//! Creation, listing and deletion rules that do not touch storage.

use chrono::{NaiveDate, TimeDelta};

use bahi_shared::types::{InvoiceId, PageRequest};

use super::access::{AccessPolicy, Principal};
use super::calculator::{Calculator, GstRateTable};
use super::error::InvoiceError;
use super::settlement::Settlement;
use super::types::{InvoiceDraft, PreparedInvoice};

/// Stateless lifecycle rules.
pub struct LifecycleRules;

impl LifecycleRules {
    /// Turns a draft into a fully computed invoice awaiting its number.
    ///
    /// `today` is the UTC calendar day of submission.
    pub fn prepare(
        draft: InvoiceDraft,
        principal: &Principal,
        rates: &GstRateTable,
        default_due_days: i64,
        today: NaiveDate,
    ) -> Result<PreparedInvoice, InvoiceError> {
        let issuer_id = draft.issuer_id.unwrap_or(principal.user_id);
        AccessPolicy::ensure_can_create_for(principal, issuer_id)?;

        if issuer_id == draft.recipient_id && !draft.invoice_type.allows_self_billing() {
            return Err(InvoiceError::SameParties(draft.invoice_type.to_string()));
        }

        let invoice_date = draft.invoice_date.unwrap_or(today);
        let due_date = match draft.due_date {
            Some(due_date) => due_date,
            None => TimeDelta::try_days(default_due_days)
                .and_then(|delta| invoice_date.checked_add_signed(delta))
                .ok_or_else(|| {
                    InvoiceError::Internal(format!(
                        "cannot add {default_due_days} days to {invoice_date}"
                    ))
                })?,
        };
        if due_date < invoice_date {
            return Err(InvoiceError::DueBeforeInvoiceDate {
                invoice_date,
                due_date,
            });
        }

        let computed = Calculator::compute(&draft.line_items, rates)?;
        let settlement = Settlement::opening(computed.totals.total_amount);

        Ok(PreparedInvoice {
            issuer_id,
            recipient_id: draft.recipient_id,
            invoice_type: draft.invoice_type,
            invoice_date,
            due_date,
            notes: non_blank(draft.notes),
            terms: non_blank(draft.terms),
            computed,
            settlement,
        })
    }

    /// Resolves optional page parameters against the configured defaults.
    pub fn page_request(
        page: Option<u32>,
        limit: Option<u32>,
        default_limit: u32,
        max_limit: u32,
    ) -> Result<PageRequest, InvoiceError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(default_limit);
        if page == 0 {
            return Err(InvoiceError::InvalidPage("page must be at least 1".into()));
        }
        if limit == 0 {
            return Err(InvoiceError::InvalidPage("limit must be at least 1".into()));
        }
        Ok(PageRequest::new(page, limit).clamped(max_limit))
    }

    /// Fails with `HasPayments` if any payment has been recorded.
    ///
    /// Must be evaluated against a payment count read under the invoice lock.
    pub fn ensure_deletable(invoice_id: InvoiceId, payment_count: u64) -> Result<(), InvoiceError> {
        if payment_count > 0 {
            return Err(InvoiceError::HasPayments {
                invoice_id,
                count: payment_count,
            });
        }
        Ok(())
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::types::{InvoiceType, LineItemDraft, PaymentStatus};
    use bahi_shared::types::UserId;
    use rust_decimal_macros::dec;

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    fn draft(recipient: UserId, invoice_type: InvoiceType) -> InvoiceDraft {
        InvoiceDraft {
            issuer_id: None,
            recipient_id: recipient,
            invoice_type,
            invoice_date: None,
            due_date: None,
            notes: Some("  ".into()),
            terms: Some(" Net 30 ".into()),
            line_items: vec![LineItemDraft {
                description: "Consulting".into(),
                item_id: None,
                quantity: dec!(3),
                rate: dec!(1000),
                gst_rate: 18,
            }],
        }
    }

    fn prepare(d: InvoiceDraft, principal: &Principal) -> Result<PreparedInvoice, InvoiceError> {
        LifecycleRules::prepare(d, principal, &GstRateTable::default(), 30, today())
    }

    #[test]
    fn test_defaults() {
        let prepared = prepare(draft(BOB, InvoiceType::Credit), &Principal::user(ALICE)).unwrap();
        assert_eq!(prepared.issuer_id, ALICE);
        assert_eq!(prepared.invoice_date, today());
        assert_eq!(
            prepared.due_date,
            NaiveDate::from_ymd_opt(2026, 2, 14).unwrap()
        );
        assert_eq!(prepared.notes, None);
        assert_eq!(prepared.terms.as_deref(), Some("Net 30"));
        assert_eq!(prepared.computed.totals.total_amount, dec!(3540.00));
        assert_eq!(prepared.settlement.amount_due, dec!(3540.00));
        assert_eq!(prepared.settlement.status, PaymentStatus::Pending);
    }

    #[test]
    fn test_self_billing_only_for_cash() {
        let err = prepare(draft(ALICE, InvoiceType::Credit), &Principal::user(ALICE)).unwrap_err();
        assert!(matches!(err, InvoiceError::SameParties(_)));
        assert!(prepare(draft(ALICE, InvoiceType::Cash), &Principal::user(ALICE)).is_ok());
    }

    #[test]
    fn test_on_behalf_creation() {
        let mut d = draft(ALICE, InvoiceType::Debit);
        d.issuer_id = Some(BOB);
        let err = prepare(d.clone(), &Principal::user(ALICE)).unwrap_err();
        assert!(matches!(err, InvoiceError::Forbidden(_)));

        let prepared = prepare(d, &Principal::admin(UserId(99))).unwrap();
        assert_eq!(prepared.issuer_id, BOB);
    }

    #[test]
    fn test_due_date_before_invoice_date() {
        let mut d = draft(BOB, InvoiceType::Credit);
        d.invoice_date = NaiveDate::from_ymd_opt(2026, 3, 10);
        d.due_date = NaiveDate::from_ymd_opt(2026, 3, 9);
        let err = prepare(d.clone(), &Principal::user(ALICE)).unwrap_err();
        assert!(matches!(err, InvoiceError::DueBeforeInvoiceDate { .. }));

        d.due_date = d.invoice_date;
        assert!(prepare(d, &Principal::user(ALICE)).is_ok());
    }

    #[test]
    fn test_page_request() {
        let page = LifecycleRules::page_request(None, None, 10, 100).unwrap();
        assert_eq!(page, PageRequest::new(1, 10));

        let page = LifecycleRules::page_request(Some(3), Some(500), 10, 100).unwrap();
        assert_eq!(page, PageRequest::new(3, 100));

        assert!(LifecycleRules::page_request(Some(0), None, 10, 100).is_err());
        assert!(LifecycleRules::page_request(None, Some(0), 10, 100).is_err());
    }

    #[test]
    fn test_ensure_deletable() {
        assert!(LifecycleRules::ensure_deletable(InvoiceId(1), 0).is_ok());
        let err = LifecycleRules::ensure_deletable(InvoiceId(1), 2).unwrap_err();
        assert!(matches!(err, InvoiceError::HasPayments { count: 2, .. }));
        assert_eq!(err.http_status_code(), 409);
    }
}
