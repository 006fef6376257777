//! Invoice service: orchestrates rules against a repository.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use bahi_shared::InvoicingConfig;
use bahi_shared::types::{InvoiceId, PageRequest, PageResponse};

use super::access::{AccessPolicy, Principal, Visibility};
use super::calculator::GstRateTable;
use super::error::InvoiceError;
use super::lifecycle::LifecycleRules;
use super::numbering::NumberingAuthority;
use super::settlement::PaymentLedger;
use super::types::{
    Invoice, InvoiceBalanceRow, InvoiceDraft, NewInvoice, NewPayment, PaymentDraft,
    PaymentReceipt,
};
use crate::dashboard::{PartySummary, SummaryCalculator};

/// Repository trait for invoice persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
/// Implementations that mutate an existing invoice must serialize on that
/// invoice (row lock or equivalent) and run the guard functions from this
/// crate inside the critical section.
pub trait InvoiceRepository: Send + Sync {
    /// Atomically increments the counter named `counter_key` and returns the
    /// new value. The first value handed out for a key is 1.
    fn allocate_sequence(
        &self,
        counter_key: &str,
    ) -> impl Future<Output = Result<i64, InvoiceError>> + Send;

    /// Inserts an invoice and its line items in one transaction.
    ///
    /// A duplicate `invoice_number` fails with `NumberCollision`.
    fn insert(
        &self,
        invoice: NewInvoice,
    ) -> impl Future<Output = Result<Invoice, InvoiceError>> + Send;

    /// Loads an invoice with line items and payments.
    fn find_by_id(
        &self,
        id: InvoiceId,
    ) -> impl Future<Output = Result<Option<Invoice>, InvoiceError>> + Send;

    /// Lists invoices passing `visibility`, newest first, with the total count.
    fn list(
        &self,
        visibility: Visibility,
        page: PageRequest,
    ) -> impl Future<Output = Result<(Vec<Invoice>, u64), InvoiceError>> + Send;

    /// Deletes an invoice and its line items.
    ///
    /// Returns `false` if the invoice does not exist. Must apply
    /// [`LifecycleRules::ensure_deletable`] under the invoice lock.
    fn delete_unpaid(
        &self,
        id: InvoiceId,
    ) -> impl Future<Output = Result<bool, InvoiceError>> + Send;

    /// Records a payment and recomputes settlement from the payment ledger.
    ///
    /// Must fail with `NotFound` if the invoice is gone and apply
    /// [`PaymentLedger::ensure_within_due`] under the invoice lock.
    fn append_payment(
        &self,
        payment: NewPayment,
    ) -> impl Future<Output = Result<PaymentReceipt, InvoiceError>> + Send;

    /// Returns balance projections of invoices passing `visibility`.
    fn balance_rows(
        &self,
        visibility: Visibility,
    ) -> impl Future<Output = Result<Vec<InvoiceBalanceRow>, InvoiceError>> + Send;
}

/// Tunable invoicing rules.
#[derive(Debug, Clone)]
pub struct InvoiceSettings {
    /// Recognized GST rates.
    pub rates: GstRateTable,
    /// Invoice number rules.
    pub numbering: NumberingAuthority,
    /// Days from invoice date to default due date.
    pub default_due_days: i64,
    /// Default page size.
    pub default_page_limit: u32,
    /// Maximum page size.
    pub max_page_limit: u32,
}

impl InvoiceSettings {
    /// Builds settings from the `invoicing` configuration section.
    #[must_use]
    pub fn from_config(config: &InvoicingConfig) -> Self {
        Self {
            rates: GstRateTable::new(config.gst_rates.iter().copied()),
            numbering: NumberingAuthority::new(
                config.number_prefix.clone(),
                config.sequence_scope.into(),
            ),
            default_due_days: config.default_due_days,
            default_page_limit: config.default_page_limit,
            max_page_limit: config.max_page_limit,
        }
    }
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        Self::from_config(&InvoicingConfig::default())
    }
}

/// Invoice lifecycle and payment settlement service.
pub struct InvoiceService<R: InvoiceRepository> {
    repo: Arc<R>,
    settings: InvoiceSettings,
}

impl<R: InvoiceRepository> InvoiceService<R> {
    /// Create a new invoice service.
    #[must_use]
    pub fn new(repo: Arc<R>, settings: InvoiceSettings) -> Self {
        Self { repo, settings }
    }

    /// Returns the active settings.
    #[must_use]
    pub fn settings(&self) -> &InvoiceSettings {
        &self.settings
    }

    /// Creates an invoice dated relative to the current time.
    pub async fn create(
        &self,
        draft: InvoiceDraft,
        principal: &Principal,
    ) -> Result<Invoice, InvoiceError> {
        self.create_at(draft, principal, Utc::now()).await
    }

    /// Creates an invoice as if submitted at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The principal may not issue as the requested issuer
    /// - Any line item or date is invalid
    /// - The number allocation collides (retryable)
    pub async fn create_at(
        &self,
        draft: InvoiceDraft,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<Invoice, InvoiceError> {
        let prepared = LifecycleRules::prepare(
            draft,
            principal,
            &self.settings.rates,
            self.settings.default_due_days,
            now.date_naive(),
        )?;

        let year = now.year();
        let numbering = &self.settings.numbering;
        let sequence = self
            .repo
            .allocate_sequence(&numbering.counter_key(year))
            .await?;
        if sequence < 1 {
            return Err(InvoiceError::Internal(format!(
                "counter returned non-positive sequence {sequence}"
            )));
        }

        self.repo
            .insert(NewInvoice {
                invoice_number: numbering.format(year, sequence).to_string(),
                prepared,
            })
            .await
    }

    /// Loads an invoice visible to `principal`.
    pub async fn get(&self, id: InvoiceId, principal: &Principal) -> Result<Invoice, InvoiceError> {
        let invoice = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(InvoiceError::NotFound(id))?;
        AccessPolicy::ensure_readable(principal, invoice)
    }

    /// Lists invoices visible to `principal`, newest first.
    pub async fn list(
        &self,
        principal: &Principal,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<PageResponse<Invoice>, InvoiceError> {
        let request = LifecycleRules::page_request(
            page,
            limit,
            self.settings.default_page_limit,
            self.settings.max_page_limit,
        )?;
        let (invoices, total) = self
            .repo
            .list(AccessPolicy::visibility(principal), request)
            .await?;
        Ok(PageResponse::new(invoices, request, total))
    }

    /// Deletes an invoice without payments. Admin only.
    pub async fn delete(&self, id: InvoiceId, principal: &Principal) -> Result<(), InvoiceError> {
        AccessPolicy::ensure_can_delete(principal, id)?;
        if self.repo.delete_unpaid(id).await? {
            Ok(())
        } else {
            Err(InvoiceError::NotFound(id))
        }
    }

    /// Records a payment dated today (UTC) unless the draft says otherwise.
    pub async fn record_payment(
        &self,
        invoice_id: InvoiceId,
        draft: PaymentDraft,
        principal: &Principal,
    ) -> Result<PaymentReceipt, InvoiceError> {
        self.record_payment_on(invoice_id, draft, principal, Utc::now().date_naive())
            .await
    }

    /// Records a payment with `today` as the default payment date.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The invoice is missing or not visible to the principal
    /// - The amount is not positive
    /// - The amount exceeds what is still due
    pub async fn record_payment_on(
        &self,
        invoice_id: InvoiceId,
        draft: PaymentDraft,
        principal: &Principal,
        today: NaiveDate,
    ) -> Result<PaymentReceipt, InvoiceError> {
        PaymentLedger::validate_draft(&draft)?;
        // Visibility and a fast reject only; the balance check happens under the lock.
        let invoice = self.get(invoice_id, principal).await?;
        if invoice.payment_status.is_terminal() {
            return Err(InvoiceError::Overpayment {
                amount: draft.amount,
                amount_due: invoice.amount_due,
            });
        }

        self.repo
            .append_payment(NewPayment {
                invoice_id,
                amount: draft.amount,
                payment_method: draft.payment_method,
                payment_date: draft.payment_date.unwrap_or(today),
                reference: draft.reference,
                notes: draft.notes,
            })
            .await
    }

    /// Summarizes receivables, payables and sales for `principal`.
    pub async fn summary(
        &self,
        principal: &Principal,
        today: NaiveDate,
    ) -> Result<PartySummary, InvoiceError> {
        let rows = self
            .repo
            .balance_rows(AccessPolicy::visibility(principal))
            .await?;
        Ok(SummaryCalculator::summarize(principal, &rows, today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::memory::MemoryInvoiceRepository;
    use crate::invoice::numbering::SequenceScope;
    use crate::invoice::types::{InvoiceType, LineItemDraft, PaymentMethod, PaymentStatus};
    use bahi_shared::types::UserId;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);
    const CAROL: UserId = UserId(3);
    const ADMIN: UserId = UserId(100);

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 30, 0).unwrap()
    }

    fn today() -> NaiveDate {
        now().date_naive()
    }

    fn service() -> (Arc<MemoryInvoiceRepository>, InvoiceService<MemoryInvoiceRepository>) {
        let repo = Arc::new(MemoryInvoiceRepository::new());
        let service = InvoiceService::new(Arc::clone(&repo), InvoiceSettings::default());
        (repo, service)
    }

    fn worked_example(recipient: UserId) -> InvoiceDraft {
        InvoiceDraft {
            issuer_id: None,
            recipient_id: recipient,
            invoice_type: InvoiceType::Credit,
            invoice_date: None,
            due_date: None,
            notes: None,
            terms: None,
            line_items: vec![
                LineItemDraft {
                    description: "Widget".into(),
                    item_id: None,
                    quantity: dec!(2),
                    rate: dec!(100),
                    gst_rate: 18,
                },
                LineItemDraft {
                    description: "Gadget".into(),
                    item_id: None,
                    quantity: dec!(1),
                    rate: dec!(50),
                    gst_rate: 5,
                },
            ],
        }
    }

    fn payment(amount: Decimal) -> PaymentDraft {
        PaymentDraft {
            amount,
            payment_method: PaymentMethod::Upi,
            payment_date: None,
            reference: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_worked_example_settles_to_paid() {
        let (_, service) = service();
        let alice = Principal::user(ALICE);

        let invoice = service
            .create_at(worked_example(BOB), &alice, now())
            .await
            .unwrap();
        assert_eq!(invoice.invoice_number, "INV-2026-000001");
        assert_eq!(invoice.issuer_id, ALICE);
        assert_eq!(invoice.sub_total, dec!(250));
        assert_eq!(invoice.total_gst, dec!(38.5));
        assert_eq!(invoice.total_amount, dec!(288.5));
        assert_eq!(invoice.amount_due, dec!(288.5));
        assert_eq!(invoice.payment_status, PaymentStatus::Pending);
        assert_eq!(invoice.line_items.len(), 2);
        assert_eq!(invoice.line_items[1].position, 1);

        let receipt = service
            .record_payment_on(invoice.id, payment(dec!(100)), &alice, today())
            .await
            .unwrap();
        assert_eq!(receipt.payment.payment_date, today());
        assert_eq!(receipt.invoice.amount_paid, dec!(100));
        assert_eq!(receipt.invoice.amount_due, dec!(188.5));
        assert_eq!(receipt.invoice.payment_status, PaymentStatus::Partial);

        // The recipient may record payments too.
        let receipt = service
            .record_payment_on(invoice.id, payment(dec!(188.5)), &Principal::user(BOB), today())
            .await
            .unwrap();
        assert_eq!(receipt.invoice.amount_due, dec!(0));
        assert_eq!(receipt.invoice.payment_status, PaymentStatus::Paid);
        assert_eq!(receipt.invoice.payments.len(), 2);

        // Paid is terminal: rejected before the ledger lock is taken.
        let err = service
            .record_payment_on(invoice.id, payment(dec!(1)), &alice, today())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InvoiceError::Overpayment { amount, amount_due }
                if amount == dec!(1) && amount_due == dec!(0)
        ));

        let after = service.get(invoice.id, &alice).await.unwrap();
        assert_eq!(after.payments.len(), 2);
        assert_eq!(after.amount_paid, dec!(288.5));
        assert_eq!(after.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_payment_validation() {
        let (_, service) = service();
        let alice = Principal::user(ALICE);
        let invoice = service
            .create_at(worked_example(BOB), &alice, now())
            .await
            .unwrap();

        let err = service
            .record_payment_on(invoice.id, payment(dec!(0)), &alice, today())
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidPaymentAmount(_)));

        let err = service
            .record_payment_on(invoice.id, payment(dec!(100000000000000)), &alice, today())
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::PaymentAmountOutOfRange(_)));
        assert_eq!(err.http_status_code(), 400);

        let mut long_reference = payment(dec!(10));
        long_reference.reference = Some("UTR".repeat(34));
        let err = service
            .record_payment_on(invoice.id, long_reference, &alice, today())
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::ReferenceTooLong { max: 100 }));

        let err = service
            .record_payment_on(invoice.id, payment(dec!(10)), &Principal::user(CAROL), today())
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::NotFound(_)));

        let err = service
            .record_payment_on(InvoiceId(404), payment(dec!(10)), &alice, today())
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::NotFound(_)));

        let unchanged = service.get(invoice.id, &alice).await.unwrap();
        assert!(unchanged.payments.is_empty());
        assert_eq!(unchanged.amount_due, dec!(288.5));
    }

    #[tokio::test]
    async fn test_sequential_numbers() {
        let (_, service) = service();
        let alice = Principal::user(ALICE);
        let mut numbers = Vec::new();
        for _ in 0..3 {
            let invoice = service
                .create_at(worked_example(BOB), &alice, now())
                .await
                .unwrap();
            numbers.push(invoice.invoice_number);
        }
        assert_eq!(
            numbers,
            vec!["INV-2026-000001", "INV-2026-000002", "INV-2026-000003"]
        );
    }

    #[tokio::test]
    async fn test_yearly_scope_restarts_each_year() {
        let repo = Arc::new(MemoryInvoiceRepository::new());
        let settings = InvoiceSettings {
            numbering: NumberingAuthority::new("INV", SequenceScope::Yearly),
            ..InvoiceSettings::default()
        };
        let service = InvoiceService::new(repo, settings);
        let alice = Principal::user(ALICE);

        let dec_2025 = Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap();
        let first = service
            .create_at(worked_example(BOB), &alice, dec_2025)
            .await
            .unwrap();
        let second = service
            .create_at(worked_example(BOB), &alice, now())
            .await
            .unwrap();
        assert_eq!(first.invoice_number, "INV-2025-000001");
        assert_eq!(second.invoice_number, "INV-2026-000001");
    }

    #[tokio::test]
    async fn test_number_collision_is_retryable() {
        let (repo, service) = service();
        repo.reserve_number("INV-2026-000001");
        let alice = Principal::user(ALICE);

        let err = service
            .create_at(worked_example(BOB), &alice, now())
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::NumberCollision(_)));
        assert!(err.is_retryable());

        let retried = service
            .create_at(worked_example(BOB), &alice, now())
            .await
            .unwrap();
        assert_eq!(retried.invoice_number, "INV-2026-000002");
    }

    #[tokio::test]
    async fn test_get_is_scoped_to_parties() {
        let (_, service) = service();
        let invoice = service
            .create_at(worked_example(BOB), &Principal::user(ALICE), now())
            .await
            .unwrap();

        assert!(service.get(invoice.id, &Principal::user(ALICE)).await.is_ok());
        assert!(service.get(invoice.id, &Principal::user(BOB)).await.is_ok());
        assert!(service.get(invoice.id, &Principal::admin(ADMIN)).await.is_ok());

        let err = service
            .get(invoice.id, &Principal::user(CAROL))
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::NotFound(id) if id == invoice.id));
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_newest_first() {
        let (_, service) = service();
        let alice = Principal::user(ALICE);
        let bob = Principal::user(BOB);

        let first = service
            .create_at(worked_example(BOB), &alice, now())
            .await
            .unwrap();
        let second = service
            .create_at(worked_example(CAROL), &bob, now())
            .await
            .unwrap();
        let third = service
            .create_at(worked_example(CAROL), &alice, now())
            .await
            .unwrap();

        let page = service.list(&alice, None, None).await.unwrap();
        let ids: Vec<_> = page.data.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![third.id, first.id]);
        assert_eq!(page.meta.total, 2);
        assert_eq!(page.meta.limit, 10);

        let page = service.list(&bob, None, None).await.unwrap();
        let ids: Vec<_> = page.data.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let page = service
            .list(&Principal::admin(ADMIN), Some(2), Some(2))
            .await
            .unwrap();
        assert_eq!(page.meta.total, 3);
        assert_eq!(page.meta.total_pages, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, first.id);
    }

    #[tokio::test]
    async fn test_list_pagination_bounds() {
        let (_, service) = service();
        let alice = Principal::user(ALICE);

        let page = service.list(&alice, Some(1), Some(1000)).await.unwrap();
        assert_eq!(page.meta.limit, 100);
        assert!(page.data.is_empty());
        assert_eq!(page.meta.total, 0);

        let err = service.list(&alice, Some(0), None).await.unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidPage(_)));
        let err = service.list(&alice, None, Some(0)).await.unwrap_err();
        assert_eq!(err.http_status_code(), 400);
    }

    #[tokio::test]
    async fn test_delete_guard() {
        let (repo, service) = service();
        let alice = Principal::user(ALICE);
        let admin = Principal::admin(ADMIN);

        let paid = service
            .create_at(worked_example(BOB), &alice, now())
            .await
            .unwrap();
        let unpaid = service
            .create_at(worked_example(BOB), &alice, now())
            .await
            .unwrap();
        service
            .record_payment_on(paid.id, payment(dec!(10)), &alice, today())
            .await
            .unwrap();
        assert_eq!(repo.line_item_count(), 4);

        let err = service.delete(unpaid.id, &alice).await.unwrap_err();
        assert!(matches!(err, InvoiceError::Forbidden(_)));

        let err = service.delete(paid.id, &admin).await.unwrap_err();
        assert!(matches!(err, InvoiceError::HasPayments { count: 1, .. }));
        assert!(service.get(paid.id, &admin).await.is_ok());

        service.delete(unpaid.id, &admin).await.unwrap();
        assert_eq!(repo.line_item_count(), 2);
        let err = service.get(unpaid.id, &admin).await.unwrap_err();
        assert!(matches!(err, InvoiceError::NotFound(_)));

        let err = service.delete(unpaid.id, &admin).await.unwrap_err();
        assert!(matches!(err, InvoiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_summary_through_service() {
        let (_, service) = service();
        let alice = Principal::user(ALICE);
        let invoice = service
            .create_at(worked_example(BOB), &alice, now())
            .await
            .unwrap();
        service
            .record_payment_on(invoice.id, payment(dec!(100)), &alice, today())
            .await
            .unwrap();

        let summary = service.summary(&alice, today()).await.unwrap();
        assert_eq!(summary.total_receivables, dec!(188.5));
        assert_eq!(summary.today_sales, dec!(288.5));
        assert_eq!(summary.pending_invoices, 1);

        let summary = service.summary(&Principal::user(BOB), today()).await.unwrap();
        assert_eq!(summary.total_payables, dec!(188.5));
        assert_eq!(summary.today_sales, dec!(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creations_get_unique_numbers() {
        let (_, service) = service();
        let service = Arc::new(service);

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .create_at(worked_example(BOB), &Principal::user(ALICE), now())
                        .await
                })
            })
            .collect();

        let mut numbers = std::collections::HashSet::new();
        for result in futures::future::join_all(handles).await {
            let invoice = result.unwrap().unwrap();
            assert!(numbers.insert(invoice.invoice_number));
        }
        assert_eq!(numbers.len(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_payments_never_overpay() {
        let (_, service) = service();
        let service = Arc::new(service);
        let alice = Principal::user(ALICE);
        let invoice = service
            .create_at(worked_example(BOB), &alice, now())
            .await
            .unwrap();
        let id = invoice.id;

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .record_payment_on(id, payment(dec!(50)), &alice, today())
                        .await
                })
            })
            .collect();

        let mut accepted = 0;
        for result in futures::future::join_all(handles).await {
            match result.unwrap() {
                Ok(_) => accepted += 1,
                Err(err) => assert!(matches!(err, InvoiceError::Overpayment { .. })),
            }
        }
        assert_eq!(accepted, 5);

        let settled = service.get(id, &alice).await.unwrap();
        assert_eq!(settled.amount_paid, dec!(250));
        assert_eq!(settled.amount_due, dec!(38.5));
        assert_eq!(settled.payment_status, PaymentStatus::Partial);
    }
}
