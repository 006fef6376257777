//! In-memory repository for tests.
//!
//! Available to downstream crates through the `test-utils` feature.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{TimeDelta, Utc};

use bahi_shared::types::{InvoiceId, LineItemId, PageRequest, PaymentId};

use super::access::Visibility;
use super::error::InvoiceError;
use super::lifecycle::LifecycleRules;
use super::service::InvoiceRepository;
use super::settlement::{PaymentLedger, Settlement};
use super::types::{
    Invoice, InvoiceBalanceRow, LineItem, NewInvoice, NewPayment, Payment, PaymentReceipt,
};

#[derive(Debug, Default)]
struct State {
    counters: HashMap<String, i64>,
    invoices: BTreeMap<InvoiceId, Invoice>,
    taken_numbers: HashSet<String>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Mutex-guarded store. Every operation is one critical section, which
/// plays the role of the row lock.
#[derive(Debug, Default)]
pub struct MemoryInvoiceRepository {
    state: Mutex<State>,
}

impl MemoryInvoiceRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks a number as used without creating an invoice.
    pub fn reserve_number(&self, number: &str) {
        self.lock().taken_numbers.insert(number.to_string());
    }

    /// Number of stored line items across all invoices.
    pub fn line_item_count(&self) -> usize {
        self.lock()
            .invoices
            .values()
            .map(|invoice| invoice.line_items.len())
            .sum()
    }
}

impl InvoiceRepository for MemoryInvoiceRepository {
    async fn allocate_sequence(&self, counter_key: &str) -> Result<i64, InvoiceError> {
        let mut state = self.lock();
        let counter = state.counters.entry(counter_key.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn insert(&self, invoice: NewInvoice) -> Result<Invoice, InvoiceError> {
        let mut state = self.lock();
        if !state.taken_numbers.insert(invoice.invoice_number.clone()) {
            return Err(InvoiceError::NumberCollision(invoice.invoice_number));
        }

        let id = InvoiceId::new(state.next_id());
        // Strictly increasing timestamps keep the list order deterministic.
        let now = Utc::now() + TimeDelta::microseconds(id.into_inner());
        let NewInvoice {
            invoice_number,
            prepared,
        } = invoice;

        let mut line_items = Vec::with_capacity(prepared.computed.line_items.len());
        for (position, line) in (0_i32..).zip(prepared.computed.line_items) {
            line_items.push(LineItem {
                id: LineItemId::new(state.next_id()),
                invoice_id: id,
                position,
                description: line.description,
                item_id: line.item_id,
                quantity: line.quantity,
                rate: line.rate,
                gst_rate: line.gst_rate,
                amount: line.amount,
                gst_amount: line.gst_amount,
                total_amount: line.total_amount,
            });
        }

        let totals = prepared.computed.totals;
        let stored = Invoice {
            id,
            invoice_number,
            issuer_id: prepared.issuer_id,
            recipient_id: prepared.recipient_id,
            invoice_type: prepared.invoice_type,
            payment_status: prepared.settlement.status,
            invoice_date: prepared.invoice_date,
            due_date: prepared.due_date,
            sub_total: totals.sub_total,
            total_gst: totals.total_gst,
            total_amount: totals.total_amount,
            amount_paid: prepared.settlement.amount_paid,
            amount_due: prepared.settlement.amount_due,
            notes: prepared.notes,
            terms: prepared.terms,
            line_items,
            payments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.invoices.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, InvoiceError> {
        Ok(self.lock().invoices.get(&id).cloned())
    }

    async fn list(
        &self,
        visibility: Visibility,
        page: PageRequest,
    ) -> Result<(Vec<Invoice>, u64), InvoiceError> {
        let state = self.lock();
        let mut visible: Vec<&Invoice> = state
            .invoices
            .values()
            .filter(|invoice| visibility.admits(invoice.issuer_id, invoice.recipient_id))
            .collect();
        visible.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let total = visible.len() as u64;
        let data = visible
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok((data, total))
    }

    async fn delete_unpaid(&self, id: InvoiceId) -> Result<bool, InvoiceError> {
        let mut state = self.lock();
        let Some(invoice) = state.invoices.get(&id) else {
            return Ok(false);
        };
        LifecycleRules::ensure_deletable(id, invoice.payments.len() as u64)?;
        state.invoices.remove(&id);
        Ok(true)
    }

    async fn append_payment(&self, payment: NewPayment) -> Result<PaymentReceipt, InvoiceError> {
        let mut state = self.lock();
        let payment_id = PaymentId::new(state.next_id());
        let invoice = state
            .invoices
            .get_mut(&payment.invoice_id)
            .ok_or(InvoiceError::NotFound(payment.invoice_id))?;

        PaymentLedger::ensure_within_due(payment.amount, invoice.amount_due)?;

        let now = Utc::now();
        let recorded = Payment {
            id: payment_id,
            invoice_id: payment.invoice_id,
            amount: payment.amount,
            payment_method: payment.payment_method,
            payment_date: payment.payment_date,
            reference: payment.reference,
            notes: payment.notes,
            created_at: now,
        };
        invoice.payments.push(recorded.clone());

        let settlement = Settlement::from_payments(
            invoice.total_amount,
            invoice.payments.iter().map(|p| p.amount),
        );
        invoice.amount_paid = settlement.amount_paid;
        invoice.amount_due = settlement.amount_due;
        invoice.payment_status = settlement.status;
        invoice.updated_at = now;

        Ok(PaymentReceipt {
            payment: recorded,
            invoice: invoice.clone(),
        })
    }

    async fn balance_rows(
        &self,
        visibility: Visibility,
    ) -> Result<Vec<InvoiceBalanceRow>, InvoiceError> {
        let state = self.lock();
        Ok(state
            .invoices
            .values()
            .filter(|invoice| visibility.admits(invoice.issuer_id, invoice.recipient_id))
            .map(Invoice::balance_row)
            .collect())
    }
}
