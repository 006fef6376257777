//! Invoice store: PostgreSQL implementation of the invoice repository.
//!
//! Every mutation of an existing invoice takes `SELECT ... FOR UPDATE` on the
//! invoice row first, so payment recording and deletion serialize per invoice
//! while unrelated invoices proceed in parallel.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr,
    Statement, TransactionTrait,
};

use bahi_core::invoice::{
    Invoice, InvoiceBalanceRow, InvoiceError, InvoiceRepository, InvoiceType, LifecycleRules,
    LineItem, NewInvoice, NewPayment, Payment, PaymentLedger, PaymentMethod, PaymentReceipt,
    PaymentStatus, Settlement, Visibility,
};
use bahi_shared::types::{InvoiceId, ItemId, LineItemId, PageRequest, PaymentId, UserId};

use crate::entities::{
    invoice_line_items, invoices, payments,
    sea_orm_active_enums::{
        InvoiceType as DbInvoiceType, PaymentMethod as DbPaymentMethod,
        PaymentStatus as DbPaymentStatus,
    },
};

/// Atomic counter bump. The first call for a key yields 1.
const NEXT_SEQUENCE_SQL: &str = r"
INSERT INTO invoice_counters (scope_key, last_value)
VALUES ($1, 1)
ON CONFLICT (scope_key)
DO UPDATE SET last_value = invoice_counters.last_value + 1, updated_at = now()
RETURNING last_value
";

/// Invoice store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct InvoiceStore {
    db: DatabaseConnection,
}

impl InvoiceStore {
    /// Create a new invoice store.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads line items and payments for one invoice header.
    async fn load<C: ConnectionTrait>(
        conn: &C,
        header: invoices::Model,
    ) -> Result<Invoice, InvoiceError> {
        let lines = invoice_line_items::Entity::find()
            .filter(invoice_line_items::Column::InvoiceId.eq(header.id))
            .order_by_asc(invoice_line_items::Column::Position)
            .all(conn)
            .await
            .map_err(db_err)?;

        let recorded = payments::Entity::find()
            .filter(payments::Column::InvoiceId.eq(header.id))
            .order_by_asc(payments::Column::CreatedAt)
            .order_by_asc(payments::Column::Id)
            .all(conn)
            .await
            .map_err(db_err)?;

        Ok(to_domain(header, lines, recorded))
    }

    /// Loads children for a page of headers with two queries in total.
    async fn load_many(&self, headers: Vec<invoices::Model>) -> Result<Vec<Invoice>, InvoiceError> {
        if headers.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = headers.iter().map(|h| h.id).collect();

        let mut lines_by_invoice: HashMap<i64, Vec<invoice_line_items::Model>> = HashMap::new();
        for line in invoice_line_items::Entity::find()
            .filter(invoice_line_items::Column::InvoiceId.is_in(ids.clone()))
            .order_by_asc(invoice_line_items::Column::InvoiceId)
            .order_by_asc(invoice_line_items::Column::Position)
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            lines_by_invoice.entry(line.invoice_id).or_default().push(line);
        }

        let mut payments_by_invoice: HashMap<i64, Vec<payments::Model>> = HashMap::new();
        for payment in payments::Entity::find()
            .filter(payments::Column::InvoiceId.is_in(ids))
            .order_by_asc(payments::Column::CreatedAt)
            .order_by_asc(payments::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            payments_by_invoice
                .entry(payment.invoice_id)
                .or_default()
                .push(payment);
        }

        Ok(headers
            .into_iter()
            .map(|header| {
                let lines = lines_by_invoice.remove(&header.id).unwrap_or_default();
                let recorded = payments_by_invoice.remove(&header.id).unwrap_or_default();
                to_domain(header, lines, recorded)
            })
            .collect())
    }
}

impl InvoiceRepository for InvoiceStore {
    async fn allocate_sequence(&self, counter_key: &str) -> Result<i64, InvoiceError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            NEXT_SEQUENCE_SQL,
            [counter_key.into()],
        );
        let row = self
            .db
            .query_one(stmt)
            .await
            .map_err(db_err)?
            .ok_or_else(|| InvoiceError::Repository("counter upsert returned no row".into()))?;
        let value: i64 = row.try_get("", "last_value").map_err(db_err)?;

        tracing::debug!(counter_key, value, "allocated invoice sequence");
        Ok(value)
    }

    async fn insert(&self, invoice: NewInvoice) -> Result<Invoice, InvoiceError> {
        let NewInvoice {
            invoice_number,
            prepared,
        } = invoice;
        let now = Utc::now().into();
        let totals = prepared.computed.totals;

        let txn = self.db.begin().await.map_err(db_err)?;

        let header = invoices::ActiveModel {
            invoice_number: Set(invoice_number.clone()),
            issuer_id: Set(prepared.issuer_id.into_inner()),
            recipient_id: Set(prepared.recipient_id.into_inner()),
            invoice_type: Set(to_db_invoice_type(prepared.invoice_type)),
            payment_status: Set(to_db_payment_status(prepared.settlement.status)),
            invoice_date: Set(prepared.invoice_date),
            due_date: Set(prepared.due_date),
            sub_total: Set(totals.sub_total),
            total_gst: Set(totals.total_gst),
            total_amount: Set(totals.total_amount),
            amount_paid: Set(prepared.settlement.amount_paid),
            amount_due: Set(prepared.settlement.amount_due),
            notes: Set(prepared.notes),
            terms: Set(prepared.terms),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| insert_err(e, &invoice_number))?;

        let mut lines = Vec::with_capacity(prepared.computed.line_items.len());
        for (position, line) in (0_i32..).zip(prepared.computed.line_items) {
            let model = invoice_line_items::ActiveModel {
                invoice_id: Set(header.id),
                position: Set(position),
                item_id: Set(line.item_id.map(ItemId::into_inner)),
                description: Set(line.description),
                quantity: Set(line.quantity),
                rate: Set(line.rate),
                gst_rate: Set(line.gst_rate),
                amount: Set(line.amount),
                gst_amount: Set(line.gst_amount),
                total_amount: Set(line.total_amount),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;
            lines.push(model);
        }

        txn.commit().await.map_err(db_err)?;

        tracing::info!(
            invoice_id = header.id,
            invoice_number = %header.invoice_number,
            amount = %header.total_amount,
            "invoice created"
        );
        Ok(to_domain(header, lines, Vec::new()))
    }

    async fn find_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, InvoiceError> {
        let Some(header) = invoices::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        Self::load(&self.db, header).await.map(Some)
    }

    async fn list(
        &self,
        visibility: Visibility,
        page: PageRequest,
    ) -> Result<(Vec<Invoice>, u64), InvoiceError> {
        let query = visible(invoices::Entity::find(), visibility);
        let total = query.clone().count(&self.db).await.map_err(db_err)?;

        let headers = query
            .order_by_desc(invoices::Column::CreatedAt)
            .order_by_desc(invoices::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok((self.load_many(headers).await?, total))
    }

    async fn delete_unpaid(&self, id: InvoiceId) -> Result<bool, InvoiceError> {
        let key = id.into_inner();
        let txn = self.db.begin().await.map_err(db_err)?;

        let locked = invoices::Entity::find_by_id(key)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?;
        if locked.is_none() {
            return Ok(false);
        }

        let payment_count = payments::Entity::find()
            .filter(payments::Column::InvoiceId.eq(key))
            .count(&txn)
            .await
            .map_err(db_err)?;
        if let Err(err) = LifecycleRules::ensure_deletable(id, payment_count) {
            tracing::warn!(invoice_id = key, payment_count, "refused to delete invoice with payments");
            return Err(err);
        }

        invoice_line_items::Entity::delete_many()
            .filter(invoice_line_items::Column::InvoiceId.eq(key))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        invoices::Entity::delete_by_id(key)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        tracing::info!(invoice_id = key, "invoice deleted");
        Ok(true)
    }

    async fn append_payment(&self, payment: NewPayment) -> Result<PaymentReceipt, InvoiceError> {
        let key = payment.invoice_id.into_inner();
        let txn = self.db.begin().await.map_err(db_err)?;

        let header = invoices::Entity::find_by_id(key)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(InvoiceError::NotFound(payment.invoice_id))?;

        if let Err(err) = PaymentLedger::ensure_within_due(payment.amount, header.amount_due) {
            tracing::warn!(
                invoice_id = key,
                amount = %payment.amount,
                amount_due = %header.amount_due,
                "rejected overpayment"
            );
            return Err(err);
        }

        let recorded = payments::ActiveModel {
            invoice_id: Set(key),
            amount: Set(payment.amount),
            payment_method: Set(to_db_payment_method(payment.payment_method)),
            payment_date: Set(payment.payment_date),
            reference: Set(payment.reference),
            notes: Set(payment.notes),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        let paid: Option<Decimal> = payments::Entity::find()
            .select_only()
            .column_as(Expr::col(payments::Column::Amount).sum(), "paid")
            .filter(payments::Column::InvoiceId.eq(key))
            .into_tuple::<Option<Decimal>>()
            .one(&txn)
            .await
            .map_err(db_err)?
            .flatten();
        let settlement = Settlement::from_paid(header.total_amount, paid.unwrap_or(Decimal::ZERO));

        let mut active: invoices::ActiveModel = header.into();
        active.amount_paid = Set(settlement.amount_paid);
        active.amount_due = Set(settlement.amount_due);
        active.payment_status = Set(to_db_payment_status(settlement.status));
        let updated = active.update(&txn).await.map_err(db_err)?;

        let invoice = Self::load(&txn, updated).await?;
        txn.commit().await.map_err(db_err)?;

        tracing::info!(
            invoice_id = key,
            payment_id = recorded.id,
            amount = %recorded.amount,
            status = %invoice.payment_status,
            "payment recorded"
        );
        Ok(PaymentReceipt {
            payment: to_domain_payment(recorded),
            invoice,
        })
    }

    async fn balance_rows(
        &self,
        visibility: Visibility,
    ) -> Result<Vec<InvoiceBalanceRow>, InvoiceError> {
        let rows: Vec<(i64, i64, NaiveDate, Decimal, Decimal, DbPaymentStatus)> =
            visible(invoices::Entity::find(), visibility)
                .select_only()
                .column(invoices::Column::IssuerId)
                .column(invoices::Column::RecipientId)
                .column(invoices::Column::InvoiceDate)
                .column(invoices::Column::TotalAmount)
                .column(invoices::Column::AmountDue)
                .column(invoices::Column::PaymentStatus)
                .into_tuple()
                .all(&self.db)
                .await
                .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(
                |(issuer, recipient, invoice_date, total_amount, amount_due, status)| {
                    InvoiceBalanceRow {
                        issuer_id: UserId::new(issuer),
                        recipient_id: UserId::new(recipient),
                        invoice_date,
                        total_amount,
                        amount_due,
                        payment_status: from_db_payment_status(status),
                    }
                },
            )
            .collect())
    }
}

fn visible(query: Select<invoices::Entity>, visibility: Visibility) -> Select<invoices::Entity> {
    match visibility {
        Visibility::All => query,
        Visibility::Party(user) => query.filter(
            Condition::any()
                .add(invoices::Column::IssuerId.eq(user.into_inner()))
                .add(invoices::Column::RecipientId.eq(user.into_inner())),
        ),
    }
}

fn db_err(err: DbErr) -> InvoiceError {
    tracing::error!(error = %err, "invoice store query failed");
    InvoiceError::Repository(err.to_string())
}

fn insert_err(err: DbErr, invoice_number: &str) -> InvoiceError {
    if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
        tracing::warn!(invoice_number, "invoice number collision");
        return InvoiceError::NumberCollision(invoice_number.to_string());
    }
    db_err(err)
}

fn to_domain(
    header: invoices::Model,
    lines: Vec<invoice_line_items::Model>,
    recorded: Vec<payments::Model>,
) -> Invoice {
    Invoice {
        id: InvoiceId::new(header.id),
        invoice_number: header.invoice_number,
        issuer_id: UserId::new(header.issuer_id),
        recipient_id: UserId::new(header.recipient_id),
        invoice_type: from_db_invoice_type(header.invoice_type),
        payment_status: from_db_payment_status(header.payment_status),
        invoice_date: header.invoice_date,
        due_date: header.due_date,
        sub_total: header.sub_total,
        total_gst: header.total_gst,
        total_amount: header.total_amount,
        amount_paid: header.amount_paid,
        amount_due: header.amount_due,
        notes: header.notes,
        terms: header.terms,
        line_items: lines.into_iter().map(to_domain_line).collect(),
        payments: recorded.into_iter().map(to_domain_payment).collect(),
        created_at: header.created_at.with_timezone(&Utc),
        updated_at: header.updated_at.with_timezone(&Utc),
    }
}

fn to_domain_line(model: invoice_line_items::Model) -> LineItem {
    LineItem {
        id: LineItemId::new(model.id),
        invoice_id: InvoiceId::new(model.invoice_id),
        position: model.position,
        description: model.description,
        item_id: model.item_id.map(ItemId::new),
        quantity: model.quantity,
        rate: model.rate,
        gst_rate: model.gst_rate,
        amount: model.amount,
        gst_amount: model.gst_amount,
        total_amount: model.total_amount,
    }
}

fn to_domain_payment(model: payments::Model) -> Payment {
    Payment {
        id: PaymentId::new(model.id),
        invoice_id: InvoiceId::new(model.invoice_id),
        amount: model.amount,
        payment_method: from_db_payment_method(model.payment_method),
        payment_date: model.payment_date,
        reference: model.reference,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn to_db_invoice_type(value: InvoiceType) -> DbInvoiceType {
    match value {
        InvoiceType::Cash => DbInvoiceType::Cash,
        InvoiceType::Credit => DbInvoiceType::Credit,
        InvoiceType::Debit => DbInvoiceType::Debit,
    }
}

fn from_db_invoice_type(value: DbInvoiceType) -> InvoiceType {
    match value {
        DbInvoiceType::Cash => InvoiceType::Cash,
        DbInvoiceType::Credit => InvoiceType::Credit,
        DbInvoiceType::Debit => InvoiceType::Debit,
    }
}

fn to_db_payment_status(value: PaymentStatus) -> DbPaymentStatus {
    match value {
        PaymentStatus::Pending => DbPaymentStatus::Pending,
        PaymentStatus::Partial => DbPaymentStatus::Partial,
        PaymentStatus::Paid => DbPaymentStatus::Paid,
    }
}

fn from_db_payment_status(value: DbPaymentStatus) -> PaymentStatus {
    match value {
        DbPaymentStatus::Pending => PaymentStatus::Pending,
        DbPaymentStatus::Partial => PaymentStatus::Partial,
        DbPaymentStatus::Paid => PaymentStatus::Paid,
    }
}

fn to_db_payment_method(value: PaymentMethod) -> DbPaymentMethod {
    match value {
        PaymentMethod::Cash => DbPaymentMethod::Cash,
        PaymentMethod::BankTransfer => DbPaymentMethod::BankTransfer,
        PaymentMethod::Cheque => DbPaymentMethod::Cheque,
        PaymentMethod::Upi => DbPaymentMethod::Upi,
        PaymentMethod::Card => DbPaymentMethod::Card,
    }
}

fn from_db_payment_method(value: DbPaymentMethod) -> PaymentMethod {
    match value {
        DbPaymentMethod::Cash => PaymentMethod::Cash,
        DbPaymentMethod::BankTransfer => PaymentMethod::BankTransfer,
        DbPaymentMethod::Cheque => PaymentMethod::Cheque,
        DbPaymentMethod::Upi => PaymentMethod::Upi,
        DbPaymentMethod::Card => PaymentMethod::Card,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_mappings_are_inverse() {
        for t in [InvoiceType::Cash, InvoiceType::Credit, InvoiceType::Debit] {
            assert_eq!(from_db_invoice_type(to_db_invoice_type(t)), t);
        }
        for s in [PaymentStatus::Pending, PaymentStatus::Partial, PaymentStatus::Paid] {
            assert_eq!(from_db_payment_status(to_db_payment_status(s)), s);
        }
        for m in [
            PaymentMethod::Cash,
            PaymentMethod::BankTransfer,
            PaymentMethod::Cheque,
            PaymentMethod::Upi,
            PaymentMethod::Card,
        ] {
            assert_eq!(from_db_payment_method(to_db_payment_method(m)), m);
        }
    }

    #[test]
    fn test_party_visibility_filters_both_columns() {
        use sea_orm::QueryTrait;

        let sql = visible(invoices::Entity::find(), Visibility::Party(UserId::new(7)))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""invoices"."issuer_id" = 7"#));
        assert!(sql.contains(r#""invoices"."recipient_id" = 7"#));
        assert!(sql.contains(" OR "));

        let sql = visible(invoices::Entity::find(), Visibility::All)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(!sql.contains("WHERE"));
    }
}
