//! Initial database migration.
//!
//! Creates the users, invoices, line items, payments and invoice counter
//! tables together with their enums, constraints and indexes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: PARTIES
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;

        // ============================================================
        // PART 3: INVOICES
        // ============================================================
        db.execute_unprepared(INVOICES_SQL).await?;
        db.execute_unprepared(INVOICE_LINE_ITEMS_SQL).await?;
        db.execute_unprepared(INVOICE_COUNTERS_SQL).await?;

        // ============================================================
        // PART 4: PAYMENTS
        // ============================================================
        db.execute_unprepared(PAYMENTS_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE invoice_type AS ENUM ('CASH', 'CREDIT', 'DEBIT');

CREATE TYPE payment_status AS ENUM ('PENDING', 'PARTIAL', 'PAID');

CREATE TYPE payment_method AS ENUM (
    'CASH',
    'BANK_TRANSFER',
    'CHEQUE',
    'UPI',
    'CARD'
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id BIGSERIAL PRIMARY KEY,
    email VARCHAR(255) NOT NULL UNIQUE,
    full_name VARCHAR(255) NOT NULL,
    is_admin BOOLEAN NOT NULL DEFAULT false,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_users_email ON users(email) WHERE is_active = true;
";

const INVOICES_SQL: &str = r"
CREATE TABLE invoices (
    id BIGSERIAL PRIMARY KEY,
    invoice_number VARCHAR(50) NOT NULL UNIQUE,
    issuer_id BIGINT NOT NULL REFERENCES users(id),
    recipient_id BIGINT NOT NULL REFERENCES users(id),
    invoice_type invoice_type NOT NULL,
    payment_status payment_status NOT NULL DEFAULT 'PENDING',
    invoice_date DATE NOT NULL,
    due_date DATE NOT NULL,

    -- Derived amounts, always written by the application
    sub_total NUMERIC(15, 2) NOT NULL,
    total_gst NUMERIC(15, 2) NOT NULL,
    total_amount NUMERIC(15, 2) NOT NULL,
    amount_paid NUMERIC(15, 2) NOT NULL DEFAULT 0,
    amount_due NUMERIC(15, 2) NOT NULL,

    notes TEXT,
    terms TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_invoice_parties CHECK (
        invoice_type = 'CASH' OR issuer_id <> recipient_id
    ),
    CONSTRAINT chk_invoice_dates CHECK (due_date >= invoice_date),
    CONSTRAINT chk_invoice_sub_total CHECK (sub_total >= 0 AND total_gst >= 0),
    CONSTRAINT chk_invoice_total CHECK (total_amount = sub_total + total_gst),
    CONSTRAINT chk_invoice_paid CHECK (amount_paid BETWEEN 0 AND total_amount),
    CONSTRAINT chk_invoice_due CHECK (amount_due = total_amount - amount_paid)
);

CREATE INDEX idx_invoices_issuer ON invoices(issuer_id, created_at DESC);
CREATE INDEX idx_invoices_recipient ON invoices(recipient_id, created_at DESC);
CREATE INDEX idx_invoices_created ON invoices(created_at DESC, id DESC);
CREATE INDEX idx_invoices_unpaid ON invoices(payment_status)
    WHERE payment_status <> 'PAID';
";

const INVOICE_LINE_ITEMS_SQL: &str = r"
CREATE TABLE invoice_line_items (
    id BIGSERIAL PRIMARY KEY,
    invoice_id BIGINT NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    item_id BIGINT,
    description TEXT NOT NULL,
    quantity NUMERIC(10, 3) NOT NULL,
    rate NUMERIC(15, 2) NOT NULL,
    gst_rate INTEGER NOT NULL,
    amount NUMERIC(15, 2) NOT NULL,
    gst_amount NUMERIC(15, 2) NOT NULL,
    total_amount NUMERIC(15, 2) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_line_item_position UNIQUE (invoice_id, position),
    CONSTRAINT chk_line_description CHECK (length(trim(description)) > 0),
    CONSTRAINT chk_line_quantity CHECK (quantity >= 0),
    CONSTRAINT chk_line_rate CHECK (rate >= 0),
    CONSTRAINT chk_line_gst_rate CHECK (gst_rate >= 0),
    CONSTRAINT chk_line_total CHECK (total_amount = amount + gst_amount)
);
";

const INVOICE_COUNTERS_SQL: &str = r"
-- One row per numbering scope ('global' or 'year:YYYY')
CREATE TABLE invoice_counters (
    scope_key VARCHAR(32) PRIMARY KEY,
    last_value BIGINT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_counter_positive CHECK (last_value > 0)
);
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id BIGSERIAL PRIMARY KEY,
    invoice_id BIGINT NOT NULL REFERENCES invoices(id) ON DELETE RESTRICT,
    amount NUMERIC(15, 2) NOT NULL,
    payment_method payment_method NOT NULL,
    payment_date DATE NOT NULL,
    reference VARCHAR(100),
    notes TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_payment_amount CHECK (amount > 0)
);

CREATE INDEX idx_payments_invoice ON payments(invoice_id, created_at);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: touch_updated_at
-- Keeps updated_at current on every row update.
-- ============================================================
CREATE OR REPLACE FUNCTION touch_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at := now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_users_updated_at
BEFORE UPDATE ON users
FOR EACH ROW
EXECUTE FUNCTION touch_updated_at();

CREATE TRIGGER trg_invoices_updated_at
BEFORE UPDATE ON invoices
FOR EACH ROW
EXECUTE FUNCTION touch_updated_at();

-- ============================================================
-- FUNCTION: prevent_line_item_changes
-- Issued invoices are immutable; line items may only be inserted
-- or removed together with their invoice.
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_line_item_changes()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Invoice line items cannot be modified';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_line_item_update
BEFORE UPDATE ON invoice_line_items
FOR EACH ROW
EXECUTE FUNCTION prevent_line_item_changes();
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- Order matters due to foreign key constraints
-- ============================================================

-- Drop triggers
DROP TRIGGER IF EXISTS trg_prevent_line_item_update ON invoice_line_items;
DROP TRIGGER IF EXISTS trg_invoices_updated_at ON invoices;
DROP TRIGGER IF EXISTS trg_users_updated_at ON users;

-- Drop functions
DROP FUNCTION IF EXISTS prevent_line_item_changes();
DROP FUNCTION IF EXISTS touch_updated_at();

-- Drop tables (reverse order of creation)
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS invoice_counters CASCADE;
DROP TABLE IF EXISTS invoice_line_items CASCADE;
DROP TABLE IF EXISTS invoices CASCADE;
DROP TABLE IF EXISTS users CASCADE;

-- Drop enums
DROP TYPE IF EXISTS payment_method CASCADE;
DROP TYPE IF EXISTS payment_status CASCADE;
DROP TYPE IF EXISTS invoice_type CASCADE;
";
