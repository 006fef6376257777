//! Database seeder for Bahi development and testing.
//!
//! Seeds an admin and two trading parties, a sample credit invoice with a
//! part payment, and prints bearer tokens for each seeded user.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use rust_decimal::Decimal;

use bahi_core::invoice::{
    InvoiceDraft, InvoiceService, InvoiceSettings, InvoiceType, LineItemDraft, PaymentDraft,
    PaymentMethod, Principal,
};
use bahi_db::{InvoiceStore, UserRepository};
use bahi_shared::types::UserId;
use bahi_shared::{AppConfig, JwtConfig, JwtService};

/// Seeded users: (email, full name, is admin).
const USERS: [(&str, &str, bool); 3] = [
    ("admin@bahi.dev", "Bahi Admin", true),
    ("asha@bahi.dev", "Asha Traders", false),
    ("ravi@bahi.dev", "Ravi Stores", false),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    println!("Connecting to database...");
    let db = bahi_db::connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    println!("Seeding users...");
    let users = UserRepository::new(db.clone());
    let mut seeded = Vec::with_capacity(USERS.len());
    for (email, full_name, is_admin) in USERS {
        let user = if let Some(existing) = users.find_by_email(email).await? {
            println!("  {email} already exists, skipping...");
            existing
        } else {
            users.create(email, full_name, is_admin).await?
        };
        seeded.push((UserId::new(user.id), email, is_admin));
    }

    let service = InvoiceService::new(
        Arc::new(InvoiceStore::new(db)),
        InvoiceSettings::from_config(&config.invoicing),
    );
    let (asha, _, _) = seeded[1];
    let (ravi, _, _) = seeded[2];
    seed_sample_invoice(&service, asha, ravi).await?;

    let jwt = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_minutes: 7 * 24 * 60,
    });
    println!("\nDevelopment tokens (valid 7 days):");
    for (id, email, is_admin) in seeded {
        let token = jwt.generate_access_token(id, email, is_admin)?;
        println!("  {email} (id {id}): {token}");
    }

    println!("\nSeeding complete!");
    Ok(())
}

/// Creates a two-line credit invoice from `issuer` to `recipient` and records
/// a part payment against it.
async fn seed_sample_invoice(
    service: &InvoiceService<InvoiceStore>,
    issuer: UserId,
    recipient: UserId,
) -> anyhow::Result<()> {
    println!("Seeding sample invoice...");
    let principal = Principal::user(issuer);
    let draft = InvoiceDraft {
        issuer_id: None,
        recipient_id: recipient,
        invoice_type: InvoiceType::Credit,
        invoice_date: None,
        due_date: None,
        notes: Some("Seeded for local development".to_string()),
        terms: Some("Net 30".to_string()),
        line_items: vec![
            LineItemDraft {
                description: "Basmati rice 25kg".to_string(),
                item_id: None,
                quantity: Decimal::new(2, 0),
                rate: Decimal::new(10_000, 2),
                gst_rate: 18,
            },
            LineItemDraft {
                description: "Delivery".to_string(),
                item_id: None,
                quantity: Decimal::ONE,
                rate: Decimal::new(5_000, 2),
                gst_rate: 5,
            },
        ],
    };

    let invoice = service.create(draft, &principal).await?;
    println!(
        "  {} for {} created",
        invoice.invoice_number, invoice.total_amount
    );

    let receipt = service
        .record_payment(
            invoice.id,
            PaymentDraft {
                amount: Decimal::new(10_000, 2),
                payment_method: PaymentMethod::Upi,
                payment_date: None,
                reference: Some("UTR-SEED-0001".to_string()),
                notes: None,
            },
            &principal,
        )
        .await?;
    println!(
        "  payment of {} recorded, {} still due ({})",
        receipt.payment.amount, receipt.invoice.amount_due, receipt.invoice.payment_status
    );
    Ok(())
}
