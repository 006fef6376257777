//! Bahi API Server
//!
//! Main entry point for the Bahi invoicing service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bahi_api::{AppState, create_router};
use bahi_core::invoice::{InvoiceService, InvoiceSettings};
use bahi_db::{InvoiceStore, connect_with};
use bahi_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bahi=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to database
    let db = connect_with(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    // Create JWT service
    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_minutes: i64::try_from(config.jwt.access_token_expiry_secs / 60)
            .context("jwt.access_token_expiry_secs is too large")?,
    });

    // Create invoice service
    let settings = InvoiceSettings::from_config(&config.invoicing);
    info!(
        prefix = %settings.numbering.prefix(),
        scope = ?settings.numbering.scope(),
        default_due_days = settings.default_due_days,
        "Invoice numbering configured"
    );
    let invoice_service = InvoiceService::new(Arc::new(InvoiceStore::new(db)), settings);

    // Create router
    let app = create_router(AppState::new(invoice_service, jwt_service));

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
