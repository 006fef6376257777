//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Invoicing rules.
    #[serde(default)]
    pub invoicing: InvoicingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration as read from config sources.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for verifying tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    86400 // 24 hours
}

/// How invoice sequence numbers are scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceScopeConfig {
    /// One running counter across all invoices ever created.
    #[default]
    Global,
    /// A separate counter per calendar year.
    Yearly,
}

/// Invoicing rules that are configuration rather than business law.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoicingConfig {
    /// Days added to the invoice date when no due date is supplied.
    #[serde(default = "default_due_days")]
    pub default_due_days: i64,
    /// Recognized GST percentages.
    #[serde(default = "default_gst_rates")]
    pub gst_rates: Vec<u8>,
    /// Prefix of generated invoice numbers.
    #[serde(default = "default_number_prefix")]
    pub number_prefix: String,
    /// Counter scope for invoice numbers.
    #[serde(default)]
    pub sequence_scope: SequenceScopeConfig,
    /// Page size used when a list request does not specify one.
    #[serde(default = "default_page_limit")]
    pub default_page_limit: u32,
    /// Largest page size a list request may ask for.
    #[serde(default = "default_max_page_limit")]
    pub max_page_limit: u32,
}

fn default_due_days() -> i64 {
    30
}

fn default_gst_rates() -> Vec<u8> {
    vec![0, 5, 12, 18, 28]
}

fn default_number_prefix() -> String {
    "INV".to_string()
}

fn default_page_limit() -> u32 {
    10
}

fn default_max_page_limit() -> u32 {
    100
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self {
            default_due_days: default_due_days(),
            gst_rates: default_gst_rates(),
            number_prefix: default_number_prefix(),
            sequence_scope: SequenceScopeConfig::default(),
            default_page_limit: default_page_limit(),
            max_page_limit: default_max_page_limit(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("BAHI")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("invoicing.gst_rates")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
