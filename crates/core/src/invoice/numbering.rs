//! Invoice number allocation rules.
//!
//! Numbers look like `INV-2026-000042`. The sequence comes from an atomic
//! counter owned by the repository; this module only decides which counter
//! to use and how to render the result.

use std::fmt;

use bahi_shared::SequenceScopeConfig;

/// Width of the zero-padded sequence part.
pub const SEQUENCE_WIDTH: usize = 6;

/// Which counter a sequence value is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceScope {
    /// One counter for all invoices ever created.
    #[default]
    Global,
    /// A counter per calendar year.
    Yearly,
}

impl From<SequenceScopeConfig> for SequenceScope {
    fn from(config: SequenceScopeConfig) -> Self {
        match config {
            SequenceScopeConfig::Global => Self::Global,
            SequenceScopeConfig::Yearly => Self::Yearly,
        }
    }
}

/// A parsed invoice number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvoiceNumber {
    /// Prefix, e.g. `INV`.
    pub prefix: String,
    /// Creation year.
    pub year: i32,
    /// Sequence value (1-based).
    pub sequence: i64,
}

impl InvoiceNumber {
    /// Parses `<prefix>-<year>-<seq>`. The prefix itself may contain dashes.
    #[must_use]
    pub fn parse(number: &str) -> Option<Self> {
        let (rest, seq) = number.rsplit_once('-')?;
        let (prefix, year) = rest.rsplit_once('-')?;
        if prefix.is_empty()
            || year.len() != 4
            || seq.len() < SEQUENCE_WIDTH
            || !year.bytes().all(|b| b.is_ascii_digit())
            || !seq.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let sequence: i64 = seq.parse().ok()?;
        if sequence < 1 {
            return None;
        }

        Some(Self {
            prefix: prefix.to_string(),
            year: year.parse().ok()?,
            sequence,
        })
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:04}-{:0width$}",
            self.prefix,
            self.year,
            self.sequence,
            width = SEQUENCE_WIDTH
        )
    }
}

/// Decides counter keys and renders invoice numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingAuthority {
    prefix: String,
    scope: SequenceScope,
}

impl NumberingAuthority {
    /// Creates an authority with the given prefix and counter scope.
    #[must_use]
    pub fn new(prefix: impl Into<String>, scope: SequenceScope) -> Self {
        Self {
            prefix: prefix.into(),
            scope,
        }
    }

    /// Returns the configured prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the configured scope.
    #[must_use]
    pub fn scope(&self) -> SequenceScope {
        self.scope
    }

    /// Returns the counter key for an invoice created in `year`.
    #[must_use]
    pub fn counter_key(&self, year: i32) -> String {
        match self.scope {
            SequenceScope::Global => "global".to_string(),
            SequenceScope::Yearly => format!("year:{year}"),
        }
    }

    /// Renders the invoice number for a sequence value.
    #[must_use]
    pub fn format(&self, year: i32, sequence: i64) -> InvoiceNumber {
        InvoiceNumber {
            prefix: self.prefix.clone(),
            year,
            sequence,
        }
    }
}

impl Default for NumberingAuthority {
    fn default() -> Self {
        Self::new("INV", SequenceScope::Global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        let authority = NumberingAuthority::default();
        assert_eq!(authority.format(2026, 1).to_string(), "INV-2026-000001");
        assert_eq!(authority.format(2026, 42).to_string(), "INV-2026-000042");
        assert_eq!(
            authority.format(2027, 1_234_567).to_string(),
            "INV-2027-1234567"
        );
    }

    #[test]
    fn test_counter_keys() {
        let global = NumberingAuthority::new("INV", SequenceScope::Global);
        assert_eq!(global.counter_key(2025), global.counter_key(2026));

        let yearly = NumberingAuthority::new("INV", SequenceScope::Yearly);
        assert_eq!(yearly.counter_key(2026), "year:2026");
        assert_ne!(yearly.counter_key(2025), yearly.counter_key(2026));
    }

    #[test]
    fn test_parse() {
        let parsed = InvoiceNumber::parse("INV-2026-000042").unwrap();
        assert_eq!(parsed.prefix, "INV");
        assert_eq!(parsed.year, 2026);
        assert_eq!(parsed.sequence, 42);

        let parsed = InvoiceNumber::parse("ACME-B2B-2026-000007").unwrap();
        assert_eq!(parsed.prefix, "ACME-B2B");
        assert_eq!(parsed.sequence, 7);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(InvoiceNumber::parse("INV-2026").is_none());
        assert!(InvoiceNumber::parse("-2026-000001").is_none());
        assert!(InvoiceNumber::parse("INV-26-000001").is_none());
        assert!(InvoiceNumber::parse("INV-2026-42").is_none());
        assert!(InvoiceNumber::parse("INV-2026-00004x").is_none());
        assert!(InvoiceNumber::parse("INV-2026-000000").is_none());
    }

    #[test]
    fn test_scope_from_config() {
        assert_eq!(
            SequenceScope::from(SequenceScopeConfig::Yearly),
            SequenceScope::Yearly
        );
        assert_eq!(
            SequenceScope::from(SequenceScopeConfig::default()),
            SequenceScope::Global
        );
    }
}
