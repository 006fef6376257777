//! Who may see and change which invoice.
//!
//! Admins see everything. Everyone else sees the invoices they issued or
//! received. Read denials are reported as not-found so callers cannot probe
//! for invoice IDs.

use serde::{Deserialize, Serialize};

use bahi_shared::types::{InvoiceId, UserId};

use super::error::InvoiceError;
use super::types::Invoice;

/// The authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Acting user.
    pub user_id: UserId,
    /// Whether the user has administrative rights.
    pub is_admin: bool,
}

impl Principal {
    /// A regular user.
    #[must_use]
    pub const fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    /// An administrator.
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }
}

/// Filter applied to list and summary queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Every invoice.
    All,
    /// Invoices where the user is issuer or recipient.
    Party(UserId),
}

impl Visibility {
    /// Returns true if an invoice between these parties passes the filter.
    #[must_use]
    pub fn admits(&self, issuer_id: UserId, recipient_id: UserId) -> bool {
        match self {
            Self::All => true,
            Self::Party(user) => *user == issuer_id || *user == recipient_id,
        }
    }
}

/// Stateless access rules.
pub struct AccessPolicy;

impl AccessPolicy {
    /// Returns the list filter for `principal`.
    #[must_use]
    pub fn visibility(principal: &Principal) -> Visibility {
        if principal.is_admin {
            Visibility::All
        } else {
            Visibility::Party(principal.user_id)
        }
    }

    /// Returns true if `principal` may read `invoice`.
    #[must_use]
    pub fn can_read(principal: &Principal, invoice: &Invoice) -> bool {
        Self::visibility(principal).admits(invoice.issuer_id, invoice.recipient_id)
    }

    /// Returns true if `principal` may create an invoice issued by `issuer_id`.
    #[must_use]
    pub fn can_create_for(principal: &Principal, issuer_id: UserId) -> bool {
        principal.is_admin || principal.user_id == issuer_id
    }

    /// Returns true if `principal` may delete invoices.
    #[must_use]
    pub fn can_delete(principal: &Principal) -> bool {
        principal.is_admin
    }

    /// Passes `invoice` through if readable, otherwise reports it as missing.
    pub fn ensure_readable(principal: &Principal, invoice: Invoice) -> Result<Invoice, InvoiceError> {
        if Self::can_read(principal, &invoice) {
            Ok(invoice)
        } else {
            Err(InvoiceError::NotFound(invoice.id))
        }
    }

    /// Fails with `Forbidden` unless `principal` may issue as `issuer_id`.
    pub fn ensure_can_create_for(
        principal: &Principal,
        issuer_id: UserId,
    ) -> Result<(), InvoiceError> {
        if Self::can_create_for(principal, issuer_id) {
            Ok(())
        } else {
            Err(InvoiceError::Forbidden(format!(
                "cannot create invoices on behalf of user {issuer_id}"
            )))
        }
    }

    /// Fails with `Forbidden` unless `principal` is an admin.
    pub fn ensure_can_delete(principal: &Principal, invoice_id: InvoiceId) -> Result<(), InvoiceError> {
        if Self::can_delete(principal) {
            Ok(())
        } else {
            Err(InvoiceError::Forbidden(format!(
                "only administrators can delete invoice {invoice_id}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);
    const CAROL: UserId = UserId(3);

    #[test]
    fn test_visibility() {
        assert_eq!(
            AccessPolicy::visibility(&Principal::admin(CAROL)),
            Visibility::All
        );
        assert_eq!(
            AccessPolicy::visibility(&Principal::user(ALICE)),
            Visibility::Party(ALICE)
        );
    }

    #[test]
    fn test_party_filter() {
        let filter = Visibility::Party(ALICE);
        assert!(filter.admits(ALICE, BOB));
        assert!(filter.admits(BOB, ALICE));
        assert!(!filter.admits(BOB, CAROL));
        assert!(Visibility::All.admits(BOB, CAROL));
    }

    #[test]
    fn test_create_on_behalf() {
        assert!(AccessPolicy::can_create_for(&Principal::user(ALICE), ALICE));
        assert!(!AccessPolicy::can_create_for(&Principal::user(ALICE), BOB));
        assert!(AccessPolicy::can_create_for(&Principal::admin(CAROL), BOB));

        let err = AccessPolicy::ensure_can_create_for(&Principal::user(ALICE), BOB).unwrap_err();
        assert!(matches!(err, InvoiceError::Forbidden(_)));
    }

    #[test]
    fn test_delete_is_admin_only() {
        assert!(AccessPolicy::can_delete(&Principal::admin(CAROL)));
        assert!(!AccessPolicy::can_delete(&Principal::user(ALICE)));

        let err =
            AccessPolicy::ensure_can_delete(&Principal::user(ALICE), InvoiceId(5)).unwrap_err();
        assert_eq!(err.http_status_code(), 403);
    }
}
