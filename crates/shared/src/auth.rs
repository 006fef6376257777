//! Identity claims carried by bearer tokens.
//!
//! Token issuance belongs to the identity collaborator; this crate only
//! needs the claim shape to verify tokens and derive a principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: UserId,
    /// User's email, informational only.
    #[serde(default)]
    pub email: String,
    /// Whether the user is an administrator.
    #[serde(default)]
    pub is_admin: bool,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(user_id: UserId, email: &str, is_admin: bool, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            email: email.to_string(),
            is_admin,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn claims_sets_expiration_and_iat() {
        let expires_at = Utc::now() + Duration::minutes(30);
        let before = Utc::now().timestamp();
        let claims = Claims::new(UserId(42), "asha@example.com", true, expires_at);
        let after = Utc::now().timestamp();

        assert_eq!(claims.user_id(), UserId(42));
        assert!(claims.is_admin);
        assert!(claims.iat >= before);
        assert!(claims.iat <= after);
        assert_eq!(claims.exp, expires_at.timestamp());
    }

    #[test]
    fn claims_serialize_subject_as_number() {
        let claims = Claims::new(UserId(7), "x@example.com", false, Utc::now());
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["sub"], 7);
        assert_eq!(value["is_admin"], false);
    }
}
