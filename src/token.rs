//! OAuth2 token provider seam
//!
//! The upload job never talks to an OAuth service directly; it requests and
//! invalidates bearer tokens through the [`TokenProvider`] trait. Hosts plug
//! in whatever token machinery they already have.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A bearer access token handed out by the token provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Create a token from its secret and optional expiry time.
    pub fn new(secret: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// The raw token string presented in the `Authorization` header.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// When the token stops being valid, if the provider reported it.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

/// Source of OAuth2 bearer tokens
///
/// The job holds at most one outstanding `request_token` call at a time and
/// calls `invalidate_token` before retrying after an authentication failure,
/// so providers that cache tokens server-side drop the stale entry.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Request a fresh access token for `account_id` covering `scopes`.
    ///
    /// # Errors
    ///
    /// Returns an error when no token could be obtained; the job classifies
    /// this as an authentication failure and retries within its budget.
    async fn request_token(&self, account_id: &str, scopes: &[String]) -> Result<AccessToken>;

    /// Tell the provider that `token` was rejected and must not be served
    /// from cache again.
    async fn invalidate_token(&self, account_id: &str, scopes: &[String], token: &str);
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn access_token_exposes_secret_and_expiry() {
        let expiry = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let token = AccessToken::new("ya29.secret", Some(expiry));

        assert_eq!(token.secret(), "ya29.secret");
        assert_eq!(token.expires_at(), Some(expiry));
    }

    #[test]
    fn access_token_without_expiry() {
        let token = AccessToken::new("opaque", None);
        assert_eq!(token.expires_at(), None);
    }
}
