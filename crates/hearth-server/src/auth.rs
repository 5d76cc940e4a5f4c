//! Access token verification.
//!
//! Tokens are issued elsewhere; this module only verifies the Ed25519
//! signature against the configured issuer key and decodes the identity.

use axum::http::HeaderMap;
use tracing::debug;

use hearth_shared::token::{verify_access_token, AccessToken};
use hearth_shared::types::UserId;

use crate::error::ServerError;

/// An identity whose token has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub user_id: UserId,
    pub username: String,
}

/// Verifies access tokens signed by the account service.
#[derive(Clone)]
pub struct TokenVerifier {
    /// The account service's Ed25519 public key.
    issuer_pubkey: [u8; 32],
}

impl TokenVerifier {
    pub fn new(issuer_pubkey: [u8; 32]) -> Self {
        Self { issuer_pubkey }
    }

    /// Decode and verify a raw token string.
    pub fn verify(&self, raw: &str) -> Result<VerifiedIdentity, ServerError> {
        let token = AccessToken::decode(raw)?;

        if let Err(e) = verify_access_token(&token, &self.issuer_pubkey) {
            debug!(user = %token.user_id.short(), error = %e, "Token rejected");
            return Err(e.into());
        }

        Ok(VerifiedIdentity {
            user_id: token.user_id,
            username: token.username,
        })
    }

    /// Verify the `Authorization: Bearer <token>` header.
    pub fn verify_bearer(&self, headers: &HeaderMap) -> Result<VerifiedIdentity, ServerError> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let Some(token) = auth.strip_prefix("Bearer ") else {
            return Err(ServerError::Authentication("Missing bearer token".into()));
        };

        self.verify(token)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::TestIssuer;
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_valid_token() {
        let issuer = TestIssuer::new();
        let identity = issuer.verifier().verify(&issuer.token("u-a", "alice")).unwrap();
        assert_eq!(identity.user_id, UserId::from("u-a"));
        assert_eq!(identity.username, "alice");
    }

    #[test]
    fn test_expired_token() {
        let issuer = TestIssuer::new();
        let err = issuer.verifier().verify(&issuer.expired_token("u-a")).unwrap_err();
        assert!(matches!(err, ServerError::Authentication(_)));
    }

    #[test]
    fn test_token_from_other_issuer() {
        let issuer = TestIssuer::new();
        let other = TestIssuer::new();
        assert!(other.verifier().verify(&issuer.token("u-a", "alice")).is_err());
    }

    #[test]
    fn test_unconfigured_verifier_rejects() {
        let issuer = TestIssuer::new();
        let verifier = TokenVerifier::new([0u8; 32]);
        assert!(verifier.verify(&issuer.token("u-a", "alice")).is_err());
    }

    #[test]
    fn test_bearer_header() {
        let issuer = TestIssuer::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", issuer.token("u-a", "alice"))).unwrap(),
        );
        assert!(issuer.verifier().verify_bearer(&headers).is_ok());
    }

    #[test]
    fn test_missing_bearer_header() {
        let issuer = TestIssuer::new();
        let err = issuer.verifier().verify_bearer(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ServerError::Authentication(_)));
    }
}
