//! Access tokens presented on connect.
//!
//! Tokens are minted by the account service (outside this repository) and
//! signed with its Ed25519 key. The realtime server only ever verifies and
//! decodes them.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;
use crate::types::UserId;

// Token signed by the account service, client presents it to the realtime server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub user_id: UserId,
    pub username: String,
    pub valid_until: DateTime<Utc>,
    pub signature: Vec<u8>,
}

impl AccessToken {
    /// URL-safe base64 of the token JSON, suitable for a query parameter or
    /// bearer header.
    pub fn encode(&self) -> Result<String, TokenError> {
        let json = serde_json::to_vec(self).map_err(|e| TokenError::Malformed(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    pub fn decode(raw: &str) -> Result<Self, TokenError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw.trim())
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(e.to_string()))
    }
}

// payload = user_id || 0x00 || username || 0x00 || valid_until (rfc3339)
fn signing_payload(user_id: &UserId, username: &str, valid_until: &DateTime<Utc>) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(user_id.as_str().as_bytes());
    payload.push(0);
    payload.extend_from_slice(username.as_bytes());
    payload.push(0);
    payload.extend_from_slice(valid_until.to_rfc3339().as_bytes());
    payload
}

pub fn verify_access_token(token: &AccessToken, issuer_pubkey: &[u8; 32]) -> Result<(), TokenError> {
    // The all-zero key is the unconfigured default and must reject everything.
    if issuer_pubkey.iter().all(|b| *b == 0) {
        return Err(TokenError::InvalidIssuerKey);
    }

    if token.user_id.is_empty() {
        return Err(TokenError::MissingIdentity);
    }

    if Utc::now() > token.valid_until {
        return Err(TokenError::Expired);
    }

    let verifying_key =
        VerifyingKey::from_bytes(issuer_pubkey).map_err(|_| TokenError::InvalidIssuerKey)?;

    let signature =
        Signature::from_slice(&token.signature).map_err(|_| TokenError::BadSignature)?;

    let payload = signing_payload(&token.user_id, &token.username, &token.valid_until);
    verifying_key
        .verify(&payload, &signature)
        .map_err(|_| TokenError::BadSignature)
}

pub fn create_access_token(
    user_id: &UserId,
    username: &str,
    valid_until: DateTime<Utc>,
    issuer_signing_key: &ed25519_dalek::SigningKey,
) -> AccessToken {
    use ed25519_dalek::Signer;

    let payload = signing_payload(user_id, username, &valid_until);
    let signature = issuer_signing_key.sign(&payload);

    AccessToken {
        user_id: user_id.clone(),
        username: username.to_string(),
        valid_until,
        signature: signature.to_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    #[test]
    fn test_access_token_valid() {
        let issuer = SigningKey::generate(&mut OsRng);
        let issuer_pubkey = issuer.verifying_key().to_bytes();

        let token = create_access_token(
            &UserId::from("u-alice"),
            "alice",
            Utc::now() + Duration::hours(1),
            &issuer,
        );

        assert_eq!(verify_access_token(&token, &issuer_pubkey), Ok(()));
    }

    #[test]
    fn test_access_token_expired() {
        let issuer = SigningKey::generate(&mut OsRng);
        let issuer_pubkey = issuer.verifying_key().to_bytes();

        let token = create_access_token(
            &UserId::from("u-alice"),
            "alice",
            Utc::now() - Duration::minutes(1),
            &issuer,
        );

        assert_eq!(verify_access_token(&token, &issuer_pubkey), Err(TokenError::Expired));
    }

    #[test]
    fn test_access_token_wrong_issuer() {
        let issuer = SigningKey::generate(&mut OsRng);
        let other = SigningKey::generate(&mut OsRng);

        let token = create_access_token(
            &UserId::from("u-alice"),
            "alice",
            Utc::now() + Duration::hours(1),
            &issuer,
        );

        assert_eq!(
            verify_access_token(&token, &other.verifying_key().to_bytes()),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_tampered_username_rejected() {
        let issuer = SigningKey::generate(&mut OsRng);
        let issuer_pubkey = issuer.verifying_key().to_bytes();

        let mut token = create_access_token(
            &UserId::from("u-alice"),
            "alice",
            Utc::now() + Duration::hours(1),
            &issuer,
        );
        token.username = "mallory".into();

        assert_eq!(
            verify_access_token(&token, &issuer_pubkey),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_zero_issuer_key_rejects_everything() {
        let issuer = SigningKey::generate(&mut OsRng);
        let token = create_access_token(
            &UserId::from("u-alice"),
            "alice",
            Utc::now() + Duration::hours(1),
            &issuer,
        );

        assert_eq!(
            verify_access_token(&token, &[0u8; 32]),
            Err(TokenError::InvalidIssuerKey)
        );
    }

    #[test]
    fn test_encode_decode() {
        let issuer = SigningKey::generate(&mut OsRng);
        let token = create_access_token(
            &UserId::from("u-alice"),
            "alice",
            Utc::now() + Duration::hours(1),
            &issuer,
        );

        let raw = token.encode().unwrap();
        let decoded = AccessToken::decode(&raw).unwrap();
        assert_eq!(decoded.user_id, token.user_id);
        assert_eq!(decoded.signature, token.signature);
        assert!(verify_access_token(&decoded, &issuer.verifying_key().to_bytes()).is_ok());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            AccessToken::decode("not a token!"),
            Err(TokenError::Malformed(_))
        ));
    }
}
