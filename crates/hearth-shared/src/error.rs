use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Invalid issuer key")]
    InvalidIssuerKey,

    #[error("Token carries no identity")]
    MissingIdentity,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed event: {0}")]
    Malformed(String),

    #[error("Failed to encode event: {0}")]
    Encode(String),
}
