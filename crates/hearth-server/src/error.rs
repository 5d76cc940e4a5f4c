use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use hearth_shared::TokenError;
use hearth_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    /// No verified identity; the connection or request is rejected before
    /// any state is created.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rejected before any persistence write.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TokenError> for ServerError {
    fn from(err: TokenError) -> Self {
        ServerError::Authentication(err.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Authentication(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl ServerError {
    /// Message safe to show to a client over the realtime connection.
    pub fn client_message(&self) -> String {
        match self {
            ServerError::Store(_) => "Storage error".to_string(),
            ServerError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}
