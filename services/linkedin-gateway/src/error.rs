//! HTTP-facing error taxonomy
//!
//! Every handler returns `Result<_, ApiError>`. Provider failures keep the
//! provider's status and body; only local failures pick their own status.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use linkedin_client::MediaUploadError;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

pub const NOT_AUTHORIZED_MESSAGE: &str =
    "Access token or profile URN not found. Please authorize first.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable LinkedIn token; the caller should visit `authorization_url`.
    #[error("Access token is missing or expired. Please generate a new token.")]
    Unauthorized { authorization_url: String },

    /// The client did not present the gateway API key.
    #[error("Unauthorized. Invalid or missing token.")]
    ClientUnauthorized,

    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<Value>,
    },

    #[error("{}", NOT_AUTHORIZED_MESSAGE)]
    NotAuthorized,

    /// LinkedIn answered with a failure; relayed under its own status.
    #[error("{message}")]
    Upstream {
        status: u16,
        message: String,
        body: Value,
    },

    #[error("Failed to upload media.")]
    MediaUpload(MediaUploadError),

    #[error("Malformed response from LinkedIn: {0}")]
    MalformedUpstreamResponse(String),

    #[error("LinkedIn request failed: {0}")]
    Transport(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    /// Replace the message on a relayed provider failure. Other variants
    /// are returned unchanged.
    pub fn with_upstream_message(self, message: &str) -> Self {
        match self {
            Self::Upstream { status, body, .. } => Self::Upstream {
                status,
                message: message.to_string(),
                body,
            },
            other => other,
        }
    }

    /// Failures caused by LinkedIn rather than the client or this process.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. }
                | Self::MediaUpload(_)
                | Self::MalformedUpstreamResponse(_)
                | Self::Transport(_)
        )
    }
}

/// Provider statuses pass through unless they are not failures (a 2xx that
/// still broke the protocol), which become 502.
fn relay_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            ApiError::Unauthorized { authorization_url } => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": message, "authorization_url": authorization_url }),
            ),
            ApiError::ClientUnauthorized => {
                (StatusCode::UNAUTHORIZED, json!({ "error": message }))
            }
            ApiError::BadRequest { details: None, .. } | ApiError::NotAuthorized => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            ApiError::BadRequest {
                details: Some(details),
                ..
            } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "details": details }),
            ),
            ApiError::Upstream { status, body, .. } => (
                relay_status(status),
                json!({ "error": message, "details": body }),
            ),
            ApiError::MediaUpload(upload) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "details": upload }),
            ),
            ApiError::MalformedUpstreamResponse(detail) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Malformed response from LinkedIn.", "details": detail }),
            ),
            ApiError::Transport(detail) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Failed to reach LinkedIn.", "details": detail }),
            ),
            ApiError::Internal(detail) => {
                error!(error = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error." }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<linkedin_auth::Error> for ApiError {
    fn from(err: linkedin_auth::Error) -> Self {
        use linkedin_auth::Error as E;
        match err {
            E::Unauthorized { authorization_url } => ApiError::Unauthorized { authorization_url },
            E::Upstream { status, body } => ApiError::Upstream {
                status,
                message: "LinkedIn token endpoint rejected the request.".into(),
                body,
            },
            E::Http(msg) => ApiError::Transport(msg),
            E::MalformedResponse(msg) => ApiError::MalformedUpstreamResponse(msg),
            E::IdToken(msg) => ApiError::BadRequest {
                message: "Failed to decode ID token.".into(),
                details: Some(Value::String(msg)),
            },
            E::MissingSubject => ApiError::bad_request("Missing 'sub' field in ID token."),
            E::Io(msg) | E::Serialize(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<linkedin_client::Error> for ApiError {
    fn from(err: linkedin_client::Error) -> Self {
        use linkedin_client::Error as E;
        match err {
            E::Http(msg) => ApiError::Transport(msg),
            E::Upstream { status, body } => ApiError::Upstream {
                status,
                message: "LinkedIn request failed.".into(),
                body,
            },
            E::MediaUpload(upload) => ApiError::MediaUpload(upload),
            E::MalformedResponse(msg) => ApiError::MalformedUpstreamResponse(msg),
            E::InvalidRequest(msg) => ApiError::bad_request(msg),
        }
    }
}
