//! Error types for OAuth and token storage operations

/// Errors from OAuth exchange, identity token decoding and token storage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Non-2xx from the token endpoint. `body` is relayed to the caller as-is.
    #[error("token endpoint returned {status}")]
    Upstream {
        status: u16,
        body: serde_json::Value,
    },

    #[error("malformed token response: {0}")]
    MalformedResponse(String),

    #[error("failed to decode ID token: {0}")]
    IdToken(String),

    #[error("missing 'sub' field in ID token")]
    MissingSubject,

    /// No usable access token is stored.
    #[error("access token is missing or expired")]
    Unauthorized { authorization_url: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialize(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
