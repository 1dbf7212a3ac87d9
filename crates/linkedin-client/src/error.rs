//! Error types for LinkedIn API calls

use serde::Serialize;

/// Errors from LinkedIn API calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The provider could not be reached or the body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Non-success answer from the provider, relayed verbatim.
    #[error("LinkedIn returned {status}")]
    Upstream {
        status: u16,
        body: serde_json::Value,
    },

    #[error("media upload failed: {0}")]
    MediaUpload(#[from] MediaUploadError),

    /// A success response without the fields the protocol requires.
    #[error("malformed LinkedIn response: {0}")]
    MalformedResponse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Failure in either phase of a media upload.
///
/// Serializes as `{"error": ..., "details": ...}`. `details` holds the
/// provider's body: JSON when it was JSON, otherwise the raw text.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{error}")]
pub struct MediaUploadError {
    pub error: String,
    #[serde(skip)]
    pub status: Option<u16>,
    pub details: serde_json::Value,
}

impl MediaUploadError {
    pub fn new(error: impl Into<String>, status: Option<u16>, details: serde_json::Value) -> Self {
        Self {
            error: error.into(),
            status,
            details,
        }
    }
}

/// Result alias for API calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_upload_error_serializes_message_and_details() {
        let err = MediaUploadError::new(
            "Unexpected response during media upload.",
            Some(400),
            serde_json::Value::String("Bad Request".into()),
        );
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "error": "Unexpected response during media upload.",
                "details": "Bad Request",
            })
        );
        assert_eq!(err.to_string(), "Unexpected response during media upload.");
    }
}
