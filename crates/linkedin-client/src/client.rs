//! Shared HTTP plumbing for LinkedIn API calls

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::Serialize;

use crate::error::{Error, Result};

/// LinkedIn REST API host
pub const DEFAULT_API_BASE_URL: &str = "https://api.linkedin.com";

/// Header required by the v2 endpoints that use Rest.li 2.0 key syntax
pub const RESTLI_PROTOCOL_HEADER: &str = "X-Restli-Protocol-Version";
pub const RESTLI_PROTOCOL_VERSION: &str = "2.0.0";

/// Link preview fetches are bounded; provider calls are not.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Status and body of a provider response, relayed to the gateway's caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: serde_json::Value,
}

/// Handle for calls against the LinkedIn REST API.
///
/// Cheap to clone; the underlying `reqwest::Client` shares its pool.
#[derive(Debug, Clone)]
pub struct LinkedInClient {
    pub(crate) http: reqwest::Client,
    api_base_url: String,
    pub(crate) metadata_timeout: Duration,
}

impl LinkedInClient {
    pub fn new(http: reqwest::Client, api_base_url: impl Into<String>) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
        }
    }

    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    /// Absolute URL for an API path such as `/v2/ugcPosts`.
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base_url)
    }

    /// API URL built from raw path segments, each percent-encoded.
    pub(crate) fn api_url_from_segments(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.api_base_url)
            .map_err(|e| Error::InvalidRequest(format!("invalid API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidRequest("API base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Read a response into status + body without assuming JSON.
///
/// Bodies declared as JSON that parse become JSON; anything else is kept as
/// a string. An empty body becomes `null`.
pub(crate) async fn read_reply(response: reqwest::Response) -> Result<UpstreamReply> {
    let status = response.status().as_u16();
    let is_json = declares_json(response.headers());
    let text = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("reading LinkedIn response: {e}")))?;
    Ok(UpstreamReply {
        status,
        body: body_value(text, is_json),
    })
}

fn declares_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

fn body_value(text: String, is_json: bool) -> serde_json::Value {
    if text.is_empty() {
        return serde_json::Value::Null;
    }
    if is_json && let Ok(value) = serde_json::from_str(&text) {
        return value;
    }
    serde_json::Value::String(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_value_prefers_declared_json() {
        assert_eq!(
            body_value(r#"{"id":"urn:li:share:1"}"#.into(), true),
            serde_json::json!({"id": "urn:li:share:1"})
        );
    }

    #[test]
    fn body_value_keeps_plain_text() {
        assert_eq!(
            body_value("Bad Request".into(), false),
            serde_json::Value::String("Bad Request".into())
        );
        // a bare number in a text/plain body stays text
        assert_eq!(
            body_value("42".into(), false),
            serde_json::Value::String("42".into())
        );
    }

    #[test]
    fn undeclared_json_stays_text() {
        assert_eq!(
            body_value(r#"{"status":401}"#.into(), false),
            serde_json::Value::String(r#"{"status":401}"#.into())
        );
        // declared but unparseable is kept verbatim too
        assert_eq!(
            body_value("{oops".into(), true),
            serde_json::Value::String("{oops".into())
        );
    }

    #[test]
    fn empty_body_is_null() {
        assert_eq!(body_value(String::new(), true), serde_json::Value::Null);
    }

    #[test]
    fn segments_are_encoded() {
        let client = LinkedInClient::new(reqwest::Client::new(), "https://api.linkedin.com/");
        let url = client
            .api_url_from_segments(&["v2", "invitations", "urn:li:invitation:1", "action", "a/b"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.linkedin.com/v2/invitations/urn:li:invitation:1/action/a%2Fb"
        );
        assert_eq!(client.api_url("/v2/ugcPosts"), "https://api.linkedin.com/v2/ugcPosts");
    }
}
