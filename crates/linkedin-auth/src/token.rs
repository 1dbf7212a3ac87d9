//! OAuth authorization code exchange
//!
//! POSTs `grant_type=authorization_code` to the token endpoint. A non-2xx
//! answer is surfaced as `Error::Upstream` carrying the provider's status
//! and body unchanged; nothing is retried.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::settings::OAuthSettings;

/// Response from the token endpoint.
///
/// Every field is optional so that a partial response can still be relayed
/// back as error details. Unknown fields are kept in `extra` for the same
/// reason.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TokenResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// OpenID Connect identity token, present when `openid` was granted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenResponse {
    /// Access token and lifetime, both required to persist a usable token.
    pub fn bearer(&self) -> Result<(&str, u64)> {
        let access_token = self
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::MalformedResponse("missing access_token".into()))?;
        let expires_in = self
            .expires_in
            .ok_or_else(|| Error::MalformedResponse("missing expires_in".into()))?;
        Ok((access_token, expires_in))
    }

    /// The response as JSON, for relaying as error details.
    pub fn to_details(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Exchange an authorization code for an access token (and identity token,
/// when `openid` is in scope).
pub async fn exchange_code(
    client: &reqwest::Client,
    settings: &OAuthSettings,
    code: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(settings.token_endpoint())
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", settings.redirect_uri.as_str()),
            ("client_id", settings.client_id.as_str()),
            ("client_secret", settings.client_secret.expose().as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("reading token response: {e}")))?;

    if !status.is_success() {
        warn!(status = status.as_u16(), "token endpoint rejected authorization code");
        return Err(Error::Upstream {
            status: status.as_u16(),
            body: json_or_text(text),
        });
    }

    debug!("authorization code exchanged");
    serde_json::from_str::<TokenResponse>(&text)
        .map_err(|e| Error::MalformedResponse(format!("invalid token response: {e}")))
}

/// Parse a body as JSON, falling back to the raw text.
fn json_or_text(text: String) -> serde_json::Value {
    serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Form;
    use axum::http::StatusCode;
    use axum::routing::post;
    use common::Secret;
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    fn settings(base: &str) -> OAuthSettings {
        OAuthSettings {
            client_id: "client-1".into(),
            client_secret: Secret::new("secret-1".into()),
            redirect_uri: "https://gw.example/linkedin/callback".into(),
            scopes: "openid".into(),
            oauth_base_url: base.into(),
        }
    }

    /// Token endpoint stand-in: accepts code "good", echoes the form back in
    /// the success body, rejects anything else with 400.
    async fn start_token_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new().route(
            "/oauth/v2/accessToken",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                if form.get("code").map(String::as_str) == Some("good") {
                    (
                        StatusCode::OK,
                        axum::Json(serde_json::json!({
                            "access_token": "AQX-token",
                            "expires_in": 5184000,
                            "id_token": "h.p.s",
                            "scope": "openid",
                            "echo": form,
                        })),
                    )
                } else {
                    (
                        StatusCode::BAD_REQUEST,
                        axum::Json(serde_json::json!({
                            "error": "invalid_request",
                            "error_description": "Unable to retrieve access token",
                        })),
                    )
                }
            }),
        );
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    #[test]
    fn token_response_keeps_unknown_fields() {
        let json = r#"{"access_token":"at","expires_in":60,"refresh_token_expires_in":99}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.bearer().unwrap(), ("at", 60));
        assert_eq!(token.to_details()["refresh_token_expires_in"], 99);
    }

    #[test]
    fn bearer_requires_access_token_and_expiry() {
        let token: TokenResponse = serde_json::from_str(r#"{"expires_in":60}"#).unwrap();
        assert!(matches!(token.bearer(), Err(Error::MalformedResponse(_))));

        let token: TokenResponse = serde_json::from_str(r#"{"access_token":"at"}"#).unwrap();
        assert!(matches!(token.bearer(), Err(Error::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn exchange_sends_authorization_code_grant() {
        let base = start_token_server().await;
        let token = exchange_code(&reqwest::Client::new(), &settings(&base), "good")
            .await
            .unwrap();

        assert_eq!(token.access_token.as_deref(), Some("AQX-token"));
        assert_eq!(token.id_token.as_deref(), Some("h.p.s"));
        let echo = &token.extra["echo"];
        assert_eq!(echo["grant_type"], "authorization_code");
        assert_eq!(echo["client_id"], "client-1");
        assert_eq!(echo["client_secret"], "secret-1");
        assert_eq!(echo["redirect_uri"], "https://gw.example/linkedin/callback");
    }

    #[tokio::test]
    async fn exchange_relays_upstream_status_and_body() {
        let base = start_token_server().await;
        let err = exchange_code(&reqwest::Client::new(), &settings(&base), "bad")
            .await
            .unwrap_err();

        match err {
            Error::Upstream { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body["error"], "invalid_request");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exchange_reports_unreachable_endpoint() {
        let err = exchange_code(
            &reqwest::Client::new(),
            &settings("http://127.0.0.1:1"),
            "good",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }
}
