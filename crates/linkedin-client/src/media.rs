//! Two-phase media upload
//!
//! 1. Register the upload with the assets API, naming the owner and the
//!    feed-share recipe for the media type. LinkedIn answers with an upload
//!    URL and the asset URN.
//! 2. Download the bytes from the caller's `media_url` and PUT them to the
//!    upload URL. LinkedIn signals success with 201 and nothing else.
//!
//! Failures in either phase, transport errors included, come back as
//! `Error::MediaUpload` so the post composer can tell them apart from other
//! provider errors. Only a malformed 2xx registration is reported otherwise.

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::client::{
    LinkedInClient, RESTLI_PROTOCOL_HEADER, RESTLI_PROTOCOL_VERSION, read_reply,
};
use crate::error::{Error, MediaUploadError, Result};

const REGISTER_UPLOAD_PATH: &str = "/v2/assets?action=registerUpload";
const UPLOAD_MECHANISM_KEY: &str = "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest";

const REGISTER_FAILED: &str = "Failed to initialize media upload.";
const UPLOAD_FAILED: &str = "Unexpected response during media upload.";
const DOWNLOAD_FAILED: &str = "Failed to download media.";

/// Kinds of media a post can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Processing recipe requested at registration time
    pub fn recipe(self) -> &'static str {
        match self {
            MediaKind::Image => "urn:li:digitalmediaRecipe:feedshare-image",
            MediaKind::Video => "urn:li:digitalmediaRecipe:feedshare-video",
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegisterUploadResponse {
    value: RegisteredUpload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredUpload {
    upload_mechanism: UploadMechanism,
    asset: String,
}

#[derive(Debug, Deserialize)]
struct UploadMechanism {
    #[serde(rename = "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest")]
    http_request: MediaUploadHttpRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaUploadHttpRequest {
    upload_url: String,
}

/// Upload failure with no provider status, carrying the cause as text.
fn upload_failure(message: &str, cause: impl std::fmt::Display) -> MediaUploadError {
    MediaUploadError::new(message, None, serde_json::Value::String(cause.to_string()))
}

fn register_upload_body(owner: &str, kind: MediaKind) -> serde_json::Value {
    serde_json::json!({
        "registerUploadRequest": {
            "owner": owner,
            "recipes": [kind.recipe()],
            "serviceRelationships": [
                {
                    "identifier": "urn:li:userGeneratedContent",
                    "relationshipType": "OWNER"
                }
            ]
        }
    })
}

impl LinkedInClient {
    /// Upload the media at `media_url` on behalf of `owner`, returning the
    /// asset URN to reference from a post.
    #[instrument(skip(self, access_token))]
    pub async fn upload_media(
        &self,
        access_token: &str,
        owner: &str,
        media_url: &str,
        kind: MediaKind,
    ) -> Result<String> {
        let (upload_url, asset) = self.register_upload(access_token, owner, kind).await?;
        let bytes = self.download_media(media_url).await?;

        let response = self
            .http
            .put(&upload_url)
            .bearer_auth(access_token)
            .body(bytes)
            .send()
            .await
            .map_err(|e| upload_failure(UPLOAD_FAILED, e))?;

        let reply = read_reply(response)
            .await
            .map_err(|e| upload_failure(UPLOAD_FAILED, e))?;
        if reply.status != 201 {
            warn!(status = reply.status, body = %reply.body, "unexpected response during media upload");
            return Err(MediaUploadError::new(
                UPLOAD_FAILED,
                Some(reply.status),
                reply.body,
            )
            .into());
        }

        info!(asset = %asset, "media uploaded");
        Ok(asset)
    }

    async fn register_upload(
        &self,
        access_token: &str,
        owner: &str,
        kind: MediaKind,
    ) -> Result<(String, String)> {
        let response = self
            .http
            .post(self.api_url(REGISTER_UPLOAD_PATH))
            .bearer_auth(access_token)
            .header(RESTLI_PROTOCOL_HEADER, RESTLI_PROTOCOL_VERSION)
            .json(&register_upload_body(owner, kind))
            .send()
            .await
            .map_err(|e| upload_failure(REGISTER_FAILED, e))?;

        let reply = read_reply(response)
            .await
            .map_err(|e| upload_failure(REGISTER_FAILED, e))?;
        if !(200..300).contains(&reply.status) {
            warn!(status = reply.status, "media upload registration rejected");
            return Err(MediaUploadError::new(
                REGISTER_FAILED,
                Some(reply.status),
                reply.body,
            )
            .into());
        }

        let registered: RegisterUploadResponse = serde_json::from_value(reply.body)
            .map_err(|e| {
                Error::MalformedResponse(format!(
                    "registerUpload response lacks value.uploadMechanism.{UPLOAD_MECHANISM_KEY}.uploadUrl or value.asset: {e}"
                ))
            })?;
        Ok((
            registered.value.upload_mechanism.http_request.upload_url,
            registered.value.asset,
        ))
    }

    /// Fetch the raw bytes of the caller-supplied media.
    async fn download_media(&self, media_url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(media_url)
            .send()
            .await
            .map_err(|e| upload_failure(DOWNLOAD_FAILED, e))?;

        let status = response.status();
        if !status.is_success() {
            let reply = read_reply(response)
                .await
                .map_err(|e| upload_failure(DOWNLOAD_FAILED, e))?;
            return Err(MediaUploadError::new(
                DOWNLOAD_FAILED,
                Some(status.as_u16()),
                reply.body,
            )
            .into());
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| upload_failure(DOWNLOAD_FAILED, e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::http::StatusCode;
    use axum::routing::{get, post, put};
    use tokio::net::TcpListener;

    async fn serve(app: axum::Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn registered(upload_url: &str) -> serde_json::Value {
        serde_json::json!({
            "value": {
                "uploadMechanism": {
                    UPLOAD_MECHANISM_KEY: { "uploadUrl": upload_url }
                },
                "asset": "urn:li:digitalmediaAsset:A1"
            }
        })
    }

    /// Mock API whose registerUpload answers with `register` and whose
    /// `/media/pic.png` serves four bytes.
    async fn start_assets(register: (StatusCode, serde_json::Value), extra: axum::Router) -> String {
        let app = axum::Router::new()
            .route(
                "/v2/assets",
                post(move || {
                    let (status, body) = register.clone();
                    async move { (status, Json(body)) }
                }),
            )
            .route("/media/pic.png", get(|| async { vec![1u8, 2, 3, 4] }))
            .merge(extra);
        serve(app).await
    }

    async fn upload_error(client: &LinkedInClient, media_url: &str) -> MediaUploadError {
        match client
            .upload_media("at", "urn:li:person:abc", media_url, MediaKind::Image)
            .await
            .unwrap_err()
        {
            Error::MediaUpload(upload) => upload,
            other => panic!("expected media upload error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_registration_carries_provider_body() {
        let base = start_assets(
            (
                StatusCode::FORBIDDEN,
                serde_json::json!({ "message": "Not enough permissions", "status": 403 }),
            ),
            axum::Router::new(),
        )
        .await;
        let client = LinkedInClient::new(reqwest::Client::new(), &base);

        let err = upload_error(&client, &format!("{base}/media/pic.png")).await;
        assert_eq!(err.error, "Failed to initialize media upload.");
        assert_eq!(err.status, Some(403));
        assert_eq!(err.details["message"], "Not enough permissions");
    }

    #[tokio::test]
    async fn malformed_registration_is_reported_as_malformed() {
        let base = start_assets(
            (
                StatusCode::OK,
                serde_json::json!({ "value": { "asset": "urn:li:digitalmediaAsset:A1" } }),
            ),
            axum::Router::new(),
        )
        .await;
        let client = LinkedInClient::new(reqwest::Client::new(), &base);

        let err = client
            .upload_media("at", "urn:li:person:abc", &format!("{base}/media/pic.png"), MediaKind::Video)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn json_upload_rejection_keeps_structure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base = format!("http://{addr}");
        let app = axum::Router::new()
            .route(
                "/v2/assets",
                post({
                    let body = registered(&format!("{base}/upload/1"));
                    move || {
                        let body = body.clone();
                        async move { Json(body) }
                    }
                }),
            )
            .route("/media/pic.png", get(|| async { vec![1u8, 2, 3, 4] }))
            .route(
                "/upload/1",
                put(|| async {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(serde_json::json!({ "code": "QUOTA_EXCEEDED" })),
                    )
                }),
            );
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        let client = LinkedInClient::new(reqwest::Client::new(), &base);

        let err = upload_error(&client, &format!("{base}/media/pic.png")).await;
        assert_eq!(err.error, "Unexpected response during media upload.");
        assert_eq!(err.status, Some(500));
        assert_eq!(err.details, serde_json::json!({ "code": "QUOTA_EXCEEDED" }));
    }

    #[tokio::test]
    async fn unreachable_upload_url_is_an_upload_error() {
        let base = start_assets(
            (StatusCode::OK, registered("http://127.0.0.1:1/up")),
            axum::Router::new(),
        )
        .await;
        let client = LinkedInClient::new(reqwest::Client::new(), &base);

        let err = upload_error(&client, &format!("{base}/media/pic.png")).await;
        assert_eq!(err.error, "Unexpected response during media upload.");
        assert_eq!(err.status, None);
        assert!(err.details.is_string());
    }

    #[tokio::test]
    async fn unreachable_assets_api_is_an_upload_error() {
        let client = LinkedInClient::new(reqwest::Client::new(), "http://127.0.0.1:1");

        let err = upload_error(&client, "http://127.0.0.1:1/media/pic.png").await;
        assert_eq!(err.error, "Failed to initialize media upload.");
        assert_eq!(err.status, None);
        assert!(err.details.is_string());
    }

    #[tokio::test]
    async fn missing_media_fails_download() {
        let base = start_assets(
            (StatusCode::OK, registered("http://127.0.0.1:1/up")),
            axum::Router::new().route(
                "/media/gone.png",
                get(|| async { (StatusCode::NOT_FOUND, "no such file") }),
            ),
        )
        .await;
        let client = LinkedInClient::new(reqwest::Client::new(), &base);

        let err = upload_error(&client, &format!("{base}/media/gone.png")).await;
        assert_eq!(err.error, "Failed to download media.");
        assert_eq!(err.status, Some(404));
        assert_eq!(err.details, "no such file");
    }

    #[test]
    fn recipes_match_media_kind() {
        let body = register_upload_body("urn:li:person:abc", MediaKind::Image);
        assert_eq!(body["registerUploadRequest"]["owner"], "urn:li:person:abc");
        assert_eq!(
            body["registerUploadRequest"]["recipes"][0],
            "urn:li:digitalmediaRecipe:feedshare-image"
        );
        assert_eq!(
            body["registerUploadRequest"]["serviceRelationships"][0]["relationshipType"],
            "OWNER"
        );

        let body = register_upload_body("urn:li:person:abc", MediaKind::Video);
        assert_eq!(
            body["registerUploadRequest"]["recipes"][0],
            "urn:li:digitalmediaRecipe:feedshare-video"
        );
    }

    #[test]
    fn register_response_parses_nested_shape() {
        let body = serde_json::json!({
            "value": {
                "uploadMechanism": {
                    "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest": {
                        "headers": {},
                        "uploadUrl": "https://api.linkedin.com/mediaUpload/abc"
                    }
                },
                "mediaArtifact": "urn:li:digitalmediaMediaArtifact:(x)",
                "asset": "urn:li:digitalmediaAsset:C5522AQ"
            }
        });
        let parsed: RegisterUploadResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.value.asset, "urn:li:digitalmediaAsset:C5522AQ");
        assert_eq!(
            parsed.value.upload_mechanism.http_request.upload_url,
            "https://api.linkedin.com/mediaUpload/abc"
        );
    }

    #[test]
    fn register_response_missing_upload_url_is_rejected() {
        let body = serde_json::json!({
            "value": {
                "uploadMechanism": { "com.linkedin.digitalmedia.uploading.SomethingElse": {} },
                "asset": "urn:li:digitalmediaAsset:C5522AQ"
            }
        });
        assert!(serde_json::from_value::<RegisterUploadResponse>(body).is_err());
    }
}
