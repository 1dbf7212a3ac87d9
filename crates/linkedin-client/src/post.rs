//! UGC post composition and submission
//!
//! The payload shape depends on the post kind:
//! - TEXT: commentary only, category NONE
//! - URL: category ARTICLE with the link as the single media entry
//! - IMAGE / VIDEO: the media is uploaded first and referenced by asset URN
//!
//! For URL posts the page metadata is fetched but not placed in the payload;
//! LinkedIn builds its own preview from `originalUrl`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::client::{
    LinkedInClient, RESTLI_PROTOCOL_HEADER, RESTLI_PROTOCOL_VERSION, read_reply,
};
use crate::error::{Error, Result};
use crate::media::MediaKind;

const UGC_POSTS_PATH: &str = "/v2/ugcPosts";

/// Public URL of a published update, suffixed with the post URN
pub const FEED_UPDATE_URL: &str = "https://www.linkedin.com/feed/update/";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostKind {
    #[default]
    Text,
    Url,
    Image,
    Video,
}

/// Inbound post request. Empty strings and nulls count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostRequest {
    #[serde(rename = "type", default)]
    pub kind: PostKind,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
}

impl PostRequest {
    fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    fn media_url(&self) -> Option<&str> {
        self.media_url.as_deref().filter(|u| !u.is_empty())
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedPost {
    pub post_id: String,
    pub post_url: String,
    /// LinkedIn's response body, relayed to the caller
    pub response: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShareMediaCategory {
    None,
    Article,
    Image,
    Video,
}

/// What a post carries besides its commentary.
#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    None,
    Article { url: String },
    Media {
        kind: MediaKind,
        original_url: String,
        asset: String,
    },
}

/// Body of `POST /v2/ugcPosts`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UgcPost {
    pub author: String,
    pub lifecycle_state: &'static str,
    pub specific_content: SpecificContent,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpecificContent {
    #[serde(rename = "com.linkedin.ugc.ShareContent")]
    pub share_content: ShareContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareContent {
    pub share_commentary: ShareCommentary,
    pub share_media_category: ShareMediaCategory,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<ShareMedia>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareCommentary {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareMedia {
    pub status: &'static str,
    pub original_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Visibility {
    #[serde(rename = "com.linkedin.ugc.MemberNetworkVisibility")]
    pub member_network_visibility: &'static str,
}

impl UgcPost {
    /// A public, published post by `author`.
    pub fn new(author: &str, text: &str, attachment: Attachment) -> Self {
        let (category, media) = match attachment {
            Attachment::None => (ShareMediaCategory::None, vec![]),
            Attachment::Article { url } => (
                ShareMediaCategory::Article,
                vec![ShareMedia {
                    status: "READY",
                    original_url: url,
                    media: None,
                }],
            ),
            Attachment::Media {
                kind,
                original_url,
                asset,
            } => (
                match kind {
                    MediaKind::Image => ShareMediaCategory::Image,
                    MediaKind::Video => ShareMediaCategory::Video,
                },
                vec![ShareMedia {
                    status: "READY",
                    original_url,
                    media: Some(asset),
                }],
            ),
        };

        Self {
            author: author.to_string(),
            lifecycle_state: "PUBLISHED",
            specific_content: SpecificContent {
                share_content: ShareContent {
                    share_commentary: ShareCommentary {
                        text: text.to_string(),
                    },
                    share_media_category: category,
                    media,
                },
            },
            visibility: Visibility {
                member_network_visibility: "PUBLIC",
            },
        }
    }
}

impl LinkedInClient {
    /// Compose and submit a post for `author` (a member URN).
    ///
    /// IMAGE and VIDEO posts upload their media first; an upload failure
    /// returns `Error::MediaUpload` and nothing is posted.
    #[instrument(skip_all, fields(kind = ?request.kind))]
    pub async fn publish_post(
        &self,
        access_token: &str,
        author: &str,
        request: &PostRequest,
    ) -> Result<PublishedPost> {
        let attachment = match request.kind {
            PostKind::Text => Attachment::None,
            PostKind::Url => match request.url() {
                Some(url) => {
                    let metadata = self.fetch_url_metadata(url).await;
                    debug!(
                        title = %metadata.title,
                        has_image = !metadata.image.is_empty(),
                        "link metadata fetched (not embedded in payload)"
                    );
                    Attachment::Article {
                        url: url.to_string(),
                    }
                }
                None => Attachment::None,
            },
            PostKind::Image | PostKind::Video => {
                let kind = if request.kind == PostKind::Image {
                    MediaKind::Image
                } else {
                    MediaKind::Video
                };
                let media_url = request.media_url().ok_or_else(|| {
                    Error::InvalidRequest(format!("media_url is required for {:?} posts", kind))
                })?;
                let asset = self
                    .upload_media(access_token, author, media_url, kind)
                    .await?;
                Attachment::Media {
                    kind,
                    original_url: media_url.to_string(),
                    asset,
                }
            }
        };

        let post = UgcPost::new(author, request.text(), attachment);
        self.submit_ugc_post(access_token, &post).await
    }

    /// POST a fully assembled payload. Only 201 counts as success.
    pub async fn submit_ugc_post(&self, access_token: &str, post: &UgcPost) -> Result<PublishedPost> {
        let response = self
            .http
            .post(self.api_url(UGC_POSTS_PATH))
            .bearer_auth(access_token)
            .header(RESTLI_PROTOCOL_HEADER, RESTLI_PROTOCOL_VERSION)
            .json(post)
            .send()
            .await
            .map_err(|e| Error::Http(format!("ugcPosts request failed: {e}")))?;

        let reply = read_reply(response).await?;
        if reply.status != 201 {
            warn!(status = reply.status, "LinkedIn rejected post");
            return Err(Error::Upstream {
                status: reply.status,
                body: reply.body,
            });
        }

        let post_id = reply
            .body
            .get("id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| Error::MalformedResponse("ugcPosts response has no id".into()))?
            .to_string();

        info!(post_id, "post published");
        Ok(PublishedPost {
            post_url: format!("{FEED_UPDATE_URL}{post_id}"),
            post_id,
            response: reply.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::{get, post, put};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    fn payload(post: &UgcPost) -> serde_json::Value {
        serde_json::to_value(post).unwrap()
    }

    #[test]
    fn text_post_has_no_media() {
        let json = payload(&UgcPost::new("urn:li:person:abc", "hello", Attachment::None));
        let content = &json["specificContent"]["com.linkedin.ugc.ShareContent"];
        assert_eq!(content["shareMediaCategory"], "NONE");
        assert_eq!(content["shareCommentary"]["text"], "hello");
        assert!(content.get("media").is_none());
        assert_eq!(json["author"], "urn:li:person:abc");
        assert_eq!(json["lifecycleState"], "PUBLISHED");
        assert_eq!(
            json["visibility"]["com.linkedin.ugc.MemberNetworkVisibility"],
            "PUBLIC"
        );
    }

    #[test]
    fn url_post_is_an_article() {
        let json = payload(&UgcPost::new(
            "urn:li:person:abc",
            "read this",
            Attachment::Article {
                url: "https://example.com".into(),
            },
        ));
        let content = &json["specificContent"]["com.linkedin.ugc.ShareContent"];
        assert_eq!(content["shareMediaCategory"], "ARTICLE");
        assert_eq!(content["media"][0]["status"], "READY");
        assert_eq!(content["media"][0]["originalUrl"], "https://example.com");
        assert!(content["media"][0].get("media").is_none());
        assert!(content["media"][0].get("title").is_none());
    }

    #[test]
    fn media_post_references_asset() {
        let json = payload(&UgcPost::new(
            "urn:li:person:abc",
            "clip",
            Attachment::Media {
                kind: MediaKind::Video,
                original_url: "https://cdn.example/v.mp4".into(),
                asset: "urn:li:digitalmediaAsset:V1".into(),
            },
        ));
        let content = &json["specificContent"]["com.linkedin.ugc.ShareContent"];
        assert_eq!(content["shareMediaCategory"], "VIDEO");
        assert_eq!(content["media"][0]["media"], "urn:li:digitalmediaAsset:V1");
        assert_eq!(content["media"][0]["originalUrl"], "https://cdn.example/v.mp4");
    }

    #[test]
    fn post_request_defaults_to_text() {
        let request: PostRequest = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(request.kind, PostKind::Text);
        let request: PostRequest =
            serde_json::from_str(r#"{"type":"URL","url":""}"#).unwrap();
        assert_eq!(request.kind, PostKind::Url);
        assert!(request.url().is_none());
        assert!(serde_json::from_str::<PostRequest>(r#"{"type":"POLL"}"#).is_err());
    }

    #[test]
    fn null_text_is_empty_commentary() {
        let request: PostRequest =
            serde_json::from_str(r#"{"type":"TEXT","text":null}"#).unwrap();
        assert_eq!(request.text(), "");
        let request: PostRequest = serde_json::from_str(r#"{"type":"TEXT"}"#).unwrap();
        assert_eq!(request.text(), "");
    }

    /// Recorded traffic seen by the mock LinkedIn server.
    #[derive(Default)]
    struct Seen {
        ugc_posts: AtomicUsize,
        last_post: Mutex<Option<serde_json::Value>>,
        uploaded: Mutex<Option<Vec<u8>>>,
    }

    /// Mock API: registerUpload, upload target, media source and ugcPosts.
    /// `upload_status` controls what the upload PUT answers.
    async fn start_linkedin(upload_status: StatusCode) -> (String, Arc<Seen>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base = format!("http://{addr}");
        let seen = Arc::new(Seen::default());

        let register_base = base.clone();
        let app = axum::Router::new()
            .route(
                "/v2/assets",
                post(move || {
                    let base = register_base.clone();
                    async move {
                        axum::Json(serde_json::json!({
                            "value": {
                                "uploadMechanism": {
                                    "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest": {
                                        "uploadUrl": format!("{base}/upload/1")
                                    }
                                },
                                "asset": "urn:li:digitalmediaAsset:A1"
                            }
                        }))
                    }
                }),
            )
            .route(
                "/upload/1",
                put(move |State(seen): State<Arc<Seen>>, body: Bytes| async move {
                    *seen.uploaded.lock().await = Some(body.to_vec());
                    (upload_status, "upload rejected: quota")
                }),
            )
            .route("/media/pic.png", get(|| async { vec![0x89u8, b'P', b'N', b'G'] }))
            .route(
                "/v2/ugcPosts",
                post(
                    |State(seen): State<Arc<Seen>>,
                     axum::Json(body): axum::Json<serde_json::Value>| async move {
                        seen.ugc_posts.fetch_add(1, Ordering::SeqCst);
                        *seen.last_post.lock().await = Some(body);
                        (
                            StatusCode::CREATED,
                            axum::Json(serde_json::json!({ "id": "urn:li:share:42" })),
                        )
                    },
                ),
            )
            .with_state(seen.clone());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (base, seen)
    }

    #[tokio::test]
    async fn image_post_uploads_then_posts() {
        let (base, seen) = start_linkedin(StatusCode::CREATED).await;
        let client = LinkedInClient::new(reqwest::Client::new(), &base);
        let request = PostRequest {
            kind: PostKind::Image,
            text: Some("look".into()),
            url: None,
            media_url: Some(format!("{base}/media/pic.png")),
        };

        let published = client
            .publish_post("at", "urn:li:person:abc", &request)
            .await
            .unwrap();

        assert_eq!(published.post_id, "urn:li:share:42");
        assert_eq!(
            published.post_url,
            "https://www.linkedin.com/feed/update/urn:li:share:42"
        );
        assert_eq!(
            seen.uploaded.lock().await.as_deref(),
            Some(&[0x89u8, b'P', b'N', b'G'][..])
        );
        let last = seen.last_post.lock().await.clone().unwrap();
        let content = &last["specificContent"]["com.linkedin.ugc.ShareContent"];
        assert_eq!(content["shareMediaCategory"], "IMAGE");
        assert_eq!(content["media"][0]["media"], "urn:li:digitalmediaAsset:A1");
    }

    #[tokio::test]
    async fn failed_upload_never_reaches_ugc_posts() {
        let (base, seen) = start_linkedin(StatusCode::BAD_REQUEST).await;
        let client = LinkedInClient::new(reqwest::Client::new(), &base);
        let request = PostRequest {
            kind: PostKind::Image,
            text: Some("look".into()),
            url: None,
            media_url: Some(format!("{base}/media/pic.png")),
        };

        let err = client
            .publish_post("at", "urn:li:person:abc", &request)
            .await
            .unwrap_err();

        match err {
            Error::MediaUpload(upload) => {
                assert_eq!(upload.status, Some(400));
                assert_eq!(upload.details, "upload rejected: quota");
            }
            other => panic!("expected media upload error, got {other:?}"),
        }
        assert_eq!(seen.ugc_posts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn url_post_does_not_embed_metadata() {
        let (base, seen) = start_linkedin(StatusCode::CREATED).await;
        let client = LinkedInClient::new(reqwest::Client::new(), &base);
        let request = PostRequest {
            kind: PostKind::Url,
            text: Some("read".into()),
            // unreachable page: metadata falls back, post still goes out
            url: Some("http://127.0.0.1:1/article".into()),
            media_url: None,
        };

        client
            .publish_post("at", "urn:li:person:abc", &request)
            .await
            .unwrap();

        let last = seen.last_post.lock().await.clone().unwrap();
        let content = &last["specificContent"]["com.linkedin.ugc.ShareContent"];
        assert_eq!(content["shareMediaCategory"], "ARTICLE");
        assert_eq!(
            content["media"],
            serde_json::json!([{ "status": "READY", "originalUrl": "http://127.0.0.1:1/article" }])
        );
    }

    #[tokio::test]
    async fn media_post_without_media_url_is_invalid() {
        let client = LinkedInClient::new(reqwest::Client::new(), "http://127.0.0.1:1");
        let request = PostRequest {
            kind: PostKind::Video,
            ..Default::default()
        };
        let err = client
            .publish_post("at", "urn:li:person:abc", &request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn rejected_post_relays_status_and_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new().route(
            "/v2/ugcPosts",
            post(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    axum::Json(serde_json::json!({
                        "message": "Duplicate post",
                        "status": 422
                    })),
                )
            }),
        );
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let client = LinkedInClient::new(reqwest::Client::new(), format!("http://{addr}"));
        let post = UgcPost::new("urn:li:person:abc", "again", Attachment::None);
        match client.submit_ugc_post("at", &post).await.unwrap_err() {
            Error::Upstream { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body["message"], "Duplicate post");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }
}
