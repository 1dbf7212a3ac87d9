//! LinkedIn endpoint handlers
//!
//! Bodies are taken as raw bytes and parsed here so that the token checks
//! run before any body validation, and so that `resolve` can accept
//! anything at all.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use linkedin_auth::{ProfileReference, StoredToken};
use linkedin_client::{CreateInvitation, InvitationAction, PostRequest, UpstreamReply};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::info;

use crate::AppState;
use crate::error::ApiError;
use crate::metrics::record_upstream_error;
use crate::oauth;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
struct GenerateTokenRequest {
    #[serde(default)]
    authorization_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
}

/// POST /linkedin/generate_token
pub async fn generate_token(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    let request: GenerateTokenRequest = parse_lenient(&body);
    let code = request
        .authorization_code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Authorization code is required"))?;

    let access_token = oauth::generate_token(&state, &code).await?;
    Ok(Json(json!({
        "message": "Token generated successfully",
        "access_token": access_token,
    })))
}

/// GET /linkedin/auth
pub async fn auth(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state.validator.validate().await?;
    Ok(Json(json!({
        "message": "Complete the authorization by visiting the URL below:",
        "authorization_url": state.validator.authorization_url(),
    })))
}

/// GET /linkedin/callback?code=
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Json<Value>> {
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Authorization code not found."))?;

    let profile_urn = oauth::complete_authorization(&state, &code).await?;
    Ok(Json(json!({
        "message": "Authorization successful.",
        "profile_urn": profile_urn,
    })))
}

/// POST /linkedin/post
pub async fn post(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    state.validator.validate().await?;
    let request: PostRequest = parse_strict(&body)?;
    let (token, profile) = credentials(&state).await?;

    let published = state
        .linkedin
        .publish_post(&token.access_token, &profile.profile_urn, &request)
        .await
        .map_err(|e| {
            let err = ApiError::from(e).with_upstream_message("Failed to post on LinkedIn.");
            if err.is_upstream() {
                record_upstream_error("post");
            }
            err
        })?;

    Ok(Json(json!({
        "message": "Post successful.",
        "response": published.response,
        "post_url": published.post_url,
    })))
}

/// POST /linkedin/invitation/create
pub async fn create_invitation(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let token = stored_token(&state).await?;
    let invitation: CreateInvitation = parse_strict(&body)?;
    let reply = state
        .linkedin
        .create_invitation(&token.access_token, &invitation)
        .await;
    relay("invitation_create", reply)
}

/// GET /linkedin/invitation/retrieve
pub async fn retrieve_invitations(State(state): State<AppState>) -> ApiResult<Response> {
    let token = stored_token(&state).await?;
    let reply = state.linkedin.list_invitations(&token.access_token).await;
    relay("invitation_list", reply)
}

/// POST /linkedin/invitation/action
pub async fn invitation_action(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let token = stored_token(&state).await?;
    let action: InvitationAction = parse_strict(&body)?;
    let reply = state
        .linkedin
        .act_on_invitation(&token.access_token, &action)
        .await;
    relay("invitation_action", reply)
}

/// POST /linkedin/invitation/resolve
///
/// Placeholder: nothing is sent to LinkedIn. Echoes the issue back as
/// resolved, whatever the body holds.
pub async fn resolve_invitation(body: Bytes) -> Json<Value> {
    let input: Value = parse_lenient(&body);
    let field = |name: &str| input.get(name).cloned().unwrap_or(Value::Null);
    info!(issue_type = %field("issueType"), "invitation issue marked resolved");
    Json(json!({
        "status": "Resolved",
        "issueType": field("issueType"),
        "details": field("details"),
    }))
}

/// Token and member URN for calls that act as the member.
async fn credentials(state: &AppState) -> ApiResult<(StoredToken, ProfileReference)> {
    match (state.store.load_token().await, state.store.load_profile().await) {
        (Some(token), Some(profile)) => Ok((token, profile)),
        _ => Err(ApiError::NotAuthorized),
    }
}

/// Presence only; invitation calls do not check expiry.
async fn stored_token(state: &AppState) -> ApiResult<StoredToken> {
    state
        .store
        .load_token()
        .await
        .ok_or(ApiError::NotAuthorized)
}

/// Relay LinkedIn's status and body unchanged.
fn relay(
    operation: &'static str,
    reply: linkedin_client::Result<UpstreamReply>,
) -> ApiResult<Response> {
    let reply = reply.map_err(|e| {
        let err = ApiError::from(e);
        if err.is_upstream() {
            record_upstream_error(operation);
        }
        err
    })?;
    if reply.status >= 400 {
        record_upstream_error(operation);
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(reply.body)).into_response())
}

/// Empty or malformed bodies yield the default value.
fn parse_lenient<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

/// An empty body counts as `{}`; anything else must be valid JSON.
fn parse_strict<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest {
        message: "Invalid JSON body.".into(),
        details: Some(Value::String(e.to_string())),
    })
}
