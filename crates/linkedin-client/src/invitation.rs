//! Connection invitation pass-through
//!
//! The gateway does not model invitations. Client fields are copied into the
//! minimal payload LinkedIn expects and the provider's status and body are
//! returned as-is, success or not.

use serde::Deserialize;
use tracing::instrument;

use crate::client::{LinkedInClient, UpstreamReply, read_reply};
use crate::error::{Error, Result};

const INVITATIONS_PATH: &str = "/v2/invitations";
const INVITEE_PROFILE_KEY: &str = "com.linkedin.voyager.growth.invitation.InviteeProfile";

/// Body of `POST /linkedin/invitation/create`. Values are forwarded untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitation {
    #[serde(default)]
    pub profile_id: serde_json::Value,
    #[serde(default)]
    pub tracking_id: serde_json::Value,
    #[serde(default)]
    pub message: Option<String>,
}

impl CreateInvitation {
    fn payload(&self) -> serde_json::Value {
        let mut invitee = serde_json::Map::new();
        invitee.insert(
            INVITEE_PROFILE_KEY.to_string(),
            serde_json::json!({ "profileId": self.profile_id }),
        );
        serde_json::json!({
            "invitee": invitee,
            "trackingId": self.tracking_id,
            "message": self.message.as_deref().unwrap_or_default(),
        })
    }
}

/// Body of `POST /linkedin/invitation/action`.
///
/// `action` is not checked against accept/reject; LinkedIn decides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationAction {
    #[serde(default)]
    pub invitation_id: serde_json::Value,
    #[serde(default)]
    pub action: serde_json::Value,
}

impl InvitationAction {
    fn segments(&self) -> Result<(String, String)> {
        let invitation_id = path_segment(&self.invitation_id)
            .ok_or_else(|| Error::InvalidRequest("invitationId is required".into()))?;
        let action = path_segment(&self.action)
            .ok_or_else(|| Error::InvalidRequest("action is required".into()))?;
        Ok((invitation_id, action))
    }
}

/// Strings are used verbatim, numbers by their decimal form.
fn path_segment(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl LinkedInClient {
    #[instrument(skip_all)]
    pub async fn create_invitation(
        &self,
        access_token: &str,
        invitation: &CreateInvitation,
    ) -> Result<UpstreamReply> {
        let response = self
            .http
            .post(self.api_url(INVITATIONS_PATH))
            .bearer_auth(access_token)
            .json(&invitation.payload())
            .send()
            .await
            .map_err(|e| Error::Http(format!("create invitation request failed: {e}")))?;
        read_reply(response).await
    }

    #[instrument(skip_all)]
    pub async fn list_invitations(&self, access_token: &str) -> Result<UpstreamReply> {
        let response = self
            .http
            .get(self.api_url(INVITATIONS_PATH))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::Http(format!("list invitations request failed: {e}")))?;
        read_reply(response).await
    }

    #[instrument(skip_all)]
    pub async fn act_on_invitation(
        &self,
        access_token: &str,
        request: &InvitationAction,
    ) -> Result<UpstreamReply> {
        let (invitation_id, action) = request.segments()?;
        let url = self.api_url_from_segments(&[
            "v2",
            "invitations",
            &invitation_id,
            "action",
            &action,
        ])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| Error::Http(format!("invitation action request failed: {e}")))?;
        read_reply(response).await
    }
}
