//! Authorization code exchange flows
//!
//! Both flows trade a code at the token endpoint. `generate_token` only
//! stores the access token; `complete_authorization` also derives the member
//! URN from the identity token. Nothing is written until every field needed
//! for the records is known to be present.

use linkedin_auth::{TokenStore, exchange_code, extract_subject_without_verification, person_urn};
use tracing::{info, warn};

use crate::AppState;
use crate::error::ApiError;
use crate::metrics::record_upstream_error;

const OBTAIN_FAILED: &str = "Failed to obtain access token.";

/// Exchange `code` and store the access token. Returns the token.
pub async fn generate_token(state: &AppState, code: &str) -> Result<String, ApiError> {
    let response = exchange_code(&state.http, &state.oauth, code)
        .await
        .map_err(|e| upstream_failure(e, "Token generation failed"))?;

    let (access_token, expires_in) = response.bearer()?;
    let stored = state.store.save_token(access_token, expires_in).await?;
    info!(expires_at = %stored.expiration_time, "access token generated");
    Ok(stored.access_token)
}

/// Exchange `code`, decode the member id and store token and URN. Returns
/// the URN.
pub async fn complete_authorization(state: &AppState, code: &str) -> Result<String, ApiError> {
    let response = exchange_code(&state.http, &state.oauth, code)
        .await
        .map_err(|e| upstream_failure(e, OBTAIN_FAILED))?;

    let (Some(_), Some(id_token)) = (
        response.access_token.as_deref().filter(|t| !t.is_empty()),
        response.id_token.as_deref().filter(|t| !t.is_empty()),
    ) else {
        warn!("token response lacks access_token or id_token");
        return Err(ApiError::BadRequest {
            message: OBTAIN_FAILED.into(),
            details: Some(response.to_details()),
        });
    };

    let subject = extract_subject_without_verification(id_token)?;
    let profile_urn = person_urn(&subject);
    let (access_token, expires_in) = response.bearer()?;

    persist(state.store.as_ref(), access_token, expires_in, &profile_urn).await?;
    info!(profile_urn, "authorization complete");
    Ok(profile_urn)
}

async fn persist(
    store: &dyn TokenStore,
    access_token: &str,
    expires_in: u64,
    profile_urn: &str,
) -> Result<(), ApiError> {
    store.save_token(access_token, expires_in).await?;
    store.save_profile(profile_urn).await?;
    Ok(())
}

fn upstream_failure(err: linkedin_auth::Error, message: &str) -> ApiError {
    let err = ApiError::from(err).with_upstream_message(message);
    if err.is_upstream() {
        record_upstream_error("token_exchange");
    }
    err
}
