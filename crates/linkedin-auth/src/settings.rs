//! Registered OAuth application settings

use common::Secret;

use crate::constants::{AUTHORIZE_PATH, TOKEN_PATH};

/// The LinkedIn app this gateway authenticates as.
///
/// `client_secret` never leaves this process except in the token exchange
/// form body.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
    pub scopes: String,
    pub oauth_base_url: String,
}

impl OAuthSettings {
    pub fn authorize_endpoint(&self) -> String {
        format!("{}{AUTHORIZE_PATH}", self.oauth_base_url.trim_end_matches('/'))
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}{TOKEN_PATH}", self.oauth_base_url.trim_end_matches('/'))
    }
}
