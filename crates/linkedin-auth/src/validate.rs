//! Access token validation
//!
//! Protected operations call `TokenValidator::validate` before touching the
//! LinkedIn API. A missing or expired token yields `Error::Unauthorized`
//! carrying a freshly built authorization URL so the caller can send the
//! user straight to the consent page.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::authorize::build_authorization_url;
use crate::error::{Error, Result};
use crate::settings::OAuthSettings;
use crate::store::TokenStore;

#[derive(Clone)]
pub struct TokenValidator {
    store: Arc<dyn TokenStore>,
    settings: Arc<OAuthSettings>,
}

impl TokenValidator {
    pub fn new(store: Arc<dyn TokenStore>, settings: Arc<OAuthSettings>) -> Self {
        Self { store, settings }
    }

    /// Fail with `Unauthorized` unless a token is stored and unexpired.
    pub async fn validate(&self) -> Result<()> {
        self.validate_at(Utc::now()).await
    }

    pub async fn validate_at(&self, now: DateTime<Utc>) -> Result<()> {
        match self.store.load_token().await {
            Some(token) if !token.is_expired_at(now) => Ok(()),
            Some(token) => {
                info!(expired_at = %token.expiration_time, "stored access token has expired");
                Err(self.unauthorized())
            }
            None => {
                info!("no access token stored");
                Err(self.unauthorized())
            }
        }
    }

    pub fn authorization_url(&self) -> String {
        build_authorization_url(&self.settings)
    }

    fn unauthorized(&self) -> Error {
        Error::Unauthorized {
            authorization_url: self.authorization_url(),
        }
    }
}
