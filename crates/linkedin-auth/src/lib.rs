//! LinkedIn OAuth for the gateway
//!
//! Authorization URL construction, authorization code exchange, identity
//! token subject extraction, and single-record persistence of the resulting
//! access token and member URN. This crate has no dependency on the HTTP
//! server and can be tested on its own.
//!
//! Authorization flow:
//! 1. Caller is sent to `authorize::build_authorization_url()`
//! 2. LinkedIn redirects back with a code
//! 3. `token::exchange_code()` trades the code for tokens
//! 4. `id_token::extract_subject_without_verification()` yields the member id
//! 5. `store::TokenStore` persists the token and `urn:li:person:<id>`
//! 6. `validate::TokenValidator` gates every protected call on the stored token

pub mod authorize;
pub mod constants;
pub mod error;
pub mod id_token;
pub mod settings;
pub mod store;
pub mod token;
pub mod validate;

pub use authorize::build_authorization_url;
pub use constants::*;
pub use error::{Error, Result};
pub use id_token::{extract_subject_without_verification, person_urn};
pub use settings::OAuthSettings;
pub use store::{FileTokenStore, ProfileReference, StoreFuture, StoredToken, TokenStore};
pub use token::{TokenResponse, exchange_code};
pub use validate::TokenValidator;
