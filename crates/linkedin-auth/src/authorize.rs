//! Authorization URL construction
//!
//! The URL is rebuilt on every call so a config reload or a test pointing at
//! a different base URL is picked up without caching concerns.

use crate::settings::OAuthSettings;

/// Build the consent URL the user must visit to grant the gateway access.
pub fn build_authorization_url(settings: &OAuthSettings) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}",
        settings.authorize_endpoint(),
        urlencoded(&settings.client_id),
        urlencoded(&settings.redirect_uri),
        urlencoded(&settings.scopes),
    )
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
