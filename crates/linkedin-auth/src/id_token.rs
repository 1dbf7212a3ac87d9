//! Identity token subject extraction
//!
//! Trust boundary: the identity token is decoded WITHOUT verifying its
//! signature. This is acceptable only because the token is received directly
//! from LinkedIn's token endpoint over TLS in the same call that exchanged the
//! authorization code; it is never accepted from a client. Verifying against
//! LinkedIn's published JWKS would replace the body of
//! `extract_subject_without_verification` and nothing else.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::constants::PERSON_URN_PREFIX;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    sub: Option<String>,
}

/// Read the `sub` claim from a compact JWS without checking the signature.
pub fn extract_subject_without_verification(id_token: &str) -> Result<String> {
    let mut segments = id_token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_header), Some(payload), Some(_signature)) => payload,
        _ => {
            return Err(Error::IdToken(
                "expected three dot-separated segments".into(),
            ));
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error::IdToken(format!("payload is not base64url: {e}")))?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes)
        .map_err(|e| Error::IdToken(format!("payload is not a JSON object: {e}")))?;

    claims
        .sub
        .filter(|s| !s.is_empty())
        .ok_or(Error::MissingSubject)
}

/// Member URN for an identity token subject.
pub fn person_urn(subject: &str) -> String {
    format!("{PERSON_URN_PREFIX}{subject}")
}

/// Assemble an unsigned compact token around the given claims.
#[cfg(test)]
pub(crate) fn unsigned_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","kid":"test"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
