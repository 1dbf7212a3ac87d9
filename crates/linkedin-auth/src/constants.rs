//! LinkedIn OAuth endpoints and identifiers
//!
//! Paths are joined onto a configurable base URL so the gateway can be
//! pointed at a sandbox or a local stand-in. The defaults are LinkedIn's
//! production hosts.

/// Host serving the authorization page and the token endpoint
pub const DEFAULT_OAUTH_BASE_URL: &str = "https://www.linkedin.com";

/// Authorization page (user consent)
pub const AUTHORIZE_PATH: &str = "/oauth/v2/authorization";

/// Token endpoint for authorization code exchange
pub const TOKEN_PATH: &str = "/oauth/v2/accessToken";

/// Scopes requested during authorization. `openid` makes the token endpoint
/// return an `id_token`, whose `sub` claim identifies the member.
/// `w_member_social` is required for posting.
pub const DEFAULT_SCOPES: &str = "openid profile email w_member_social";

/// Prefix for member URNs built from the identity token subject
pub const PERSON_URN_PREFIX: &str = "urn:li:person:";
