//! LinkedIn REST API calls used by the gateway
//!
//! Every call takes the caller's bearer token explicitly; this crate holds no
//! credentials of its own. Calls run one after another with no retries, and
//! provider failures come back as `Error::Upstream` with the provider's status
//! and body untouched.
//!
//! - `metadata`: best-effort link preview scraping
//! - `media`: two-phase asset upload (register, then PUT bytes)
//! - `post`: UGC post assembly and submission
//! - `invitation`: connection invitation pass-through

pub mod client;
pub mod error;
pub mod invitation;
pub mod media;
pub mod metadata;
pub mod post;

pub use client::{DEFAULT_API_BASE_URL, LinkedInClient, UpstreamReply};
pub use error::{Error, MediaUploadError, Result};
pub use invitation::{CreateInvitation, InvitationAction};
pub use media::MediaKind;
pub use metadata::UrlMetadata;
pub use post::{PostKind, PostRequest, PublishedPost, UgcPost};
