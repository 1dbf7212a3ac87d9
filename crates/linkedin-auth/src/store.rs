//! Token and profile persistence
//!
//! The gateway is single-tenant: one access token and one member URN, each
//! kept as the sole record of its own JSON file and fully replaced on every
//! save. Writes go through a temp file + rename and are serialized by a
//! tokio Mutex, so two overlapping authorizations resolve to last writer wins
//! without ever leaving a torn file.
//!
//! Loads never fail. A missing, unreadable or malformed record reads as
//! "nothing stored", which the validator turns into a fresh authorization
//! prompt.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Boxed future returned by `TokenStore` methods (keeps the trait dyn-compatible).
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The persisted access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    /// Absolute expiry, computed at save time from `expires_in`
    pub expiration_time: DateTime<Utc>,
}

impl StoredToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration_time
    }
}

/// The persisted member identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReference {
    pub profile_urn: String,
}

/// Storage for the single access token and member URN.
///
/// Injected into request handlers as `Arc<dyn TokenStore>`.
pub trait TokenStore: Send + Sync {
    /// Replace the stored token; expiry is now + `expires_in` seconds.
    fn save_token<'a>(
        &'a self,
        access_token: &'a str,
        expires_in: u64,
    ) -> StoreFuture<'a, Result<StoredToken>>;

    /// The stored token, or `None` if absent or unreadable.
    fn load_token(&self) -> StoreFuture<'_, Option<StoredToken>>;

    /// Replace the stored member URN.
    fn save_profile<'a>(&'a self, profile_urn: &'a str) -> StoreFuture<'a, Result<()>>;

    /// The stored member URN, or `None` if absent or unreadable.
    fn load_profile(&self) -> StoreFuture<'_, Option<ProfileReference>>;
}

/// File-backed store: one JSON file for the token, one for the profile.
pub struct FileTokenStore {
    token_path: PathBuf,
    profile_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(token_path: PathBuf, profile_path: PathBuf) -> Self {
        Self {
            token_path,
            profile_path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    pub fn profile_path(&self) -> &Path {
        &self.profile_path
    }
}

impl TokenStore for FileTokenStore {
    fn save_token<'a>(
        &'a self,
        access_token: &'a str,
        expires_in: u64,
    ) -> StoreFuture<'a, Result<StoredToken>> {
        Box::pin(async move {
            let token = StoredToken {
                access_token: access_token.to_string(),
                expiration_time: expiry_after(Utc::now(), expires_in),
            };
            let _guard = self.write_lock.lock().await;
            write_atomic(&self.token_path, &token).await?;
            info!(expires_at = %token.expiration_time, "access token saved");
            Ok(token)
        })
    }

    fn load_token(&self) -> StoreFuture<'_, Option<StoredToken>> {
        Box::pin(async move {
            let raw: RawToken = read_record(&self.token_path).await?;
            let access_token = raw.access_token.filter(|t| !t.is_empty())?;
            let expiration_time = match raw.expiration_time.as_deref().and_then(parse_expiration) {
                Some(t) => t,
                None => {
                    warn!(path = %self.token_path.display(), "token file has no usable expiration_time");
                    return None;
                }
            };
            Some(StoredToken {
                access_token,
                expiration_time,
            })
        })
    }

    fn save_profile<'a>(&'a self, profile_urn: &'a str) -> StoreFuture<'a, Result<()>> {
        Box::pin(async move {
            let profile = ProfileReference {
                profile_urn: profile_urn.to_string(),
            };
            let _guard = self.write_lock.lock().await;
            write_atomic(&self.profile_path, &profile).await?;
            info!(profile_urn, "profile URN saved");
            Ok(())
        })
    }

    fn load_profile(&self) -> StoreFuture<'_, Option<ProfileReference>> {
        Box::pin(async move {
            let raw: RawProfile = read_record(&self.profile_path).await?;
            raw.profile_urn
                .filter(|u| !u.is_empty())
                .map(|profile_urn| ProfileReference { profile_urn })
        })
    }
}

/// On-disk token shape, read leniently so a partial record loads as `None`
/// instead of an error.
#[derive(Deserialize)]
struct RawToken {
    access_token: Option<String>,
    expiration_time: Option<String>,
}

#[derive(Deserialize)]
struct RawProfile {
    profile_urn: Option<String>,
}

fn expiry_after(now: DateTime<Utc>, expires_in: u64) -> DateTime<Utc> {
    i64::try_from(expires_in)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Accepts RFC 3339, and also the naive local ISO-8601 timestamps found in
/// token files written by earlier deployments.
fn parse_expiration(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

async fn read_record<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no stored record");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read stored record");
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "stored record is not valid JSON");
            None
        }
    }
}

/// Write a record atomically with 0600 permissions.
async fn write_atomic<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| Error::Serialize(format!("serializing record: {e}")))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Io(format!("{} has no file name", path.display())))?
        .to_string_lossy();
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing {}: {e}", tmp_path.display())))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting permissions on {}: {e}", tmp_path.display())))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("replacing {}: {e}", path.display())))?;

    debug!(path = %path.display(), "record persisted");
    Ok(())
}
