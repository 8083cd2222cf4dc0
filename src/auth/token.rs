use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use oauth2::basic::BasicTokenResponse;
use oauth2::TokenResponse;
use serde::{Deserialize, Serialize};

use super::secrets::ClientSecrets;
use super::AuthError;
use crate::config;

/// OAuth credentials as persisted in the token cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Client the token was issued to, so it can be refreshed without
    /// re-reading the client secrets file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientSecrets>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl StoredToken {
    /// Build a token from a token endpoint response received at `now`.
    pub fn from_response(resp: &BasicTokenResponse, now: DateTime<Utc>) -> Self {
        let expiry = resp
            .expires_in()
            .and_then(|d| Duration::from_std(d).ok())
            .map(|d| now + d);

        Self {
            access_token: resp.access_token().secret().clone(),
            refresh_token: resp.refresh_token().map(|t| t.secret().clone()),
            expiry,
            scopes: resp
                .scopes()
                .map(|s| s.iter().map(|scope| scope.to_string()).collect())
                .unwrap_or_default(),
            token_type: resp.token_type().as_ref().to_string(),
            client: None,
        }
    }

    /// A token counts as expired slightly before its real expiry.
    /// Tokens without an expiry never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now >= expiry - Duration::seconds(config::TOKEN_EXPIRY_SKEW_SECS),
            None => false,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && !self.is_expired_at(now)
    }

    /// Carry over what a refresh response leaves out: the refresh token
    /// (Google only returns it on the first exchange), the client, and the
    /// granted scopes.
    pub fn inherit_from(mut self, previous: &StoredToken) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = previous.refresh_token.clone();
        }
        if self.client.is_none() {
            self.client = previous.client.clone();
        }
        if self.scopes.is_empty() {
            self.scopes = previous.scopes.clone();
        }
        self
    }
}

/// Load the token cache. A missing file yields `None`; an unreadable or
/// corrupt cache is logged and also yields `None` so a fresh consent flow
/// can replace it.
pub fn load_cached(path: &Path) -> Result<Option<StoredToken>, AuthError> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("no token cache at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str(&contents) {
        Ok(token) => Ok(Some(token)),
        Err(e) => {
            warn!("ignoring corrupt token cache {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

/// Persist the token cache by writing a sibling temp file and renaming it
/// over the cache.
pub fn save_cached(path: &Path, token: &StoredToken) -> Result<(), AuthError> {
    let json = serde_json::to_vec_pretty(token)?;
    let tmp = temp_path(path);

    {
        let mut file = create_private(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    debug!("token cache written: {}", path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(unix)]
fn create_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> io::Result<fs::File> {
    fs::File::create(path)
}
