pub mod google;
pub mod secrets;
pub mod token;

use std::path::PathBuf;

use chrono::Utc;
use log::info;
use thiserror::Error;

use crate::config::{self, UploadConfig};
use secrets::ClientSecrets;
use token::StoredToken;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("client secrets file not found: {}", .0.display())]
    MissingClientSecrets(PathBuf),
    #[error("invalid client secrets file {}: {source}", .path.display())]
    InvalidClientSecrets {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("token cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("token cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid OAuth endpoint URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("cached token has no refresh token")]
    MissingRefreshToken,
    #[error("token request failed: {0}")]
    Transport(String),
    #[error("token endpoint rejected the request: {0}")]
    Server(String),
    #[error("unparseable token response: {0}")]
    TokenParse(String),
    #[error("authorization was denied: {0}")]
    ConsentDenied(String),
    #[error("OAuth redirect state does not match the request")]
    StateMismatch,
    #[error("malformed OAuth redirect: {0}")]
    BadRedirect(String),
}

/// The two ways of obtaining fresh credentials.
///
/// [`google::GoogleAuthorizer`] is the real implementation; tests substitute
/// their own to observe which path [`authenticate`] takes.
pub trait Authorizer {
    /// Exchange the refresh token of `token` for a new access token.
    fn refresh(&self, secrets: &ClientSecrets, token: &StoredToken) -> Result<StoredToken, AuthError>;

    /// Run the interactive consent flow for `scopes`.
    fn authorize(&self, secrets: &ClientSecrets, scopes: &[&str]) -> Result<StoredToken, AuthError>;
}

/// Obtain usable credentials, touching the network only when the cache
/// cannot be used as-is.
///
/// 1. A valid cached token is returned unchanged.
/// 2. An expired token with a refresh token is refreshed.
/// 3. Anything else goes through the consent flow.
///
/// Refreshed and newly authorized tokens are written back to the cache.
pub fn authenticate<A: Authorizer>(cfg: &UploadConfig, authorizer: &A) -> Result<StoredToken, AuthError> {
    let cached = token::load_cached(&cfg.token_cache_path)?;
    let now = Utc::now();

    let token = match cached {
        Some(tok) if tok.is_valid_at(now) => {
            info!("using cached token from {}", cfg.token_cache_path.display());
            return Ok(tok);
        }
        Some(tok) if tok.is_expired_at(now) && tok.refresh_token.is_some() => {
            info!("cached token expired, refreshing");
            let secrets = match &tok.client {
                Some(client) => client.clone(),
                None => ClientSecrets::from_file(&cfg.client_secrets_path)?,
            };
            let mut refreshed = authorizer.refresh(&secrets, &tok)?.inherit_from(&tok);
            refreshed.client.get_or_insert(secrets);
            refreshed
        }
        _ => {
            info!("no usable cached token, starting the consent flow");
            let secrets = ClientSecrets::from_file(&cfg.client_secrets_path)?;
            let mut authorized = authorizer.authorize(&secrets, &config::SCOPES)?;
            authorized.client = Some(secrets);
            authorized
        }
    };

    token::save_cached(&cfg.token_cache_path, &token)?;
    Ok(token)
}
