use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

// OAuth parameters
pub const SCOPES: [&str; 1] = ["https://www.googleapis.com/auth/youtube.upload"];
pub const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;

// Files kept next to the executable
pub const CLIENT_SECRETS_FILE: &str = "client_secrets.json";
pub const TOKEN_CACHE_FILE: &str = "token.json";

// Video metadata
pub const UPLOAD_CATEGORY_ID: &str = "22"; // People & Blogs
pub const DEFAULT_PRIVACY: &str = "unlisted";

// Endpoints
pub const VIDEO_UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/videos";
pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

// Resumable upload parameters
pub const DEFAULT_CHUNK_SIZE: usize = 100 * 1024 * 1024; // 100 MiB
pub const CHUNK_GRANULARITY: usize = 256 * 1024; // 256 KiB
pub const MAX_CHUNK_SIZE: u64 = 1024 * 1024 * 1024; // 1 GiB
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Round a requested chunk size down to a multiple of [`CHUNK_GRANULARITY`].
///
/// Non-final chunks of a resumable session must be aligned; anything smaller
/// than one unit becomes one unit.
pub fn aligned_chunk_size(requested: usize) -> usize {
    (requested / CHUNK_GRANULARITY).max(1) * CHUNK_GRANULARITY
}

/// Directory containing the running executable.
pub fn program_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the running executable")?;
    let exe = exe.canonicalize().unwrap_or(exe);
    exe.parent()
        .map(Path::to_path_buf)
        .context("executable path has no parent directory")
}

/// Runtime configuration for one authenticate + upload run.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub client_secrets_path: PathBuf,
    pub token_cache_path: PathBuf,
    pub upload_url: String,
    pub chunk_size: usize,
}

impl UploadConfig {
    /// Configuration with the credential files resolved in `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            client_secrets_path: dir.join(CLIENT_SECRETS_FILE),
            token_cache_path: dir.join(TOKEN_CACHE_FILE),
            upload_url: VIDEO_UPLOAD_URL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Configuration with the credential files next to the executable,
    /// independent of the current working directory.
    pub fn beside_executable() -> Result<Self> {
        Ok(Self::in_dir(&program_dir()?))
    }
}
