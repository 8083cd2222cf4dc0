pub mod chunk;
pub mod metadata;
pub mod session;

use std::io::Write;
use std::path::PathBuf;

use log::info;
use reqwest::blocking::Client;
use thiserror::Error;

use crate::config::UploadConfig;
use crate::report::ProgressReporter;
use metadata::{UploadedVideo, VideoInsert};
use session::ResumableSession;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upload request failed with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upload endpoint returned no session URI")]
    MissingSessionUri,
    #[error("malformed Range header: {0}")]
    BadRange(String),
    #[error("malformed video resource: {0}")]
    Json(#[from] serde_json::Error),
    #[error("upload finished but the response carries no video id")]
    MissingVideoId,
}

/// Server-side progress after a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadStatus {
    pub resumable_progress: u64,
    pub total_size: u64,
}

impl UploadStatus {
    /// Fraction of the file stored by the server, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.total_size == 0 {
            return 1.0;
        }
        (self.resumable_progress.min(self.total_size) as f64) / (self.total_size as f64)
    }

    /// Whole percentage, rounded down.
    pub fn percent(&self) -> u8 {
        if self.total_size == 0 {
            return 100;
        }
        let done = self.resumable_progress.min(self.total_size) as u128;
        (done * 100 / self.total_size as u128) as u8
    }
}

/// Outcome of sending one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkResult {
    InProgress(UploadStatus),
    Complete(UploadedVideo),
}

/// A request that transfers its payload one chunk per call.
pub trait ChunkedUpload {
    fn next_chunk(&mut self) -> Result<ChunkResult, UploadError>;
}

/// Send chunks until the server answers with the created video, reporting
/// progress after every chunk and a final 100%.
pub fn drive_upload<U, W>(upload: &mut U, reporter: &mut ProgressReporter<W>) -> Result<UploadedVideo, UploadError>
where
    U: ChunkedUpload,
    W: Write,
{
    let video = loop {
        match upload.next_chunk()? {
            ChunkResult::InProgress(status) => reporter.report(status.percent())?,
            ChunkResult::Complete(video) => break video,
        }
    };
    reporter.finish()?;
    Ok(video)
}

/// What to upload and how to publish it.
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub file: PathBuf,
    pub title: String,
    pub privacy: String,
}

/// Upload `request.file` with its metadata and return the new video id.
pub fn upload_video<W: Write>(
    http: &Client,
    access_token: &str,
    cfg: &UploadConfig,
    request: &VideoRequest,
    reporter: &mut ProgressReporter<W>,
) -> Result<String, UploadError> {
    let metadata = VideoInsert::new(&request.title, &request.privacy);
    let mut session = ResumableSession::start(
        http,
        access_token,
        &cfg.upload_url,
        &metadata,
        &request.file,
        cfg.chunk_size,
    )?;

    let video = drive_upload(&mut session, reporter)?;
    let id = video.id.ok_or(UploadError::MissingVideoId)?;
    info!("uploaded {} bytes as video {}", session.total_size(), id);
    Ok(id)
}
