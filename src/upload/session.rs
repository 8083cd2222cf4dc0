use std::fs::File;
use std::path::Path;

use log::{debug, info};
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE, LOCATION, RANGE};

use super::chunk;
use super::metadata::{guess_mime, UploadedVideo, VideoInsert};
use super::{ChunkResult, ChunkedUpload, UploadError, UploadStatus};

/// HTTP status the resumable protocol uses for "chunk stored, send more".
const RESUME_INCOMPLETE: u16 = 308;

/// One resumable upload session bound to a local file.
///
/// Created by POSTing the metadata to the upload endpoint; the returned
/// session URI then receives the file in `chunk_size` pieces.
pub struct ResumableSession {
    http: Client,
    access_token: String,
    session_uri: String,
    file: File,
    content_type: &'static str,
    total_size: u64,
    offset: u64,
    chunk_size: usize,
}

impl ResumableSession {
    pub fn start(
        http: &Client,
        access_token: &str,
        upload_url: &str,
        metadata: &VideoInsert,
        path: &Path,
        chunk_size: usize,
    ) -> Result<Self, UploadError> {
        let file = File::open(path).map_err(|source| UploadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let total_size = file.metadata()?.len();
        let content_type = guess_mime(path);

        info!(
            "starting resumable upload of {} ({} bytes, {})",
            path.display(),
            total_size,
            content_type
        );

        let resp = http
            .post(upload_url)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(access_token)
            .header("X-Upload-Content-Length", total_size.to_string())
            .header("X-Upload-Content-Type", content_type)
            .json(metadata)
            .send()?;

        let resp = ensure_success(resp)?;
        let session_uri = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(UploadError::MissingSessionUri)?;
        debug!("upload session: {}", session_uri);

        Ok(Self {
            http: http.clone(),
            access_token: access_token.to_string(),
            session_uri,
            file,
            content_type,
            total_size,
            offset: 0,
            chunk_size,
        })
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}

impl ChunkedUpload for ResumableSession {
    fn next_chunk(&mut self) -> Result<ChunkResult, UploadError> {
        let data = chunk::read_chunk(&mut self.file, self.offset, self.chunk_size)?;
        let range = chunk::content_range(self.offset, data.len(), self.total_size);
        debug!("sending {}", range);

        let resp = self
            .http
            .put(&self.session_uri)
            .bearer_auth(&self.access_token)
            .header(CONTENT_TYPE, self.content_type)
            .header(CONTENT_RANGE, range)
            .body(data)
            .send()?;

        if resp.status().as_u16() == RESUME_INCOMPLETE {
            self.offset = match resp.headers().get(RANGE) {
                Some(value) => {
                    let value = value
                        .to_str()
                        .map_err(|_| UploadError::BadRange("non-ASCII header".into()))?;
                    parse_range_end(value)? + 1
                }
                None => 0,
            };
            return Ok(ChunkResult::InProgress(UploadStatus {
                resumable_progress: self.offset,
                total_size: self.total_size,
            }));
        }

        let body = ensure_success(resp)?.text()?;
        let video: UploadedVideo = serde_json::from_str(&body)?;
        Ok(ChunkResult::Complete(video))
    }
}

/// Last byte index the server has stored, from a `Range: bytes=0-N` header.
pub fn parse_range_end(value: &str) -> Result<u64, UploadError> {
    value
        .trim()
        .strip_prefix("bytes=")
        .and_then(|r| r.rsplit('-').next())
        .and_then(|end| end.trim().parse().ok())
        .ok_or_else(|| UploadError::BadRange(value.to_string()))
}

fn ensure_success(resp: Response) -> Result<Response, UploadError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(UploadError::Status {
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}
