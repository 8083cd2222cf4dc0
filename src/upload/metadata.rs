use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config;

/// Request body of `videos.insert` with `part=snippet,status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInsert {
    pub snippet: Snippet,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub title: String,
    pub description: String,
    pub category_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub privacy_status: String,
    pub self_declared_made_for_kids: bool,
}

impl VideoInsert {
    pub fn new(title: &str, privacy: &str) -> Self {
        Self {
            snippet: Snippet {
                title: title.to_string(),
                description: String::new(),
                category_id: config::UPLOAD_CATEGORY_ID.to_string(),
            },
            status: Status {
                privacy_status: privacy.to_string(),
                self_declared_made_for_kids: false,
            },
        }
    }
}

/// The parts of the returned video resource we care about.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedVideo {
    #[serde(default)]
    pub id: Option<String>,
}

/// MIME type announced for the upload, from the file extension.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "mpg" | "mpeg" => "video/mpeg",
        "3gp" => "video/3gpp",
        _ => "application/octet-stream",
    }
}
