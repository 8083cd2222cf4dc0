//! Line protocol spoken to the parent process.
//!
//! stdout carries `PROGRESS <pct>` lines followed by one `RESULT <json>`
//! line; stderr carries a single `ERROR <kind>: <message>` line on failure.

use std::io::{self, Write};

use serde::Serialize;

use crate::auth::AuthError;
use crate::config;
use crate::upload::UploadError;

/// Emits deduplicated, strictly increasing `PROGRESS` lines.
pub struct ProgressReporter<W: Write> {
    out: W,
    last: Option<u8>,
}

impl<W: Write> ProgressReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    /// Print `pct` (clamped to 100) unless it does not exceed the last
    /// printed value.
    pub fn report(&mut self, pct: u8) -> io::Result<()> {
        let pct = pct.min(100);
        if self.last.is_some_and(|last| pct <= last) {
            return Ok(());
        }
        writeln!(self.out, "PROGRESS {pct}")?;
        self.out.flush()?;
        self.last = Some(pct);
        Ok(())
    }

    /// Guarantee the stream ends with `PROGRESS 100`.
    pub fn finish(&mut self) -> io::Result<()> {
        self.report(100)
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Payload of the `RESULT` line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub ok: bool,
    pub youtube_video_id: String,
    pub youtube_url: String,
}

impl UploadOutcome {
    pub fn for_video(video_id: &str) -> Self {
        Self {
            ok: true,
            youtube_video_id: video_id.to_string(),
            youtube_url: format!("{}{}", config::WATCH_URL_PREFIX, video_id),
        }
    }
}

pub fn write_result<W: Write>(out: &mut W, outcome: &UploadOutcome) -> io::Result<()> {
    let json = serde_json::to_string(outcome)?;
    writeln!(out, "RESULT {json}")?;
    out.flush()
}

/// Short name of the failure category, taken from the outermost typed
/// error in the chain.
pub fn error_kind(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if cause.is::<AuthError>() {
            return "AuthError";
        }
        if cause.is::<UploadError>() {
            return "UploadError";
        }
        if cause.is::<io::Error>() {
            return "IoError";
        }
        if cause.is::<reqwest::Error>() {
            return "HttpError";
        }
        if cause.is::<serde_json::Error>() {
            return "JsonError";
        }
    }
    "Error"
}

/// Single-line rendering of the error and its context chain. A cause whose
/// text its parent already embeds is skipped.
pub fn error_message(err: &anyhow::Error) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        if parts.last().is_some_and(|prev| prev.contains(&text)) {
            continue;
        }
        parts.push(text);
    }

    parts
        .join(": ")
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn write_error<W: Write>(out: &mut W, err: &anyhow::Error) -> io::Result<()> {
    writeln!(out, "ERROR {}: {}", error_kind(err), error_message(err))?;
    out.flush()
}
