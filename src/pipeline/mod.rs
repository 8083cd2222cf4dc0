use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use reqwest::blocking::Client;

use crate::auth::{self, google::GoogleAuthorizer};
use crate::config::{self, UploadConfig};
use crate::report::{self, ProgressReporter, UploadOutcome};
use crate::upload::{self, VideoRequest};

/// Blocking HTTP client shared by the OAuth exchange and the upload.
///
/// Redirects are not followed (the OAuth token endpoint must not redirect,
/// and `308` is part of the upload protocol). There is no overall request
/// timeout so that large chunks are not cut off.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(Duration::from_secs(config::CONNECT_TIMEOUT_SECS))
        .timeout(None::<Duration>)
        .build()
        .context("failed to build HTTP client")
}

/// Full run: authenticate, resumable upload, outcome.
///
/// Progress lines are written to `out` as the upload advances; the caller
/// prints the returned outcome.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::PathBuf;
/// use ytup::{run, UploadConfig, VideoRequest};
///
/// let cfg = UploadConfig::beside_executable().unwrap();
/// let request = VideoRequest {
///     file: PathBuf::from("clip.mp4"),
///     title: "My clip".into(),
///     privacy: "unlisted".into(),
/// };
/// let outcome = run(&cfg, &request, std::io::stdout()).unwrap();
/// println!("{}", outcome.youtube_url);
/// ```
pub fn run<W: Write>(cfg: &UploadConfig, request: &VideoRequest, out: W) -> Result<UploadOutcome> {
    let http = http_client()?;

    let token = auth::authenticate(cfg, &GoogleAuthorizer::new(http.clone()))?;

    let mut reporter = ProgressReporter::new(out);
    let video_id = upload::upload_video(&http, &token.access_token, cfg, request, &mut reporter)?;

    info!("upload complete: {}", video_id);
    Ok(UploadOutcome::for_video(&video_id))
}

/// [`run`] plus the closing line of the protocol: `RESULT` on `out` when the
/// upload succeeds, a single `ERROR` line on `err` otherwise. Returns
/// whether the run succeeded.
pub fn run_and_report<O, E>(cfg: &UploadConfig, request: &VideoRequest, out: &mut O, err: &mut E) -> bool
where
    O: Write,
    E: Write,
{
    let result = run(cfg, request, &mut *out)
        .and_then(|outcome| report::write_result(out, &outcome).map_err(anyhow::Error::from));
    match result {
        Ok(()) => true,
        Err(e) => {
            // nothing left to report to if stderr is gone
            let _ = report::write_error(err, &e);
            false
        }
    }
}
