pub mod auth;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod upload;

pub use auth::{authenticate, AuthError, Authorizer};
pub use config::UploadConfig;
pub use pipeline::{http_client, run, run_and_report};
pub use report::{ProgressReporter, UploadOutcome};
pub use upload::{drive_upload, ChunkedUpload, UploadError, VideoRequest};
