use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use ytup::config::{aligned_chunk_size, DEFAULT_PRIVACY, MAX_CHUNK_SIZE};
use ytup::report;
use ytup::{UploadConfig, VideoRequest};

/// Upload a video to YouTube, reporting progress as PROGRESS/RESULT lines.
#[derive(Parser)]
#[command(name = "ytup", version, about)]
struct Cli {
    /// Video file to upload
    #[arg(long)]
    file: PathBuf,

    /// Video title
    #[arg(long)]
    title: String,

    /// Privacy status: public, unlisted or private
    #[arg(long, default_value = DEFAULT_PRIVACY)]
    privacy: String,

    /// Caller-side video id; accepted but not used by the upload
    #[arg(long = "videoId")]
    video_id: Option<String>,

    /// Client secrets file (default: client_secrets.json next to the executable)
    #[arg(long)]
    client_secrets: Option<PathBuf>,

    /// Token cache file (default: token.json next to the executable)
    #[arg(long)]
    token_cache: Option<PathBuf>,

    /// Upload chunk size in bytes (at most 1 GiB), rounded down to a multiple of 256 KiB
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_CHUNK_SIZE))]
    chunk_size: Option<u64>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let (cfg, request) = match configure(cli) {
        Ok(parts) => parts,
        Err(err) => {
            // nothing left to report to if stderr is gone
            let _ = report::write_error(&mut io::stderr(), &err);
            return ExitCode::FAILURE;
        }
    };

    if ytup::run_and_report(&cfg, &request, &mut io::stdout().lock(), &mut io::stderr()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn configure(cli: Cli) -> Result<(UploadConfig, VideoRequest)> {
    let mut cfg = UploadConfig::beside_executable()?;
    if let Some(path) = cli.client_secrets {
        cfg.client_secrets_path = path;
    }
    if let Some(path) = cli.token_cache {
        cfg.token_cache_path = path;
    }
    if let Some(size) = cli.chunk_size {
        // bounded by MAX_CHUNK_SIZE, so it fits
        cfg.chunk_size = aligned_chunk_size(size as usize);
    }

    if let Some(id) = &cli.video_id {
        log::debug!("ignoring --videoId {}", id);
    }

    let request = VideoRequest {
        file: cli.file,
        title: cli.title,
        privacy: cli.privacy,
    };
    Ok((cfg, request))
}
