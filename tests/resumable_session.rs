use std::fs;
use std::path::{Path, PathBuf};

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

use ytup::config::CHUNK_GRANULARITY;
use ytup::upload::{self, UploadError, VideoRequest};
use ytup::{http_client, ProgressReporter, UploadConfig};

const UPLOAD_PATH: &str = "/upload/youtube/v3/videos";
const SESSION_PATH: &str = "/upload/session/abc";

/// Printable file contents so chunk bodies can be matched as text.
fn write_video(name: &str, len: usize) -> (PathBuf, String) {
    let dir = std::env::temp_dir().join(name);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("clip.mp4");
    let data: String = (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect();
    fs::write(&path, &data).unwrap();
    (path, data)
}

fn config_for(server: &ServerGuard, dir: &Path) -> UploadConfig {
    let mut cfg = UploadConfig::in_dir(dir);
    cfg.upload_url = format!("{}{UPLOAD_PATH}", server.url());
    cfg.chunk_size = CHUNK_GRANULARITY;
    cfg
}

fn request_for(path: PathBuf) -> VideoRequest {
    VideoRequest {
        file: path,
        title: "Holiday clip".into(),
        privacy: "unlisted".into(),
    }
}

/// Initiation answered with a session URI pointing back at `server`.
fn session_created(server: &mut ServerGuard, total: usize) -> Mock {
    let location = format!("{}{SESSION_PATH}", server.url());
    server
        .mock("POST", UPLOAD_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("uploadType".into(), "resumable".into()),
            Matcher::UrlEncoded("part".into(), "snippet,status".into()),
        ]))
        .match_header("authorization", "Bearer tok")
        .match_header("x-upload-content-length", Matcher::Exact(total.to_string()))
        .match_header("x-upload-content-type", "video/mp4")
        .match_body(Matcher::PartialJson(json!({
            "snippet": { "title": "Holiday clip", "categoryId": "22" },
            "status": { "privacyStatus": "unlisted", "selfDeclaredMadeForKids": false }
        })))
        .with_status(200)
        .with_header("location", &location)
        .expect(1)
        .create()
}

/// A chunk PUT carrying exactly `data[start..end]`.
fn chunk(server: &mut ServerGuard, data: &str, start: usize, end: usize) -> Mock {
    let range = format!("bytes {}-{}/{}", start, end - 1, data.len());
    server
        .mock("PUT", SESSION_PATH)
        .match_header("authorization", "Bearer tok")
        .match_header("content-range", Matcher::Exact(range))
        .match_body(Matcher::Exact(data[start..end].to_string()))
        .expect(1)
}

fn resume_incomplete(mock: Mock, last_byte: usize) -> Mock {
    mock.with_status(308)
        .with_header("range", &format!("bytes=0-{last_byte}"))
        .create()
}

fn video_created(mock: Mock, body: &str) -> Mock {
    mock.with_status(201)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create()
}

fn progress_lines(reporter: ProgressReporter<Vec<u8>>) -> Vec<String> {
    String::from_utf8(reporter.into_inner())
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

#[test]
fn uploads_in_chunks_and_reports_progress() {
    let (path, data) = write_video("ytup_it_chunks", 600_000);
    let mut server = Server::new();

    let init = session_created(&mut server, data.len());
    let first = chunk(&mut server, &data, 0, 262_144);
    let first = resume_incomplete(first, 262_143);
    let second = chunk(&mut server, &data, 262_144, 524_288);
    let second = resume_incomplete(second, 524_287);
    let last = chunk(&mut server, &data, 524_288, 600_000);
    let last = video_created(last, r#"{"kind":"youtube#video","id":"abc123XYZ"}"#);

    let cfg = config_for(&server, path.parent().unwrap());
    let mut reporter = ProgressReporter::new(Vec::new());
    let id = upload::upload_video(&http_client().unwrap(), "tok", &cfg, &request_for(path.clone()), &mut reporter)
        .unwrap();

    assert_eq!(id, "abc123XYZ");
    assert_eq!(
        progress_lines(reporter),
        ["PROGRESS 43", "PROGRESS 87", "PROGRESS 100"]
    );
    init.assert();
    first.assert();
    second.assert();
    last.assert();

    fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn resumes_from_the_offset_the_server_reports() {
    let (path, data) = write_video("ytup_it_resume", 300_000);
    let mut server = Server::new();

    let init = session_created(&mut server, data.len());
    // only the first 100000 bytes of the chunk were stored
    let partial = chunk(&mut server, &data, 0, 262_144);
    let partial = resume_incomplete(partial, 99_999);
    let rest = chunk(&mut server, &data, 100_000, 300_000);
    let rest = video_created(rest, r#"{"id":"resumed"}"#);

    let cfg = config_for(&server, path.parent().unwrap());
    let mut reporter = ProgressReporter::new(Vec::new());
    let id = upload::upload_video(&http_client().unwrap(), "tok", &cfg, &request_for(path.clone()), &mut reporter)
        .unwrap();

    assert_eq!(id, "resumed");
    assert_eq!(progress_lines(reporter), ["PROGRESS 33", "PROGRESS 100"]);
    init.assert();
    partial.assert();
    rest.assert();

    fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn rejected_initiation_is_an_error() {
    let (path, _) = write_video("ytup_it_unauthorized", 1_000);
    let mut server = Server::new();
    let init = server
        .mock("POST", UPLOAD_PATH)
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":401,"message":"Invalid Credentials"}}"#)
        .expect(1)
        .create();
    let puts = server.mock("PUT", Matcher::Any).expect(0).create();

    let cfg = config_for(&server, path.parent().unwrap());
    let mut reporter = ProgressReporter::new(Vec::new());
    let err = upload::upload_video(&http_client().unwrap(), "bad", &cfg, &request_for(path.clone()), &mut reporter)
        .unwrap_err();

    match err {
        UploadError::Status { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("Invalid Credentials"));
        }
        other => panic!("expected Status error, got {other:?}"),
    }
    assert!(progress_lines(reporter).is_empty());
    init.assert();
    puts.assert();

    fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn initiation_without_location_is_an_error() {
    let (path, _) = write_video("ytup_it_no_location", 1_000);
    let mut server = Server::new();
    let init = server.mock("POST", UPLOAD_PATH).with_status(200).expect(1).create();

    let cfg = config_for(&server, path.parent().unwrap());
    let mut reporter = ProgressReporter::new(Vec::new());
    let err = upload::upload_video(&http_client().unwrap(), "tok", &cfg, &request_for(path.clone()), &mut reporter)
        .unwrap_err();

    assert!(matches!(err, UploadError::MissingSessionUri));
    init.assert();

    fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn response_without_video_id_is_an_error() {
    let (path, data) = write_video("ytup_it_no_id", 1_000);
    let mut server = Server::new();
    let init = session_created(&mut server, data.len());
    let only = chunk(&mut server, &data, 0, data.len());
    let only = video_created(only, r#"{"kind":"youtube#video"}"#);

    let cfg = config_for(&server, path.parent().unwrap());
    let mut reporter = ProgressReporter::new(Vec::new());
    let err = upload::upload_video(&http_client().unwrap(), "tok", &cfg, &request_for(path.clone()), &mut reporter)
        .unwrap_err();

    assert!(matches!(err, UploadError::MissingVideoId));
    init.assert();
    only.assert();

    fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn missing_file_fails_before_any_request() {
    let dir = std::env::temp_dir().join("ytup_it_missing_file");
    fs::create_dir_all(&dir).unwrap();
    let mut server = Server::new();
    let init = server.mock("POST", Matcher::Any).expect(0).create();

    let cfg = config_for(&server, &dir);
    let mut reporter = ProgressReporter::new(Vec::new());
    let err = upload::upload_video(
        &http_client().unwrap(),
        "tok",
        &cfg,
        &request_for(dir.join("does-not-exist.mp4")),
        &mut reporter,
    )
    .unwrap_err();

    assert!(matches!(err, UploadError::Open { .. }));
    init.assert();
    fs::remove_dir_all(&dir).ok();
}
