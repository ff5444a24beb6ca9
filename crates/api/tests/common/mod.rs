#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::Path;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tower::ServiceExt;

use sources_api::config::ServerConfig;
use sources_api::router::build_app_router;
use sources_api::state::AppState;

pub const WEEK: i64 = 604_800;
pub const HOUR: i64 = 3_600;

const BOUNDARY: &str = "sources-test-boundary";

/// Build a test `ServerConfig` rooted at `data_dir`.
pub fn test_config(data_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        data_dir: data_dir.to_path_buf(),
        database_url: "sqlite::memory:".to_string(),
        max_upload_bytes: 16 * 1024 * 1024,
    }
}

/// Build the application with the production middleware stack.
pub fn build_test_app(pool: SqlitePool, data_dir: &Path) -> Router {
    let config = test_config(data_dir);
    build_app_router(AppState::new(pool, config.clone()), &config)
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

/// A multipart request with a single file field.
pub fn upload(method: Method, uri: &str, field: &str, filename: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {content}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

/// An event log with one completed event per epoch plus an in-progress row.
pub fn dataset(source: &str, epochs: impl IntoIterator<Item = i64>) -> String {
    let mut csv = String::from("FILE_NAME,LogicFile,START_TIME,START_TIME_epoc,STAT_DESC,STATUS\n");
    for (i, epoch) in epochs.into_iter().enumerate() {
        writeln!(csv, "f{i}.dat,{source},t{i},{epoch},Done,0").unwrap();
    }
    writeln!(csv, "pending.dat,{source},t,9999999999,Processing,0").unwrap();
    csv
}

/// `count` events `step` seconds apart, starting at `start`.
pub fn regular(start: i64, step: i64, count: i64) -> Vec<i64> {
    (0..count).map(|i| start + i * step).collect()
}

/// `count` hourly events, the last one now.
pub fn recent_hourly(count: i64) -> Vec<i64> {
    let last = unix_now();
    regular(last - (count - 1) * HOUR, HOUR, count)
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}
