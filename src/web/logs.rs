use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

use super::AppState;
use crate::logging::{LOG_FILE_PREFIX, log_directory};

const DEFAULT_LINES: usize = 200;
const MAX_LINES: usize = 10_000;

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema, utoipa::IntoParams))]
pub struct TailParams {
    pub lines: Option<usize>,
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/logs/tail", params(TailParams), responses((status = 200))))]
pub async fn logs_tail(
    State(state): State<AppState>,
    Query(params): Query<TailParams>,
) -> impl IntoResponse {
    let configured_path = {
        let ctl = state.controller.lock().await;
        ctl.config().logging.file.clone()
    };
    let max_lines = params.lines.unwrap_or(DEFAULT_LINES).min(MAX_LINES);
    let Some(path) = resolve_log_file_path(&configured_path).await else {
        return (StatusCode::NOT_FOUND, "Log file not available").into_response();
    };
    match read_tail(&path, max_lines).await {
        Some(body) => {
            let mut resp = Response::new(body.into());
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            resp
        }
        None => (StatusCode::NOT_FOUND, "Log file not available").into_response(),
    }
}

// Invalid UTF-8 is replaced with U+FFFD instead of failing the whole tail
async fn read_tail(path: &Path, max_lines: usize) -> Option<String> {
    let bytes = fs::read(path).await.ok()?;
    Some(tail_lines(&String::from_utf8_lossy(&bytes), max_lines))
}

/// Last `max_lines` lines of `contents`
pub fn tail_lines(contents: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = contents.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

fn is_log_file(name: &str) -> bool {
    name.starts_with(&format!("{}.", LOG_FILE_PREFIX)) && name.ends_with(".log")
}

// The configured file if it exists, else the newest rolled file in its directory
async fn resolve_log_file_path(configured_path: &str) -> Option<PathBuf> {
    let configured = Path::new(configured_path);
    if let Ok(md) = fs::metadata(configured).await
        && md.is_file()
    {
        return Some(configured.to_path_buf());
    }

    let dir = log_directory(configured_path);
    let mut rd = fs::read_dir(&dir).await.ok()?;
    let mut best: Option<(SystemTime, PathBuf)> = None;
    while let Ok(Some(entry)) = rd.next_entry().await {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !is_log_file(&name) {
            continue;
        }
        if let Ok(md) = entry.metadata().await
            && md.is_file()
            && let Ok(modified) = md.modified()
            && best.as_ref().is_none_or(|(t, _)| modified > *t)
        {
            best = Some((modified, entry.path()));
        }
    }
    best.map(|(_, p)| p)
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/logs/tail", get(logs_tail))
}
