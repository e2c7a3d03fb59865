//! HTTP response building module
//!
//! Builders for every response the file server emits.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use super::cache::{Validators, MOUNT_CACHE_CONTROL};

pub type HttpResponse = Response<Full<Bytes>>;

/// Detail message of the explicit file route's 404
pub const NOT_FOUND_DETAIL: &str = "File not found";

/// Build 200 response carrying file bytes
pub fn build_file_response(content: Bytes, content_type: &str, is_head: bool) -> HttpResponse {
    let content_length = content.len();
    let body = if is_head { Bytes::new() } else { content };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| fallback("200", &e))
}

/// Build 200 response for a mounted file, with cache validators
pub fn build_mount_response(
    content: Bytes,
    content_type: &str,
    validators: &Validators,
    is_head: bool,
) -> HttpResponse {
    let content_length = content.len();
    let body = if is_head { Bytes::new() } else { content };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("ETag", &validators.etag)
        .header("Cache-Control", MOUNT_CACHE_CONTROL);
    if let Some(last_modified) = validators.last_modified_header() {
        builder = builder.header("Last-Modified", last_modified);
    }

    builder
        .body(Full::new(body))
        .unwrap_or_else(|e| fallback("200", &e))
}

/// Build 304 Not Modified response
pub fn build_304_response(validators: &Validators) -> HttpResponse {
    let mut builder = Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("ETag", &validators.etag)
        .header("Cache-Control", MOUNT_CACHE_CONTROL);
    if let Some(last_modified) = validators.last_modified_header() {
        builder = builder.header("Last-Modified", last_modified);
    }

    builder
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| fallback("304", &e))
}

/// Build 404 with `{"detail": "File not found"}`
pub fn build_json_404_response() -> HttpResponse {
    let body = serde_json::json!({ "detail": NOT_FOUND_DETAIL }).to_string();
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Content-Length", body.len())
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| fallback("404", &e))
}

/// Build plain 404 used by the mount
pub fn build_404_response() -> HttpResponse {
    plain_text(StatusCode::NOT_FOUND, "Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> HttpResponse {
    let mut resp = plain_text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    resp.headers_mut().insert(
        hyper::header::ALLOW,
        hyper::header::HeaderValue::from_static("GET, HEAD"),
    );
    resp
}

/// Build 500 response without diagnostic detail
pub fn build_500_response() -> HttpResponse {
    plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

fn plain_text(status: StatusCode, text: &'static str) -> HttpResponse {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", text.len())
        .body(Full::new(Bytes::from_static(text.as_bytes())))
        .unwrap_or_else(|e| fallback(status.as_str(), &e))
}

/// Log response build error and fall back to an empty response
fn fallback(status: &str, error: &hyper::http::Error) -> HttpResponse {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
    Response::new(Full::new(Bytes::new()))
}
