//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, the routing
//! table, and dispatch to the default document, the mount, or the file route.

use crate::config::ServerContext;
use crate::handler::files::{self, FileError};
use crate::http::{self, cache::Validators, HttpResponse};
use crate::logger::{self, AccessLogEntry};
use hyper::body::Body as _;
use hyper::{Method, Request};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Routing table, matched in declaration order; first match wins
///
/// 1. `/` exactly
/// 2. the mount prefix, or anything below `<prefix>/`
/// 3. every other path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    DefaultDocument,
    /// Path relative to the resource root, still percent-encoded
    Mount(&'a str),
    /// Path relative to the resource root, still percent-encoded
    File(&'a str),
}

impl<'a> Route<'a> {
    /// `mount_prefix` has no trailing slash and is never empty
    pub fn classify(path: &'a str, mount_prefix: &str) -> Self {
        if path == "/" {
            return Self::DefaultDocument;
        }
        if let Some(rest) = path.strip_prefix(mount_prefix) {
            if rest.is_empty() {
                return Self::Mount("");
            }
            if let Some(relative) = rest.strip_prefix('/') {
                return Self::Mount(relative);
            }
        }
        Self::File(path.strip_prefix('/').unwrap_or(path))
    }
}

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
    pub if_modified_since: Option<&'a str>,
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    ctx: Arc<ServerContext>,
    remote_addr: SocketAddr,
) -> Result<HttpResponse, Infallible> {
    let started = Instant::now();
    let (parts, _) = req.into_parts();
    let method = &parts.method;
    let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());

    let response = match *method {
        Method::GET | Method::HEAD => {
            let rctx = RequestContext {
                path: parts.uri.path(),
                is_head: *method == Method::HEAD,
                if_none_match: header("if-none-match"),
                if_modified_since: header("if-modified-since"),
            };
            route(&rctx, &ctx).await
        }
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            http::build_405_response()
        }
    };

    if ctx.access_log_enabled() {
        let mut entry = AccessLogEntry::new(
            remote_addr.ip().to_string(),
            method.to_string(),
            parts.uri.path().to_string(),
        );
        entry.query = parts.uri.query().map(ToString::to_string);
        entry.http_version = version_label(parts.version).to_string();
        entry.user_agent = header("user-agent").map(ToString::to_string);
        let body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        entry.finish(response.status().as_u16(), body_bytes, started);
        logger::log_access(&entry, &ctx.config.logging.access_log_format);
    }

    Ok(response)
}

fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

/// Dispatch a GET/HEAD request through the routing table
pub async fn route(rctx: &RequestContext<'_>, ctx: &ServerContext) -> HttpResponse {
    match Route::classify(rctx.path, &ctx.mount_prefix) {
        Route::DefaultDocument => serve_default_document(rctx, &ctx.default_document).await,
        Route::Mount(relative) => serve_mounted(rctx, &ctx.resource_root, relative).await,
        Route::File(relative) => serve_file(rctx, &ctx.resource_root, relative).await,
    }
}

/// `GET /`: a missing default document is a server error, not a 404
async fn serve_default_document(rctx: &RequestContext<'_>, document: &Path) -> HttpResponse {
    match files::load(document).await {
        Ok(file) => http::build_file_response(file.content, file.content_type, rctx.is_head),
        Err(e) => {
            logger::log_error(&format!(
                "Default document '{}' unavailable: {e}",
                document.display()
            ));
            http::build_500_response()
        }
    }
}

/// `GET /{path}`: explicit lookup with the JSON not-found body
async fn serve_file(rctx: &RequestContext<'_>, root: &Path, relative: &str) -> HttpResponse {
    let decoded = files::decode_path(relative);
    logger::log_requested_path(&decoded);

    let loaded = match files::resolve(root, &decoded).await {
        Ok(path) => files::load(&path).await,
        Err(e) => Err(e),
    };

    match loaded {
        Ok(file) => http::build_file_response(file.content, file.content_type, rctx.is_head),
        Err(e) => file_error_response(&e, &decoded, http::build_json_404_response),
    }
}

/// `GET <prefix>/{path}`: direct mount with cache validators and a plain 404
async fn serve_mounted(rctx: &RequestContext<'_>, root: &Path, relative: &str) -> HttpResponse {
    let decoded = files::decode_path(relative);

    let path = match files::resolve(root, &decoded).await {
        Ok(p) => p,
        Err(e) => return file_error_response(&e, &decoded, http::build_404_response),
    };

    let validators = match tokio::fs::metadata(&path).await {
        Ok(meta) => Validators::from_metadata(meta.len(), meta.modified().ok()),
        Err(e) => {
            return file_error_response(&FileError::from(e), &decoded, http::build_404_response)
        }
    };
    if validators.is_not_modified(rctx.if_none_match, rctx.if_modified_since) {
        logger::log_debug(&format!("Not modified: {decoded}"));
        return http::build_304_response(&validators);
    }

    match files::load(&path).await {
        Ok(file) => {
            // Re-derive in case the file changed between stat and read
            let validators = Validators::from_metadata(file.len, file.modified);
            http::build_mount_response(file.content, file.content_type, &validators, rctx.is_head)
        }
        Err(e) => file_error_response(&e, &decoded, http::build_404_response),
    }
}

/// Traversal attempts are answered like missing files; read failures are 500
fn file_error_response(
    err: &FileError,
    requested: &str,
    not_found: fn() -> HttpResponse,
) -> HttpResponse {
    match err {
        FileError::NotFound => not_found(),
        FileError::Forbidden(reason) => {
            logger::log_warning(&format!("Path traversal attempt blocked: {reason}"));
            not_found()
        }
        FileError::Io(e) => {
            logger::log_error(&format!("Failed to read '{requested}': {e}"));
            http::build_500_response()
        }
    }
}
