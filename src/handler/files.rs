//! File resolution module
//!
//! Maps a request path onto the resource root and loads the file it names.

use crate::http::mime;
use hyper::body::Bytes;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

/// Why a request path could not be served
#[derive(Debug)]
pub enum FileError {
    /// No regular file at the resolved location (missing or a directory)
    NotFound,
    /// The path tried to leave the resource root
    Forbidden(String),
    /// The file exists but could not be read
    Io(io::Error),
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "file not found"),
            Self::Forbidden(reason) => write!(f, "forbidden path: {reason}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FileError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::Io(e),
        }
    }
}

/// A file read into memory for a single response
#[derive(Debug)]
pub struct LoadedFile {
    pub content: Bytes,
    pub content_type: &'static str,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

/// Percent-decode a URL path; malformed escapes are kept literally
pub fn decode_path(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..=i + 2]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Join a decoded relative path onto the root, rejecting traversal
///
/// Only `Normal` segments are kept; `.` and empty segments are skipped.
pub fn join_under_root(root: &Path, relative: &str) -> Result<PathBuf, FileError> {
    let mut candidate = root.to_path_buf();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(FileError::Forbidden(format!("parent segment in '{relative}'"))),
            s if s.contains('\0') || s.contains('\\') => {
                return Err(FileError::Forbidden(format!("invalid segment in '{relative}'")));
            }
            s => candidate.push(s),
        }
    }
    Ok(candidate)
}

/// Resolve a relative request path to an existing regular file beneath `root`
///
/// `root` must be canonical. Symlinks are followed but must stay inside the root.
pub async fn resolve(root: &Path, relative: &str) -> Result<PathBuf, FileError> {
    let candidate = join_under_root(root, relative)?;
    let canonical = fs::canonicalize(&candidate).await.map_err(lookup_error)?;
    if !canonical.starts_with(root) {
        return Err(FileError::Forbidden(format!(
            "'{relative}' resolves outside the resource root"
        )));
    }
    if !fs::metadata(&canonical).await.map_err(lookup_error)?.is_file() {
        return Err(FileError::NotFound);
    }
    Ok(canonical)
}

/// A failed lookup means the path names no file (missing, through a regular
/// file, name too long, ...), unless access itself was refused
fn lookup_error(e: io::Error) -> FileError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => FileError::Io(e),
        _ => FileError::NotFound,
    }
}

/// Read a regular file and infer its content type
pub async fn load(path: &Path) -> Result<LoadedFile, FileError> {
    let metadata = fs::metadata(path).await?;
    if !metadata.is_file() {
        return Err(FileError::NotFound);
    }
    let content = fs::read(path).await?;
    Ok(LoadedFile {
        len: content.len() as u64,
        content: Bytes::from(content),
        content_type: mime::content_type_for(path),
        modified: metadata.modified().ok(),
    })
}
