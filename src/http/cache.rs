//! HTTP cache validator module
//!
//! `ETag` / `Last-Modified` generation and conditional request checks for the mount.

use chrono::{DateTime, Utc};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

/// `Cache-Control` sent with mounted files
pub const MOUNT_CACHE_CONTROL: &str = "public, max-age=3600";

/// Validators describing one version of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    /// Quoted `ETag`, e.g. `"1a2b3c"`
    pub etag: String,
    /// Modification time, whole seconds
    pub last_modified: Option<DateTime<Utc>>,
}

impl Validators {
    /// Derive validators from file metadata (size + mtime), without hashing content
    pub fn from_metadata(len: u64, modified: Option<SystemTime>) -> Self {
        let last_modified = modified.map(|m| truncate_to_seconds(DateTime::<Utc>::from(m)));

        let mut hasher = DefaultHasher::new();
        len.hash(&mut hasher);
        last_modified.map(|t| t.timestamp()).hash(&mut hasher);

        Self {
            etag: format!("\"{:x}\"", hasher.finish()),
            last_modified,
        }
    }

    /// `Last-Modified` header value in IMF-fixdate form
    pub fn last_modified_header(&self) -> Option<String> {
        self.last_modified.map(format_http_date)
    }

    /// Whether a conditional GET can be answered with 304
    ///
    /// `If-None-Match` wins when present; `If-Modified-Since` is only consulted without it.
    pub fn is_not_modified(
        &self,
        if_none_match: Option<&str>,
        if_modified_since: Option<&str>,
    ) -> bool {
        if let Some(client_etags) = if_none_match {
            return client_etags
                .split(',')
                .map(str::trim)
                .any(|e| e == "*" || e.trim_start_matches("W/") == self.etag);
        }

        match (if_modified_since.and_then(parse_http_date), self.last_modified) {
            (Some(since), Some(modified)) => modified <= since,
            _ => false,
        }
    }
}

fn truncate_to_seconds(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(t.timestamp(), 0).unwrap_or(t)
}

/// Format as `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn format_http_date(t: DateTime<Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse an IMF-fixdate (RFC 2822 parsing accepts the `GMT` zone)
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn mtime(secs: u64) -> Option<SystemTime> {
        Some(UNIX_EPOCH + Duration::from_secs(secs))
    }

    #[test]
    fn test_etag_is_quoted_and_stable() {
        let a = Validators::from_metadata(10, mtime(1_000));
        let b = Validators::from_metadata(10, mtime(1_000));
        assert!(a.etag.starts_with('"') && a.etag.ends_with('"'));
        assert_eq!(a, b);
    }

    #[test]
    fn test_etag_changes_with_size_or_mtime() {
        let base = Validators::from_metadata(10, mtime(1_000));
        assert_ne!(base.etag, Validators::from_metadata(11, mtime(1_000)).etag);
        assert_ne!(base.etag, Validators::from_metadata(10, mtime(2_000)).etag);
    }

    #[test]
    fn test_http_date_round_trip() {
        let v = Validators::from_metadata(1, mtime(784_111_777));
        let header = v.last_modified_header().unwrap();
        assert_eq!(header, "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(parse_http_date(&header), v.last_modified);
    }

    #[test]
    fn test_if_none_match() {
        let v = Validators::from_metadata(10, mtime(1_000));
        let etag = v.etag.clone();
        assert!(v.is_not_modified(Some(&etag), None));
        assert!(v.is_not_modified(Some(&format!("\"other\", {etag}")), None));
        assert!(v.is_not_modified(Some(&format!("W/{etag}")), None));
        assert!(v.is_not_modified(Some("*"), None));
        assert!(!v.is_not_modified(Some("\"other\""), None));
        assert!(!v.is_not_modified(None, None));
    }

    #[test]
    fn test_if_modified_since() {
        let v = Validators::from_metadata(10, mtime(784_111_777));
        assert!(v.is_not_modified(None, Some("Sun, 06 Nov 1994 08:49:37 GMT")));
        assert!(v.is_not_modified(None, Some("Mon, 07 Nov 1994 08:49:37 GMT")));
        assert!(!v.is_not_modified(None, Some("Sat, 05 Nov 1994 08:49:37 GMT")));
        assert!(!v.is_not_modified(None, Some("garbage")));
        // If-None-Match takes precedence
        assert!(!v.is_not_modified(Some("\"other\""), Some("Mon, 07 Nov 1994 08:49:37 GMT")));
    }
}
