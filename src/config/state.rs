// Server context module
// The explicit server instance shared by every connection

use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;

use super::types::Config;

/// Immutable per-process server state, built once in `main` and shared via `Arc`
pub struct ServerContext {
    pub config: Config,
    /// Canonical resource root, used for traversal checks
    pub resource_root: PathBuf,
    /// File served for `GET /`
    pub default_document: PathBuf,
    /// Mount prefix without trailing slash, e.g. `/static`
    pub mount_prefix: String,
    /// Active connection counter for `performance.max_connections`
    pub active_connections: AtomicUsize,
}

impl ServerContext {
    /// Resolve configured locations; fails if the resource root is not a directory
    pub fn new(config: Config) -> Result<Self, config::ConfigError> {
        let resource_root = PathBuf::from(&config.resources.root)
            .canonicalize()
            .map_err(|e| {
                config::ConfigError::Message(format!(
                    "Resource root '{}' is not accessible: {e}",
                    config.resources.root
                ))
            })?;
        if !resource_root.is_dir() {
            return Err(config::ConfigError::Message(format!(
                "Resource root '{}' is not a directory",
                config.resources.root
            )));
        }

        let default_document = PathBuf::from(&config.resources.default_document);
        let mount_prefix = config
            .resources
            .mount_prefix
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            config,
            resource_root,
            default_document,
            mount_prefix,
            active_connections: AtomicUsize::new(0),
        })
    }

    pub fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_root(root: &str) -> Config {
        let mut cfg = Config::load_from("no/such/config").unwrap();
        cfg.resources.root = root.to_string();
        cfg
    }

    #[test]
    fn test_context_resolves_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config_with_root(dir.path().to_str().unwrap());
        cfg.resources.mount_prefix = "/assets/".to_string();

        let ctx = ServerContext::new(cfg).unwrap();
        assert_eq!(ctx.resource_root, dir.path().canonicalize().unwrap());
        assert_eq!(ctx.mount_prefix, "/assets");
    }

    #[test]
    fn test_missing_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let cfg = config_with_root(missing.to_str().unwrap());
        assert!(ServerContext::new(cfg).is_err());
    }

    #[test]
    fn test_file_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();
        let cfg = config_with_root(file.to_str().unwrap());
        assert!(ServerContext::new(cfg).is_err());
    }
}
