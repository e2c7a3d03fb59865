// Configuration module entry point
// Loads, validates and resolves the server configuration

mod state;
mod types;

use std::net::{IpAddr, SocketAddr};

pub use state::ServerContext;
pub use types::Config;

/// Environment variable prefix, e.g. `RESOURCE_SERVER_SERVER__PORT=9000`
const ENV_PREFIX: &str = "RESOURCE_SERVER";

/// Log levels accepted by `logging.level`
const LOG_LEVELS: [&str; 4] = ["error", "warn", "info", "debug"];

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("resources.root", "resources")?
            .set_default("resources.default_document", "resources/index.html")?
            .set_default("resources.mount_prefix", "/static")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that would make routing or binding ambiguous
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be non-zero"));
        }

        let prefix = self.resources.mount_prefix.trim_end_matches('/');
        if !self.resources.mount_prefix.starts_with('/') {
            return Err(invalid(&format!(
                "resources.mount_prefix must start with '/': {}",
                self.resources.mount_prefix
            )));
        }
        // "/" would shadow both the default document and the file route
        if prefix.is_empty() {
            return Err(invalid("resources.mount_prefix must not be '/'"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(&format!(
                "logging.level must be one of {LOG_LEVELS:?}, got '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Bind address; `host` is a bare IPv4 or IPv6 literal (`0.0.0.0`, `::`)
    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|e| format!("Invalid address '{}': {e}", self.server.host))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}

fn invalid(message: &str) -> config::ConfigError {
    config::ConfigError::Message(message.to_string())
}
