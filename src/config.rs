//! # Configuration
//!
//! [`AppConfig`] is read from a TOML or YAML file and then adjusted by
//! environment variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `CONVROUTE_HOST` | `server.host` |
//! | `CONVROUTE_PORT` | `server.port` |
//! | `CONVROUTE_BASE_PATH` | `server.base_path` |
//! | `CONVROUTE_DOCS` | `docs.enabled` (`true`/`false`) |
//! | `CONVROUTE_REQUEST_TIMEOUT_MS` | `request_timeout_ms` |
//! | `CONVROUTE_STACK_SIZE` | coroutine stack size, decimal or `0x` hex |
//!
//! ```toml
//! name = "users-api"
//! version = "1.2.0"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [routes_file]
//! enabled = true
//! output_dir = "target/generated"
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::RouteError;
use crate::logging::LogConfig;

/// Default coroutine stack size (64 KiB).
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            base_path: "/".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    pub enabled: bool,
    pub openapi_path: String,
    pub ui_path: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            openapi_path: "/openapi.json".to_string(),
            ui_path: "/docs".to_string(),
        }
    }
}

impl DocsConfig {
    /// YAML variant of the document, served next to the JSON one.
    pub fn openapi_yaml_path(&self) -> String {
        match self.openapi_path.strip_suffix(".json") {
            Some(stem) => format!("{stem}.yaml"),
            None => format!("{}.yaml", self.openapi_path.trim_end_matches('/')),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesFileConfig {
    pub enabled: bool,
    pub output_dir: PathBuf,
}

impl Default for RoutesFileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: PathBuf::from("generated"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret for the bundled JWT authenticator.
    pub jwt_secret: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
    pub description: String,
    pub server: ServerConfig,
    pub docs: DocsConfig,
    pub routes_file: RoutesFileConfig,
    pub request_timeout_ms: Option<u64>,
    pub stack_size: usize,
    pub auth: AuthConfig,
    #[serde(skip_serializing)]
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "convroute".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: String::new(),
            server: ServerConfig::default(),
            docs: DocsConfig::default(),
            routes_file: RoutesFileConfig::default(),
            request_timeout_ms: None,
            stack_size: DEFAULT_STACK_SIZE,
            auth: AuthConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Parse `16384` or `0x4000`.
pub fn parse_size(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    /// Read a `.toml`, `.yaml` or `.yml` file. Environment overrides are not applied.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RouteError> {
        let path = path.as_ref();
        let config_err = |message: String| RouteError::Config {
            path: path.display().to_string(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => toml::from_str(&text).map_err(|e| config_err(e.to_string())),
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&text).map_err(|e| config_err(e.to_string()))
            }
            other => Err(config_err(format!(
                "unsupported config format `{}`",
                other.unwrap_or("")
            ))),
        }
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = env::var("CONVROUTE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("CONVROUTE_PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid CONVROUTE_PORT"),
            }
        }
        if let Ok(base) = env::var("CONVROUTE_BASE_PATH") {
            self.server.base_path = base;
        }
        if let Ok(docs) = env::var("CONVROUTE_DOCS") {
            match parse_bool(&docs) {
                Some(enabled) => self.docs.enabled = enabled,
                None => warn!(value = %docs, "Ignoring invalid CONVROUTE_DOCS"),
            }
        }
        if let Ok(timeout) = env::var("CONVROUTE_REQUEST_TIMEOUT_MS") {
            match timeout.trim().parse() {
                Ok(ms) => self.request_timeout_ms = Some(ms),
                Err(_) => warn!(value = %timeout, "Ignoring invalid CONVROUTE_REQUEST_TIMEOUT_MS"),
            }
        }
        if let Ok(stack) = env::var("CONVROUTE_STACK_SIZE") {
            match parse_size(&stack) {
                Some(size) => self.stack_size = size,
                None => warn!(value = %stack, "Ignoring invalid CONVROUTE_STACK_SIZE"),
            }
        }
        self.log = self.log.with_env_overrides();
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.address(), "127.0.0.1:3000");
        assert_eq!(config.server.base_path, "/");
        assert!(config.docs.enabled);
        assert_eq!(config.docs.openapi_path, "/openapi.json");
        assert_eq!(config.docs.openapi_yaml_path(), "/openapi.yaml");
        assert_eq!(config.docs.ui_path, "/docs");
        assert!(!config.routes_file.enabled);
        assert_eq!(config.stack_size, 0x10000);
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("16384"), Some(16384));
        assert_eq!(parse_size("0x4000"), Some(0x4000));
        assert_eq!(parse_size("0X10"), Some(16));
        assert_eq!(parse_size("lots"), None);
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "name = \"users\"\nrequest_timeout_ms = 250\n[server]\nport = 8080\n[routes_file]\nenabled = true"
        )
        .unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.name, "users");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.routes_file.enabled);
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "name: orders\ndocs:\n  enabled: false\n").unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.name, "orders");
        assert!(!config.docs.enabled);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, RouteError::Config { .. }));
    }
}
