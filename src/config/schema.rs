//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::observability::logging::LogFormat;
use crate::routing::{DuplicatePolicy, NamingCase};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Listener and request limits.
    pub server: ServerConfig,

    /// Route registration policy.
    pub routing: RoutingConfig,

    /// Documentation generation.
    pub docs: DocsConfig,

    /// Log level and format.
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            body_limit_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Registration configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    /// Prefix for every registered route.
    pub group: String,

    /// Casing of default route segments.
    pub naming: NamingCase,

    /// Precedence when registrations collide.
    pub duplicate_policy: DuplicatePolicy,

    /// Route manifest read at start-up and written by doc generation.
    pub route_table: Option<PathBuf>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            group: "/".to_string(),
            naming: NamingCase::default(),
            duplicate_policy: DuplicatePolicy::default(),
            route_table: None,
        }
    }
}

/// Documentation generation configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DocsConfig {
    /// Generate docs at start-up.
    pub enabled: bool,

    /// Root scanned for `@Router` annotations and struct shapes.
    pub source_root: PathBuf,

    /// Output directory for `markdown/` and `swagger/`.
    pub out_dir: PathBuf,

    /// Title of the generated documents.
    pub title: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source_root: PathBuf::from("."),
            out_dir: PathBuf::from("docs"),
            title: "API".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}
