//! Route metadata from source comments.
//!
//! # Data Flow
//! ```text
//! source root (walkdir, symlinks followed)
//!     → source.rs (syn: impl methods, structs, imports)
//!     → annotations.rs (@Router lines, notes)
//!     → SourceScraper: RouteSource + struct shapes for docs
//!
//! Registrar::document → RouteTable → route manifest (TOML)
//! route manifest → RouteTable: RouteSource at start-up
//! ```
//!
//! # Design Decisions
//! - Unreadable or unparsable files are skipped, never fatal
//! - Lookups are by object and method name, matching `Routable::object_name`
//! - The manifest keeps runtime routing independent of source availability

pub mod annotations;
pub mod source;
pub mod table;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use annotations::{parse_doc, ParsedDoc};
pub use source::{MethodDoc, SourceScraper};
pub use table::RouteTable;

/// Scraper and manifest failures.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("source root {0} does not exist")]
    MissingRoot(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: syn::Error,
    },

    #[error("invalid route manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to encode route manifest: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Where a request or response type comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamInfo {
    /// Last path segment, e.g. `CreateUser`.
    pub type_name: String,
    /// Module qualifier as written, e.g. `models` for `models::CreateUser`.
    pub package: Option<String>,
    /// Fully resolved path when known, e.g. `crate::models::CreateUser`.
    pub import_path: Option<String>,
}
