//! API documentation model and emitters.
//!
//! # Data Flow
//! ```text
//! Registrar::document (scraped routes, notes, struct shapes)
//!     → ApiDoc
//!     → markdown.rs → <out>/markdown/api.md
//!     → openapi.rs  → <out>/swagger/openapi.json
//! ```

pub mod markdown;
pub mod openapi;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Documentation output failures.
#[derive(Debug, Error)]
pub enum DocsError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode OpenAPI document: {0}")]
    Json(#[from] serde_json::Error),
}

/// One field of a documented struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Serialized name.
    pub name: String,
    /// Rust type as written.
    pub rust_type: String,
    pub doc: Option<String>,
    pub required: bool,
}

/// A request or response struct, resolved from source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructInfo {
    pub name: String,
    pub doc: Option<String>,
    pub fields: Vec<FieldInfo>,
}

/// One documented route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRoute {
    pub object: String,
    pub method: String,
    /// Full path, group prefix included.
    pub path: String,
    pub verbs: Vec<String>,
    pub note: Option<String>,
    pub request: Option<StructInfo>,
    pub response: Option<StructInfo>,
}

/// Everything the emitters render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDoc {
    pub title: String,
    pub version: String,
    pub group: String,
    pub routes: Vec<DocRoute>,
}

impl ApiDoc {
    pub fn new(title: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            group: group.into(),
            routes: Vec::new(),
        }
    }

    pub fn add_route(&mut self, route: DocRoute) {
        self.routes.push(route);
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Write `markdown/api.md` and `swagger/openapi.json` under `dir`.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, DocsError> {
        let dir = dir.as_ref();
        let markdown_path = dir.join("markdown").join("api.md");
        let openapi_path = dir.join("swagger").join("openapi.json");

        write_file(&markdown_path, markdown::render(self))?;
        write_file(&openapi_path, openapi::render(self)?)?;

        Ok(vec![markdown_path, openapi_path])
    }
}

fn write_file(path: &Path, contents: String) -> Result<(), DocsError> {
    let io_err = |source| DocsError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn sample() -> ApiDoc {
        let mut doc = ApiDoc::new("demo", "/api");
        doc.add_route(DocRoute {
            object: "User".into(),
            method: "create".into(),
            path: "/api/users/{id}".into(),
            verbs: vec!["post".into(), "put".into()],
            note: Some("create or replace a user".into()),
            request: Some(StructInfo {
                name: "CreateUser".into(),
                doc: Some("New user".into()),
                fields: vec![
                    FieldInfo {
                        name: "userName".into(),
                        rust_type: "String".into(),
                        doc: Some("login name".into()),
                        required: true,
                    },
                    FieldInfo {
                        name: "age".into(),
                        rust_type: "Option<u32>".into(),
                        doc: None,
                        required: false,
                    },
                ],
            }),
            response: Some(StructInfo {
                name: "UserView".into(),
                doc: None,
                fields: vec![FieldInfo {
                    name: "id".into(),
                    rust_type: "u64".into(),
                    doc: None,
                    required: true,
                }],
            }),
        });
        doc.add_route(DocRoute {
            object: "User".into(),
            method: "ping".into(),
            path: "/api/User.ping".into(),
            verbs: vec!["get".into()],
            note: None,
            request: None,
            response: None,
        });
        doc
    }
}
