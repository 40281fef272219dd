//! Route manifest.
//!
//! ```toml
//! [[routes."User.get"]]
//! path = "/users/:id"
//! methods = ["get"]
//! note = "looks a user up"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::routing::route::{RouteSource, RouteSpec};
use crate::scrape::ScrapeError;

/// RouteSpecs keyed by `object.method`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    #[serde(default)]
    routes: BTreeMap<String, Vec<RouteSpec>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object: &str, method: &str, specs: Vec<RouteSpec>) {
        self.routes.insert(format!("{object}.{method}"), specs);
    }

    pub fn get(&self, object: &str, method: &str) -> Option<&[RouteSpec]> {
        self.routes
            .get(&format!("{object}.{method}"))
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScrapeError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ScrapeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ScrapeError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ScrapeError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;
        let io_err = |source| ScrapeError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, contents).map_err(io_err)
    }
}

impl RouteSource for RouteTable {
    fn lookup(&self, object: &str, method: &str) -> Option<Vec<RouteSpec>> {
        self.get(object, method).map(<[RouteSpec]>::to_vec)
    }
}
