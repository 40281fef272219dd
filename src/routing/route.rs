//! Route specifications and HTTP verbs.

use std::fmt;
use std::str::FromStr;

use axum::routing::MethodFilter;
use serde::{Deserialize, Serialize};

/// Verbs the router accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
    /// Every method; exclusive on its path.
    Any,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
            Verb::Options => "OPTIONS",
            Verb::Head => "HEAD",
            Verb::Any => "ANY",
        }
    }

    /// Method filter for a single verb; `None` for [`Verb::Any`].
    pub fn filter(self) -> Option<MethodFilter> {
        match self {
            Verb::Get => Some(MethodFilter::GET),
            Verb::Post => Some(MethodFilter::POST),
            Verb::Put => Some(MethodFilter::PUT),
            Verb::Patch => Some(MethodFilter::PATCH),
            Verb::Delete => Some(MethodFilter::DELETE),
            Verb::Options => Some(MethodFilter::OPTIONS),
            Verb::Head => Some(MethodFilter::HEAD),
            Verb::Any => None,
        }
    }

    /// Whether two verbs cannot share one path.
    pub fn conflicts_with(self, other: Verb) -> bool {
        self == other || self == Verb::Any || other == Verb::Any
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            "PATCH" => Ok(Verb::Patch),
            "DELETE" => Ok(Verb::Delete),
            "OPTIONS" => Ok(Verb::Options),
            "HEAD" => Ok(Verb::Head),
            "ANY" => Ok(Verb::Any),
            _ => Err(s.to_owned()),
        }
    }
}

/// Resolved path, verbs and note of one route of a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub path: String,
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl RouteSpec {
    /// Verbs are kept in order with case-insensitive duplicates removed.
    pub fn new<I, S>(path: impl Into<String>, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for method in methods {
            let method = method.into();
            let method = method.trim();
            if !method.is_empty() && !unique.iter().any(|m| m.eq_ignore_ascii_case(method)) {
                unique.push(method.to_owned());
            }
        }

        Self {
            path: path.into(),
            methods: unique,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        self.note = (!note.is_empty()).then_some(note);
        self
    }

    /// Parse every verb; the first unsupported one is returned as the error.
    pub fn verbs(&self) -> Result<Vec<Verb>, String> {
        self.methods.iter().map(|m| m.parse::<Verb>()).collect()
    }
}

/// Provider of explicit route metadata, keyed by object and method name.
///
/// Implemented by the generated route manifest and by the source scraper.
pub trait RouteSource: Send + Sync {
    fn lookup(&self, object: &str, method: &str) -> Option<Vec<RouteSpec>>;
}
