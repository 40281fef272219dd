//! Default route naming.
//!
//! A method without explicit route metadata is mounted at
//! `<object>.<method>`: `GET` when it takes only a context, `POST` when it
//! also takes a request.

use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};

use crate::routing::route::RouteSpec;

/// Casing applied to default route segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingCase {
    /// Keep identifiers as declared (`UserInfo.Get`).
    #[default]
    Preserve,
    /// Lower snake case per segment (`user_info.get`).
    Snake,
}

impl NamingCase {
    pub fn apply(self, segment: &str) -> String {
        match self {
            NamingCase::Preserve => segment.to_owned(),
            NamingCase::Snake => segment.to_snake_case(),
        }
    }
}

/// Default route for `object.method` taking `param_count` parameters.
pub fn default_route(object: &str, method: &str, param_count: usize, case: NamingCase) -> RouteSpec {
    let verb = if param_count == 2 { "post" } else { "get" };
    let path = format!("{}.{}", case.apply(object), case.apply(method));
    RouteSpec::new(path, [verb])
}

/// Join a group prefix and a route path into an absolute router path.
///
/// Gin style `:name` and `*name` segments become `{name}` and `{*name}`.
/// A trailing slash on `relative` is kept.
pub fn join_paths(group: &str, relative: &str) -> String {
    let segments: Vec<String> = group
        .split('/')
        .chain(relative.split('/'))
        .filter(|s| !s.is_empty())
        .map(|s| {
            if let Some(name) = s.strip_prefix(':') {
                format!("{{{name}}}")
            } else if let Some(name) = s.strip_prefix('*') {
                format!("{{*{name}}}")
            } else {
                s.to_owned()
            }
        })
        .collect();

    let mut path = format!("/{}", segments.join("/"));
    if relative.ends_with('/') && path.len() > 1 {
        path.push('/');
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_verbs_follow_param_count() {
        let get = default_route("User", "Get", 1, NamingCase::Preserve);
        assert_eq!(get.path, "User.Get");
        assert_eq!(get.methods, vec!["get"]);

        let post = default_route("User", "Get", 2, NamingCase::Preserve);
        assert_eq!(post.methods, vec!["post"]);
    }

    #[test]
    fn test_snake_case_per_segment() {
        let spec = default_route("UserInfo", "GetByName", 2, NamingCase::Snake);
        assert_eq!(spec.path, "user_info.get_by_name");

        let spec = default_route("User", "Get", 1, NamingCase::Snake);
        assert_eq!(spec.path, "user.get");
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/api", "User.Get"), "/api/User.Get");
        assert_eq!(join_paths("/api/", "/custom/path"), "/api/custom/path");
        assert_eq!(join_paths("", "hello"), "/hello");
        assert_eq!(join_paths("/", ""), "/");
        assert_eq!(join_paths("/v1", "users/"), "/v1/users/");
        assert_eq!(join_paths("/v1", "/users/:id/files/*rest"), "/v1/users/{id}/files/{*rest}");
    }
}
