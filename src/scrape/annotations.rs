//! `@Router` annotations in doc comments.
//!
//! ```text
//! /// @Router /users/:id [get,delete]
//! /// @Router /users
//! /// get_user looks a user up by id
//! ```
//!
//! Verbs default to `get`. Lines starting with the method name form the note,
//! which is attached to every route of the method.

use std::sync::LazyLock;

use regex::Regex;

use crate::routing::route::RouteSpec;

static ROUTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@Router\s+(\S+)(?:\s+\[(\S+)\])?").expect("valid regex"));

/// Routes and note recovered from one method's doc comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDoc {
    pub routes: Vec<RouteSpec>,
    pub note: Option<String>,
}

/// Parse the doc lines of `method`.
pub fn parse_doc<'a, I>(lines: I, method: &str) -> ParsedDoc
where
    I: IntoIterator<Item = &'a str>,
{
    let mut routes = Vec::new();
    let mut note = String::new();

    for line in lines {
        let line = line.trim();
        if line.starts_with("@Router") {
            let Some(captures) = ROUTER.captures(line) else {
                tracing::debug!(method, line, "Ignoring malformed @Router annotation");
                continue;
            };
            let path = &captures[1];
            let verbs: Vec<&str> = match captures.get(2) {
                Some(verbs) => verbs.as_str().split(',').collect(),
                None => vec!["get"],
            };
            routes.push(RouteSpec::new(path, verbs));
        } else if !method.is_empty() {
            if let Some(rest) = line.strip_prefix(method) {
                let rest = rest.trim();
                if !rest.is_empty() {
                    if !note.is_empty() {
                        note.push(' ');
                    }
                    note.push_str(rest);
                }
            }
        }
    }

    let note = (!note.is_empty()).then_some(note);
    if let Some(note) = &note {
        routes = routes
            .into_iter()
            .map(|route| route.with_note(note.clone()))
            .collect();
    }

    ParsedDoc { routes, note }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_and_note() {
        let parsed = parse_doc(
            [
                " @Router /users/:id [get,DELETE]",
                " @Router /users",
                " get_user looks a user up",
                " by id, on this unrelated line",
                " get_user and returns it",
            ],
            "get_user",
        );

        assert_eq!(parsed.note.as_deref(), Some("looks a user up and returns it"));
        assert_eq!(parsed.routes.len(), 2);
        assert_eq!(parsed.routes[0].path, "/users/:id");
        assert_eq!(parsed.routes[0].methods, vec!["get", "DELETE"]);
        assert_eq!(parsed.routes[1].methods, vec!["get"]);
        assert_eq!(parsed.routes[1].note.as_deref(), Some("looks a user up and returns it"));
    }

    #[test]
    fn test_malformed_and_missing_annotations() {
        let parsed = parse_doc(["@Router", "plain documentation"], "create");
        assert_eq!(parsed, ParsedDoc::default());

        let parsed = parse_doc(["@Router /a [post,put]"], "create");
        assert_eq!(parsed.routes, vec![RouteSpec::new("/a", ["post", "put"])]);
        assert_eq!(parsed.note, None);
    }
}
