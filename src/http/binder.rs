//! Request binding and validation.
//!
//! # Data Flow
//! ```text
//! Context (method, content type, query, body)
//!     → decode: query string | JSON body | urlencoded body
//!     → validate: `validator::Validate`
//!     → typed request value, or one aggregated BindError
//! ```
//!
//! # Design Decisions
//! - `GET`, `HEAD`, `DELETE` and bodyless requests bind from the query string
//! - JSON decoding tracks the field path so type errors name the field
//! - A missing field is reported the same way as a failed `required` rule
//! - Violations are sorted by field so messages are stable

use std::fmt;
use std::sync::LazyLock;

use axum::http::Method;
use heck::ToSnakeCase;
use regex::Regex;
use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::forward_to_deserialize_any;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::http::request::Context;

static MISSING_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^missing field `([^`]+)`").expect("valid regex"));

static INVALID_INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^invalid (?:type|value|length): (.+?), expected (.+?)(?: at line \d+ column \d+)?$")
        .expect("valid regex")
});

/// Types that can be populated and validated from a request.
pub trait Bind: Sized {
    fn bind(ctx: &Context) -> Result<Self, BindError>;
}

impl<T> Bind for T
where
    T: DeserializeOwned + Validate,
{
    fn bind(ctx: &Context) -> Result<Self, BindError> {
        let value: T = decode(ctx)?;
        value
            .validate()
            .map_err(|errors| BindError::from(errors).with_wire_names(wire_names::<T>()))?;
        Ok(value)
    }
}

/// Bind `T` from the request held by `ctx`.
pub fn bind<T: Bind>(ctx: &Context) -> Result<T, BindError> {
    T::bind(ctx)
}

/// One failed field constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Serialized field name, dotted for nested values.
    pub field: String,
    /// Constraint tag, e.g. `required`, `length`, `range`, `email`.
    pub code: String,
    /// Constraint parameters, sorted by name.
    pub params: Vec<(String, String)>,
    /// Offending value, when the constraint reports one.
    pub value: Option<String>,
}

impl FieldViolation {
    pub fn required(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: "required".into(),
            params: Vec::new(),
            value: None,
        }
    }

    fn from_error(field: String, error: &ValidationError) -> Self {
        let mut params: Vec<(String, String)> = error
            .params
            .iter()
            .filter(|(name, _)| name.as_ref() != "value")
            .map(|(name, value)| (name.to_string(), render_value(value)))
            .collect();
        params.sort();

        Self {
            field,
            code: error.code.to_string(),
            params,
            value: error.params.get("value").map(render_value),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.code)?;
        if !self.params.is_empty() {
            let params = self
                .params
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(",");
            write!(f, "[{params}](but[{}])", self.value.as_deref().unwrap_or_default())?;
        }
        Ok(())
    }
}

/// Why a request could not be bound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// One or more field constraints failed.
    #[error("{}", join_violations(.0))]
    Validation(Vec<FieldViolation>),

    /// A value had the wrong type for its field.
    #[error("{field}:{expected}(but[{actual}])")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// Any other decode failure, as reported by the decoder.
    #[error("{0}")]
    Other(String),
}

impl BindError {
    /// Message carried by the `ParameterInvalid` envelope.
    pub fn render(&self) -> String {
        format!("req param : {self}")
    }

    /// Report violations under the serialized field names in `wire`.
    ///
    /// `validator` keys errors by Rust ident (or a field's own serde
    /// `rename`) and never sees a container `rename_all`. The top-level
    /// segment of each field is matched against `wire` by its snake case form.
    pub fn with_wire_names(self, wire: &[&str]) -> Self {
        let BindError::Validation(mut violations) = self else {
            return self;
        };
        for violation in &mut violations {
            let split = violation.field.find(['.', '[']).unwrap_or(violation.field.len());
            let (head, rest) = violation.field.split_at(split);
            if wire.contains(&head) {
                continue;
            }
            if let Some(name) = wire.iter().find(|name| name.to_snake_case() == head) {
                violation.field = format!("{name}{rest}");
            }
        }
        violations.sort_by(|a, b| (&a.field, &a.code).cmp(&(&b.field, &b.code)));
        BindError::Validation(violations)
    }
}

/// Serialized field names of struct `T`, as its `Deserialize` impl expects them.
///
/// Empty when `T` does not deserialize as a plain struct (maps, `flatten`).
pub fn wire_names<T: DeserializeOwned>() -> &'static [&'static str] {
    let mut fields = None;
    let _ = T::deserialize(FieldNames(&mut fields));
    fields.unwrap_or_default()
}

/// Deserializer that records the field list of the struct asked for, then stops.
struct FieldNames<'a>(&'a mut Option<&'static [&'static str]>);

impl<'de> Deserializer<'de> for FieldNames<'_> {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("not a struct"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        *self.0 = Some(fields);
        Err(de::Error::custom("field names recorded"))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

impl From<ValidationErrors> for BindError {
    fn from(errors: ValidationErrors) -> Self {
        let mut violations = Vec::new();
        flatten("", &errors, &mut violations);
        violations.sort_by(|a, b| (&a.field, &a.code).cmp(&(&b.field, &b.code)));
        BindError::Validation(violations)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldViolation>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                out.extend(list.iter().map(|e| FieldViolation::from_error(path.clone(), e)));
            }
            ValidationErrorsKind::Struct(inner) => flatten(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(&format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn decode<T: DeserializeOwned>(ctx: &Context) -> Result<T, BindError> {
    let method = ctx.method();
    if *method == Method::GET || *method == Method::HEAD || *method == Method::DELETE || ctx.body().is_empty() {
        return decode_form(ctx.query().as_bytes());
    }

    match ctx.content_type().as_deref() {
        None => decode_json(ctx.body()),
        Some(ct) if ct == "application/json" || ct.ends_with("+json") => decode_json(ctx.body()),
        Some("application/x-www-form-urlencoded") => decode_form(ctx.body()),
        Some(other) => Err(BindError::Other(format!("unsupported content type: {other}"))),
    }
}

fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, BindError> {
    let mut de = serde_json::Deserializer::from_slice(body);
    let value = serde_path_to_error::deserialize(&mut de).map_err(|err| {
        let path = err.path().to_string();
        classify(&path, &err.into_inner().to_string())
    })?;
    de.end().map_err(|err| BindError::Other(err.to_string()))?;
    Ok(value)
}

fn decode_form<T: DeserializeOwned>(input: &[u8]) -> Result<T, BindError> {
    serde_urlencoded::from_bytes(input).map_err(|err| classify(".", &err.to_string()))
}

/// Sort a decoder message into the three reported shapes.
fn classify(path: &str, message: &str) -> BindError {
    let at_root = path.is_empty() || path == ".";

    if let Some(caps) = MISSING_FIELD.captures(message) {
        let field = if at_root {
            caps[1].to_owned()
        } else {
            format!("{path}.{}", &caps[1])
        };
        return BindError::Validation(vec![FieldViolation::required(field)]);
    }

    if !at_root {
        if let Some(caps) = INVALID_INPUT.captures(message) {
            return BindError::TypeMismatch {
                field: path.to_owned(),
                expected: caps[2].to_owned(),
                actual: caps[1].to_owned(),
            };
        }
    }

    BindError::Other(message.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::Request;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct CreateUser {
        #[validate(length(min = 2, max = 8))]
        name: String,
        #[validate(range(min = 18))]
        age: u32,
        #[validate(required)]
        email: Option<String>,
        #[serde(rename = "luckyNumber", default)]
        lucky: Option<u32>,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Search {
        q: String,
        #[serde(default)]
        page: u32,
    }

    fn ctx(method: &str, uri: &str, content_type: Option<&str>, body: &'static str) -> Context {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        Context::from(builder.body(Bytes::from_static(body.as_bytes())).unwrap())
    }

    #[test]
    fn test_binds_json_body() {
        let c = ctx(
            "POST",
            "/",
            Some("application/json"),
            r#"{"name":"ann","age":30,"email":"a@b.c","luckyNumber":7}"#,
        );
        let user: CreateUser = bind(&c).unwrap();
        assert_eq!(user.name, "ann");
        assert_eq!(user.age, 30);
        assert_eq!(user.lucky, Some(7));
    }

    #[test]
    fn test_binds_query_for_get() {
        let c = ctx("GET", "/?q=rust&page=2", None, "");
        let search: Search = bind(&c).unwrap();
        assert_eq!(search.q, "rust");
        assert_eq!(search.page, 2);
    }

    #[test]
    fn test_binds_urlencoded_body() {
        let c = ctx("POST", "/", Some("application/x-www-form-urlencoded"), "q=axum");
        let search: Search = bind(&c).unwrap();
        assert_eq!(search.q, "axum");
        assert_eq!(search.page, 0);
    }

    #[test]
    fn test_required_rule_and_missing_field() {
        let c = ctx("POST", "/", None, r#"{"name":"ann","age":30}"#);
        let err = bind::<CreateUser>(&c).unwrap_err();
        assert_eq!(err.to_string(), "email:required");

        let c = ctx("POST", "/", None, r#"{"age":30,"email":"a@b.c"}"#);
        let err = bind::<CreateUser>(&c).unwrap_err();
        assert_eq!(err.to_string(), "name:required");
    }

    #[test]
    fn test_parameterized_violations_are_joined() {
        let c = ctx("POST", "/", None, r#"{"name":"a","age":3,"email":"x"}"#);
        let message = bind::<CreateUser>(&c).unwrap_err().render();
        assert!(message.starts_with("req param : age:range[min=18"), "{message}");
        assert!(message.contains("](but[3]);name:length[max=8,min=2](but[a])"), "{message}");
    }

    #[test]
    fn test_type_mismatch_names_the_field() {
        let c = ctx("POST", "/", None, r#"{"name":"ann","age":30,"email":"a@b.c","luckyNumber":"seven"}"#);
        match bind::<CreateUser>(&c).unwrap_err() {
            BindError::TypeMismatch { field, expected, actual } => {
                assert_eq!(field, "luckyNumber");
                assert_eq!(expected, "u32");
                assert_eq!(actual, "string \"seven\"");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_other_errors_keep_decoder_text() {
        let c = ctx("POST", "/", None, "{not json");
        assert!(matches!(bind::<CreateUser>(&c), Err(BindError::Other(_))));

        let c = ctx("POST", "/", Some("text/plain"), "hello");
        assert_eq!(
            bind::<Search>(&c).unwrap_err().to_string(),
            "unsupported content type: text/plain"
        );
    }

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Signup {
        #[validate(length(min = 3))]
        user_name: String,
        #[validate(range(max = 5))]
        retry_count: u32,
        #[serde(rename = "mail")]
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_violations_use_serialized_names() {
        assert_eq!(wire_names::<Signup>(), ["userName", "retryCount", "mail"]);

        let c = ctx(
            "POST",
            "/",
            None,
            r#"{"userName":"ab","retryCount":9,"mail":"nope"}"#,
        );
        let message = bind::<Signup>(&c).unwrap_err().render();
        assert!(message.contains("userName:length[min=3](but[ab])"), "{message}");
        assert!(message.contains("retryCount:range[max=5"), "{message}");
        assert!(message.contains("mail:email"), "{message}");
        assert!(!message.contains("user_name"), "{message}");
    }

    #[test]
    fn test_wire_names_of_non_structs_are_empty() {
        assert!(wire_names::<std::collections::HashMap<String, u32>>().is_empty());
        assert!(wire_names::<u32>().is_empty());
    }
}
