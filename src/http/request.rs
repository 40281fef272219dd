//! Per-request context handed to routed methods.
//!
//! # Responsibilities
//! - Own the request data a method may read (method, uri, headers, body, path params)
//! - Carry the request ID (taken from `x-request-id` or generated as UUID v4)
//! - Hold the response a method writes for itself
//!
//! # Design Decisions
//! - Built fresh for every request; methods only borrow it
//! - The body is buffered up front so binding can pick query, JSON or form
//! - A method that writes nothing produces an empty `200 OK`

use axum::{
    body::{Body, Bytes},
    extract::{FromRequestParts, RawPathParams},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::http::binder::{Bind, BindError};

/// Header used to read and echo the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// The raw per-request context.
#[derive(Debug)]
pub struct Context {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: Vec<(String, String)>,
    request_id: String,
    response: Option<Response>,
}

impl Context {
    /// Build a context from request parts and an already buffered body.
    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params: Vec::new(),
            request_id,
            response: None,
        }
    }

    /// Buffer an incoming axum request into a context, reading at most `limit` body bytes.
    pub async fn from_request(request: Request<Body>, limit: usize) -> Result<Self, axum::Error> {
        let (mut parts, body) = request.into_parts();
        let params = match RawPathParams::from_request_parts(&mut parts, &()).await {
            Ok(raw) => raw
                .iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
            Err(_) => Vec::new(),
        };
        let body = axum::body::to_bytes(body, limit).await?;

        let mut ctx = Self::from_parts(parts, body);
        ctx.params = params;
        Ok(ctx)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Raw query string, empty when absent.
    pub fn query(&self) -> &str {
        self.uri.query().unwrap_or("")
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Header value as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Media type of the body without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.header(header::CONTENT_TYPE.as_str()).map(|v| {
            v.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// Path parameter captured by the router (`/users/{id}`).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Bind and validate a request value from this context.
    pub fn bind<T: Bind>(&self) -> Result<T, BindError> {
        T::bind(self)
    }

    /// Write a JSON response.
    pub fn json<T: Serialize>(&mut self, status: StatusCode, value: &T) {
        self.respond((status, Json(value)));
    }

    /// Write a plain text response.
    pub fn text(&mut self, status: StatusCode, body: impl Into<String>) {
        self.respond((status, body.into()));
    }

    /// Write an empty response with the given status.
    pub fn status(&mut self, status: StatusCode) {
        self.respond(status);
    }

    /// Write any axum response, replacing a previously written one.
    pub fn respond(&mut self, response: impl IntoResponse) {
        self.response = Some(response.into_response());
    }

    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    /// Take the written response, leaving the context without one.
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}

impl From<Request<Bytes>> for Context {
    fn from(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::from_parts(parts, body)
    }
}

/// Capability shared by the raw [`Context`] and application decorators over it.
///
/// A routed method declares either `&mut Context` or `&mut C` for the one
/// custom context registered on the [`Registrar`](crate::routing::Registrar).
pub trait ApiContext: Send + 'static {
    fn context(&mut self) -> &mut Context;
}

impl ApiContext for Context {
    fn context(&mut self) -> &mut Context {
        self
    }
}

/// Echo the request ID on an outgoing response.
pub(crate) fn tag_request_id(response: &mut Response, request_id: &str) {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, body: &'static str) -> Request<Bytes> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "Application/JSON; charset=utf-8")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    #[test]
    fn test_request_id_from_header_or_generated() {
        let req = Request::builder()
            .header(X_REQUEST_ID, "abc-123")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(Context::from(req).request_id(), "abc-123");

        let ctx = Context::from(request("/", ""));
        assert!(Uuid::parse_str(ctx.request_id()).is_ok());
    }

    #[test]
    fn test_accessors() {
        let ctx = Context::from(request("/users?id=7", "{}"));
        assert_eq!(*ctx.method(), Method::POST);
        assert_eq!(ctx.query(), "id=7");
        assert_eq!(ctx.content_type().as_deref(), Some("application/json"));
        assert_eq!(ctx.body().as_ref(), b"{}");
        assert_eq!(ctx.param("id"), None);
    }

    #[test]
    fn test_written_response_is_taken_once() {
        let mut ctx = Context::from(request("/", ""));
        assert!(!ctx.has_response());

        ctx.text(StatusCode::CREATED, "first");
        ctx.status(StatusCode::ACCEPTED);
        assert!(ctx.has_response());

        let response = ctx.take_response().unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(ctx.take_response().is_none());
    }
}
