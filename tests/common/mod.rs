//! Shared controllers and helpers for integration testing.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use validator::Validate;

use autoroute::http::ErrorBody;
use autoroute::routing::{RegistrarOptions, Registry};
use autoroute::{Context, MethodTable, Registrar, Routable};

/// Controller counting every invocation that reaches a method body.
#[derive(Debug, Default)]
pub struct User {
    pub calls: AtomicUsize,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Signup {
    pub user_name: String,
    #[validate(length(min = 6))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct Lookup {
    #[validate(range(min = 1))]
    pub id: u64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: u64,
    pub user_name: String,
}

impl User {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn whoami(&self, ctx: &mut Context) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let request_id = ctx.request_id().to_string();
        ctx.text(StatusCode::ACCEPTED, format!("user for {request_id}"));
    }

    pub fn signup(&self, _ctx: &mut Context, req: Signup) -> Result<Profile, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if req.user_name == "root" {
            return Err("user name root is reserved".to_string());
        }
        Ok(Profile {
            id: 7,
            user_name: req.user_name,
        })
    }

    pub fn get(&self, _ctx: &mut Context, req: Lookup) -> Result<Profile, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Profile {
            id: req.id,
            user_name: format!("user{}", req.id),
        })
    }

    /// Binds a request but writes nothing.
    pub fn touch(&self, _ctx: &mut Context, _req: Lookup) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Routable for User {
    fn methods(table: &mut MethodTable<Self>) {
        autoroute::methods!(table; whoami, signup, get, touch);
    }
}

pub fn options(group: &str) -> RegistrarOptions {
    RegistrarOptions {
        group: group.to_string(),
        ..RegistrarOptions::default()
    }
}

pub fn registrar(group: &str) -> Registrar {
    Registrar::new(options(group), Registry::new())
}

pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send one request through `router` and buffer the response.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body)
}

pub fn error_body(body: &[u8]) -> ErrorBody {
    serde_json::from_slice(body).unwrap()
}
