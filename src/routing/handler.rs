//! Handler synthesis.
//!
//! # Data Flow
//! ```text
//! MethodEntry (signature + typed call) + receiver + custom context
//!     → classify, pick ContextProvider           (once, at set-up)
//!     → RouteHandler: Context → Response         (per request)
//!         adapt context → bind request → call → Outcome → Response
//! ```
//!
//! # Design Decisions
//! - Set-up mistakes (unknown context type, unsupported return arity) panic
//!   with the method name; they cannot be recovered from at request time
//! - Handlers share only `Arc` receivers and immutable captures, so they are
//!   safe to call concurrently
//! - Binding failures never reach the method

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, MethodRouter},
    Json,
};
use http_body_util::LengthLimitError;
use serde::Serialize;

use crate::http::binder::BindError;
use crate::http::request::{tag_request_id, Context};
use crate::http::response::{error_response, ErrorBody, ErrorCode};
use crate::routing::method::MethodEntry;
use crate::routing::provider::{ContextProvider, CustomContext};
use crate::routing::route::Verb;
use crate::routing::signature::{classify, CallConvention, ContextKind, TypeInfo};

/// What one method invocation produced.
pub enum Outcome {
    /// The method wrote its own response, or none.
    Written(Option<Response>),
    /// `Ok` of a `(result, error)` method, already serialized.
    Success(Response),
    /// `Err` of a `(result, error)` method.
    Failed(String),
    /// The request could not be bound; the method was not called.
    Rejected(BindError),
    /// The adapted context was not of the declared type.
    Misrouted(&'static str),
}

/// Type-erased invocation of one method on a receiver.
pub type ErasedCall<T> = Arc<dyn Fn(&T, Box<dyn Any + Send>) -> Outcome + Send + Sync>;

/// Return shapes a routed method may have: nothing, or `Result<V, E>`.
pub trait MethodReturn: 'static {
    fn returns() -> Vec<TypeInfo>;
    fn into_outcome(self, ctx: &mut Context) -> Outcome;
}

impl MethodReturn for () {
    fn returns() -> Vec<TypeInfo> {
        Vec::new()
    }

    fn into_outcome(self, ctx: &mut Context) -> Outcome {
        Outcome::Written(ctx.take_response())
    }
}

impl<V, E> MethodReturn for Result<V, E>
where
    V: Serialize + 'static,
    E: fmt::Display + 'static,
{
    fn returns() -> Vec<TypeInfo> {
        vec![TypeInfo::of::<V>(), TypeInfo::of::<E>()]
    }

    fn into_outcome(self, _ctx: &mut Context) -> Outcome {
        match self {
            Ok(value) => Outcome::Success((StatusCode::OK, Json(value)).into_response()),
            Err(err) => Outcome::Failed(err.to_string()),
        }
    }
}

/// A request handler bound to one method and one receiver.
#[derive(Clone)]
pub struct RouteHandler {
    name: Arc<str>,
    inner: Arc<dyn Fn(Context) -> Response + Send + Sync>,
}

impl RouteHandler {
    /// `object.method` this handler dispatches to.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, ctx: Context) -> Response {
        (self.inner)(ctx)
    }

    /// Add this handler to `router` for `verb`. `ANY` is exclusive on its path.
    pub(crate) fn attach(&self, router: MethodRouter, verb: Verb, body_limit: usize) -> MethodRouter {
        let handler = self.clone();
        let endpoint = move |request: Request<Body>| async move {
            match Context::from_request(request, body_limit).await {
                Ok(ctx) => handler.call(ctx),
                Err(err) if exceeds_limit(&err) => (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    Json(ErrorBody::new(
                        ErrorCode::ParameterInvalid,
                        format!("req param : body exceeds {body_limit} bytes"),
                    )),
                )
                    .into_response(),
                Err(err) => error_response(ErrorCode::ParameterInvalid, format!("req param : {err}")),
            }
        };

        match verb.filter() {
            Some(filter) => router.on(filter, endpoint),
            None => any(endpoint),
        }
    }
}

/// Whether reading the body failed on the length limit.
fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHandler").field("name", &self.name).finish()
    }
}

/// Build the handler for `entry` on `receiver`.
///
/// # Panics
///
/// When the first parameter is neither [`Context`] nor the registered custom
/// context, when the parameter count is not 1 or 2, or when a method taking a
/// request returns something other than nothing or `(result, error)`.
pub fn synthesize<T>(
    object: &str,
    entry: &MethodEntry<T>,
    receiver: Arc<T>,
    custom: Option<&CustomContext>,
) -> RouteHandler
where
    T: Send + Sync + 'static,
{
    let qualified = format!("{object}.{}", entry.name());
    let signature = entry.signature();
    let classification = classify(signature, custom.map(CustomContext::type_id));

    let provider = match (classification.context, custom) {
        (Some(ContextKind::Raw), _) => ContextProvider::Identity,
        (Some(ContextKind::Custom), Some(custom)) => ContextProvider::CustomWrap(custom.clone()),
        _ => panic!(
            "method {qualified} not support: first parameter {} is neither Context nor the registered custom context",
            signature.first_param().map(TypeInfo::name).unwrap_or("<none>")
        ),
    };

    let Some(convention) = classification.convention() else {
        panic!(
            "method {qualified} not support: takes {} parameters, expected (ctx) or (ctx, request)",
            classification.arity
        );
    };

    if convention == CallConvention::ContextAndRequest && !matches!(signature.returns.len(), 0 | 2) {
        panic!(
            "method {qualified}: only 2 return values (result, error) are supported, found {}",
            signature.returns.len()
        );
    }

    let call = Arc::clone(entry.call());
    let name: Arc<str> = Arc::from(qualified);
    let label = Arc::clone(&name);

    let inner = move |ctx: Context| -> Response {
        let request_id = ctx.request_id().to_owned();
        let mut response = match call(&receiver, provider.adapt(ctx)) {
            Outcome::Written(response) => response.unwrap_or_else(|| StatusCode::OK.into_response()),
            Outcome::Success(response) => response,
            Outcome::Failed(message) => {
                tracing::debug!(method = %label, request_id = %request_id, error = %message, "Method returned an error");
                error_response(ErrorCode::InvalidOp, message)
            }
            Outcome::Rejected(err) => {
                tracing::debug!(method = %label, request_id = %request_id, error = %err, "Request rejected");
                error_response(ErrorCode::ParameterInvalid, err.render())
            }
            Outcome::Misrouted(expected) => {
                tracing::error!(method = %label, request_id = %request_id, expected, "Context type mismatch");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
        tag_request_id(&mut response, &request_id);
        response
    };

    RouteHandler {
        name,
        inner: Arc::new(inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::ApiContext;
    use crate::routing::signature::MethodSignature;
    use axum::body::Bytes;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use validator::Validate;

    #[derive(Default)]
    struct Greeter {
        calls: AtomicUsize,
    }

    #[derive(Deserialize, Validate)]
    struct Greet {
        #[validate(length(min = 1))]
        name: String,
    }

    #[derive(Serialize)]
    struct Greeting {
        text: String,
    }

    struct Shouting {
        inner: Context,
    }

    impl ApiContext for Shouting {
        fn context(&mut self) -> &mut Context {
            &mut self.inner
        }
    }

    impl Greeter {
        fn ping(&self, ctx: &mut Context) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ctx.text(StatusCode::ACCEPTED, "pong");
        }

        fn greet(&self, _ctx: &mut Context, req: Greet) -> Result<Greeting, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if req.name == "nobody" {
                return Err("nobody to greet".into());
            }
            Ok(Greeting {
                text: format!("hello {}", req.name),
            })
        }

        fn shout(&self, ctx: &mut Shouting) {
            ctx.context().text(StatusCode::OK, "HEY");
        }
    }

    fn post(body: &'static str) -> Context {
        Context::from(
            Request::builder()
                .method("POST")
                .header("content-type", "application/json")
                .header("x-request-id", "req-1")
                .body(Bytes::from_static(body.as_bytes()))
                .unwrap(),
        )
    }

    async fn body_of(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap()
    }

    #[tokio::test]
    async fn test_context_only_returns_what_the_method_wrote() {
        let greeter = Arc::new(Greeter::default());
        let entry = MethodEntry::from_fn("ping", Greeter::ping);
        let handler = synthesize("Greeter", &entry, Arc::clone(&greeter), None);
        assert_eq!(handler.name(), "Greeter.ping");

        let response = handler.call(post(""));
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()["x-request-id"], "req-1");
        assert_eq!(body_of(response).await.as_ref(), b"pong");
        assert_eq!(greeter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_result_success_and_failure() {
        let greeter = Arc::new(Greeter::default());
        let entry = MethodEntry::from_fn("greet", Greeter::greet);
        let handler = synthesize("Greeter", &entry, greeter, None);

        let ok = handler.call(post(r#"{"name":"ann"}"#));
        assert_eq!(ok.status(), StatusCode::OK);
        let value: serde_json::Value = serde_json::from_slice(&body_of(ok).await).unwrap();
        assert_eq!(value, serde_json::json!({ "text": "hello ann" }));

        let failed = handler.call(post(r#"{"name":"nobody"}"#));
        assert_eq!(failed.status(), StatusCode::BAD_REQUEST);
        let envelope: ErrorBody = serde_json::from_slice(&body_of(failed).await).unwrap();
        assert_eq!(envelope.code, ErrorCode::InvalidOp.code());
        assert_eq!(envelope.error, "nobody to greet");
    }

    #[tokio::test]
    async fn test_rejected_request_never_calls_method() {
        let greeter = Arc::new(Greeter::default());
        let entry = MethodEntry::from_fn("greet", Greeter::greet);
        let handler = synthesize("Greeter", &entry, Arc::clone(&greeter), None);

        let response = handler.call(post(r#"{"name":""}"#));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let envelope: ErrorBody = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(envelope.code, ErrorCode::ParameterInvalid.code());
        assert!(envelope.error.starts_with("req param : name:length"));
        assert_eq!(greeter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_custom_context_is_wrapped() {
        let custom = CustomContext::new(|inner: Context| Shouting { inner });
        let entry = MethodEntry::from_fn("shout", Greeter::shout);
        let handler = synthesize("Greeter", &entry, Arc::new(Greeter::default()), Some(&custom));

        let response = handler.call(post(""));
        assert_eq!(body_of(response).await.as_ref(), b"HEY");
    }

    #[test]
    #[should_panic(expected = "first parameter")]
    fn test_unregistered_custom_context_panics() {
        let entry = MethodEntry::from_fn("shout", Greeter::shout);
        synthesize("Greeter", &entry, Arc::new(Greeter::default()), None);
    }

    #[test]
    #[should_panic(expected = "only 2 return values")]
    fn test_single_return_value_panics() {
        let signature = MethodSignature::new(
            true,
            vec![
                TypeInfo::of::<Greeter>(),
                TypeInfo::of::<Context>(),
                TypeInfo::of::<Greet>(),
            ],
            vec![TypeInfo::of::<Greeting>()],
        );
        let call: ErasedCall<Greeter> = Arc::new(|_: &Greeter, _: Box<dyn Any + Send>| Outcome::Written(None));
        let entry = MethodEntry::new("odd", signature, call);
        synthesize("Greeter", &entry, Arc::new(Greeter::default()), None);
    }

    async fn attached(limit: usize, body: &'static str) -> Response {
        use tower::ServiceExt;

        let greeter = Arc::new(Greeter::default());
        let entry = MethodEntry::from_fn("ping", Greeter::ping);
        let handler = synthesize("Greeter", &entry, greeter, None);
        let router = axum::Router::new().route("/ping", handler.attach(MethodRouter::new(), Verb::Post, limit));

        router
            .oneshot(Request::post("/ping").body(Body::from(body)).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_oversized_body_is_payload_too_large() {
        let response = attached(4, "far too long").await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let envelope: ErrorBody = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(envelope.code, ErrorCode::ParameterInvalid.code());
        assert_eq!(envelope.error, "req param : body exceeds 4 bytes");

        let response = attached(64, "fits").await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
