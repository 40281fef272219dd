//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, tracing, timeout, body limit)
//!     → [routing layer picks the registered handler]
//!     → request.rs (Context: method, headers, body, request ID)
//!     → binder.rs (typed request, validation)
//!     → response.rs (error envelope) or the method's own response
//!     → Send to client
//! ```

pub mod binder;
pub mod request;
pub mod response;
pub mod server;

pub use binder::{bind, Bind, BindError, FieldViolation};
pub use request::{ApiContext, Context, X_REQUEST_ID};
pub use response::{error_response, ErrorBody, ErrorCode};
pub use server::HttpServer;
