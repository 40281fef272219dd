//! Route registration library
//!
//! Registers the methods of plain Rust objects as axum routes. Paths and
//! verbs come from a route manifest or `@Router` doc annotations, falling
//! back to `/Object.method`; request shapes are bound and validated before
//! a method runs.

pub mod config;
pub mod demo;
pub mod docs;
pub mod http;
pub mod observability;
pub mod routing;
pub mod scrape;

pub use config::schema::AppConfig;
pub use http::{ApiContext, Context, HttpServer};
pub use routing::{MethodTable, Registrar, RegistrarOptions, Registry, Routable};
