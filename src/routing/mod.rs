//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Set-up (once, single-threaded):
//!     Routable::methods → MethodTable
//!     → signature.rs (classify, skip non-routable)
//!     → route.rs RouteSource | namer.rs defaults
//!     → handler.rs (synthesize RouteHandler, pick ContextProvider)
//!     → registrar.rs (route table, Registry) → axum::Router
//!
//! Per request (concurrent):
//!     axum → Context → ContextProvider::adapt → bind → method → Response
//! ```
//!
//! # Design Decisions
//! - Type inspection happens only at set-up; handlers never branch on types
//! - Methods that do not match a call convention are ordinary helpers
//! - Registry is an explicit object owned by the registrar, never global

pub mod handler;
pub mod method;
pub mod namer;
pub mod provider;
pub mod registrar;
pub mod registry;
pub mod route;
pub mod signature;

pub use handler::{synthesize, MethodReturn, RouteHandler};
pub use method::{IntoMethod, MethodEntry, MethodTable, Routable};
pub use namer::NamingCase;
pub use provider::{ContextProvider, CustomContext};
pub use registrar::{RegisterError, Registrar, RegistrarOptions};
pub use registry::{DuplicatePolicy, RegistrationRecord, Registry};
pub use route::{RouteSource, RouteSpec, Verb};
pub use signature::{CallConvention, MethodSignature, TypeInfo};
