//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registrar, handlers, scraper, server:
//!     → tracing events with structured fields
//!     → logging.rs (EnvFilter + fmt layer, pretty or JSON)
//!     → stdout
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID is echoed on every response and logged on failures
//! - `RUST_LOG` overrides the configured level

pub mod logging;
