//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the registered routes with middleware (tracing, timeout, body limit)
//! - Answer unmatched paths with a JSON 404
//! - Bind server to listener
//! - Graceful shutdown on Ctrl+C

use std::future::Future;
use std::time::Duration;

use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;

/// HTTP server for registered routes.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving `routes`.
    pub fn new(routes: Router, config: ServerConfig) -> Self {
        let router = Self::build_router(routes, &config);
        Self { router, config }
    }

    /// Add middleware layers to the registered routes.
    #[allow(deprecated)]
    fn build_router(routes: Router, config: &ServerConfig) -> Router {
        routes
            .fallback(not_found)
            .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Run the server until `signal` resolves.
    pub async fn run_until<F>(self, listener: TcpListener, signal: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "state": false, "error": format!("no route for {}", uri.path()) })),
    )
        .into_response()
}

/// Resolves on Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use tower::ServiceExt;

    fn server(limit: usize) -> HttpServer {
        let routes = Router::new().route("/echo", post(|body: String| async move { body }));
        HttpServer::new(
            routes,
            ServerConfig {
                body_limit_bytes: limit,
                ..ServerConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_unmatched_path_is_json_404() {
        let response = server(1024)
            .router()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_body_limit_applies() {
        let response = server(4)
            .router()
            .oneshot(
                Request::post("/echo")
                    .header("content-length", "8")
                    .body(Body::from("too long"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
