//! Response envelope for failed requests.
//!
//! # Responsibilities
//! - Fixed error code table shared by all synthesized handlers
//! - Map binding failures and method errors to a `400` JSON envelope
//!
//! # Design Decisions
//! - Successful results are written as raw JSON, never wrapped
//! - Failures always carry `state: false`, a numeric code and the message

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes written into the failure envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The request could not be bound or failed validation.
    ParameterInvalid,
    /// The routed method returned an error.
    InvalidOp,
}

impl ErrorCode {
    pub fn code(self) -> u32 {
        match self {
            ErrorCode::ParameterInvalid => 1001,
            ErrorCode::InvalidOp => 1002,
        }
    }
}

/// JSON body of every failure response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub state: bool,
    pub code: u32,
    pub error: String,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            state: false,
            code: code.code(),
            error: error.into(),
        }
    }
}

impl IntoResponse for ErrorBody {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

/// Build the `400` failure response for `code`.
pub fn error_response(code: ErrorCode, error: impl Into<String>) -> Response {
    ErrorBody::new(code, error).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_error_response_envelope() {
        let response = error_response(ErrorCode::InvalidOp, "user not found");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            ErrorBody {
                state: false,
                code: 1002,
                error: "user not found".into(),
            }
        );
    }
}
