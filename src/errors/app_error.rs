use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::core::streaming::StreamingError;
use crate::core::synthesis::{ErrorKind, SynthesisError};

/// Application error type
///
/// Carries the stable [`ErrorKind`] of the failure so HTTP clients can
/// branch on `kind` the same way streaming clients do.
#[derive(Debug)]
pub enum AppError {
    InternalServerError(String),
    BadRequest(String),
    NotFound(String),
    /// A synthesis failure with its kind preserved
    Synthesis { kind: ErrorKind, message: String },
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Synthesis { kind, .. } => match kind {
                ErrorKind::Validation | ErrorKind::Handshake => StatusCode::BAD_REQUEST,
                ErrorKind::Provider => StatusCode::BAD_GATEWAY,
                ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ErrorKind::SessionBusy => StatusCode::CONFLICT,
                ErrorKind::Cache => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn kind_str(&self) -> &'static str {
        match self {
            AppError::InternalServerError(_) => "internal",
            AppError::BadRequest(_) => ErrorKind::Validation.as_str(),
            AppError::NotFound(_) => "not_found",
            AppError::Synthesis { kind, .. } => kind.as_str(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind_str();

        let error_message = match &self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                msg.clone()
            }
            AppError::NotFound(msg) => {
                tracing::warn!("Not found: {}", msg);
                msg.clone()
            }
            AppError::Synthesis { kind, message } => {
                if status.is_server_error() {
                    tracing::error!("Synthesis failed ({}): {}", kind, message);
                } else {
                    tracing::warn!("Synthesis rejected ({}): {}", kind, message);
                }
                message.clone()
            }
        };

        let body = Json(json!({
            "error": error_message,
            "kind": kind,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InternalServerError(msg) => write!(f, "Internal server error: {msg}"),
            AppError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            AppError::NotFound(msg) => write!(f, "Not found: {msg}"),
            AppError::Synthesis { kind, message } => write!(f, "{kind}: {message}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<SynthesisError> for AppError {
    fn from(err: SynthesisError) -> Self {
        AppError::Synthesis {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<StreamingError> for AppError {
    fn from(err: StreamingError) -> Self {
        match err {
            StreamingError::NotFound(_) => AppError::NotFound(err.to_string()),
            other => AppError::Synthesis {
                kind: other.kind(),
                message: other.to_string(),
            },
        }
    }
}

impl From<Box<dyn std::error::Error>> for AppError {
    fn from(err: Box<dyn std::error::Error>) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::TTSError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (SynthesisError::Validation("empty".into()), StatusCode::BAD_REQUEST),
            (
                SynthesisError::Provider(TTSError::ProviderError("boom".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                SynthesisError::Timeout {
                    elapsed_ms: 2001,
                    budget_ms: 2000,
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];

        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_streaming_not_found_maps_to_404() {
        let err = AppError::from(StreamingError::NotFound("abc".into()));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let busy = AppError::from(StreamingError::SessionBusy("abc".into()));
        assert_eq!(busy.kind_str(), "session_busy");
    }
}
