use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("{0}")]
    InvalidUrl(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("HTTP {status}: failed to fetch the webpage")]
    Upstream { status: u16 },
    #[error("{0}")]
    Request(String),
    #[error("browser session failed: {0}")]
    Browser(String),
}

impl ExtractionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExtractionError::InvalidUrl(_) | ExtractionError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ExtractionError::Upstream { .. }
            | ExtractionError::Request(_)
            | ExtractionError::Browser(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<&'static str> {
        match self {
            ExtractionError::InvalidUrl(_) | ExtractionError::InvalidRequest(_) => None,
            ExtractionError::Browser(_) => {
                Some("Failed to extract images using browser automation")
            }
            _ => Some("Failed to extract images from the provided URL"),
        }
    }
}

impl IntoResponse for ExtractionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "extraction failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details().map(str::to_string),
        };
        (status, Json(body)).into_response()
    }
}
