use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures surfaced by the meal plan pipeline and its HTTP surface.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("recipe search unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("meal plan generation failed: {0}")]
    GenerationFailed(String),
    #[error("persistence failed: {0}")]
    Persistence(String),
    #[error("not found")]
    NotFound,
}

/// Body of every failed response: `{ "error": "..." }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::UpstreamUnavailable(_) | Self::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Message shown to the end user. Only validation errors echo their detail;
    /// everything else stays generic and the detail goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest(detail) => format!("Invalid input: {detail}"),
            Self::Authentication(_) => "Please sign in again.".into(),
            Self::UpstreamUnavailable(_) | Self::GenerationFailed(_) => {
                "An unexpected error occurred while generating your meal plan. Please try again."
                    .into()
            }
            Self::Persistence(_) => "Could not load or save your data. Please try again.".into(),
            Self::NotFound => "Not found".into(),
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        } else {
            tracing::warn!(error = %self, %status, "request rejected");
        }
        (status, Json(ErrorBody { error: self.user_message() })).into_response()
    }
}
