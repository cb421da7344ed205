// src/server/error.rs
//! Transport error mapping
//!
//! One error enum per response: data and model-selection problems are
//! the client's to fix (400), training and everything else internal is
//! ours (500). Bodies are always {"error": true, "message": ...}.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::dataset::PrepareError;
use crate::models::RunnerError;
use crate::service::CompareError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Prepare(#[from] PrepareError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CompareError> for ServerError {
    fn from(err: CompareError) -> Self {
        match err {
            CompareError::Prepare(e) => ServerError::Prepare(e),
            CompareError::Runner(e) => ServerError::Runner(e),
        }
    }
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) | ServerError::Prepare(_) => StatusCode::BAD_REQUEST,
            ServerError::Runner(err) => match err {
                RunnerError::UnknownModel { .. } | RunnerError::MissingDependency { .. } => {
                    StatusCode::BAD_REQUEST
                }
                RunnerError::Training { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(%message, "request failed");
        }
        let body = Json(json!({
            "error": true,
            "message": message,
        }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
