//! Mapping core errors onto HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hearlearn_core::{DocumentId, HearLearnError, IngestError, ValidationError};
use serde::Serialize;

/// A failed request: status code plus a message for the client
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<HearLearnError> for ApiError {
    fn from(err: HearLearnError) -> Self {
        let status = match &err {
            HearLearnError::Validation(ValidationError::DocumentNotFound(_)) => StatusCode::NOT_FOUND,
            HearLearnError::Validation(_) => StatusCode::BAD_REQUEST,
            HearLearnError::Ingest(IngestError::NotRetryable { .. }) => StatusCode::CONFLICT,
            HearLearnError::Ingest(_) => StatusCode::BAD_GATEWAY,
            HearLearnError::Storage(_) | HearLearnError::Io(_) | HearLearnError::Speech(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %err, "Request failed");
        }

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        HearLearnError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// Parse a document id taken from the request path
pub fn parse_id(raw: &str) -> Result<DocumentId, ApiError> {
    Ok(DocumentId::parse(raw)?)
}
