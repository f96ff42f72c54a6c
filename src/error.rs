//! Client-facing error taxonomy.
//!
//! Every variant maps to one fixed status code. Internal details are logged,
//! never sent back.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::database::DatabaseError;
use crate::here::UpstreamError;
use crate::poi::ResolveError;

/// Body of every error response: `{"Error": "..."}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    #[serde(rename = "Error")]
    pub error: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or wrong `token` query parameter
    #[error("Invalid Token")]
    InvalidToken,

    /// HERE call failed (network, status or body)
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] UpstreamError),

    /// Missing parameter or unparseable JSON body
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Route destination is neither coordinates nor a known name
    #[error("Invalid Point of Interest name")]
    UnknownPointOfInterest,

    /// Cache store failure
    #[error("Store error: {0}")]
    Store(#[from] DatabaseError),
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::UnknownPointOfInterest(_) => AppError::UnknownPointOfInterest,
            ResolveError::Store(e) => AppError::Store(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidToken => (StatusCode::FORBIDDEN, "Invalid Token".to_string()),
            AppError::Upstream(e) => {
                tracing::error!("Upstream mapping service failed: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    "Upstream mapping service request failed".to_string(),
                )
            }
            AppError::MalformedRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::UnknownPointOfInterest => (
                StatusCode::BAD_REQUEST,
                "Invalid Point of Interest name".to_string(),
            ),
            AppError::Store(e) => {
                tracing::error!("Cache store failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
