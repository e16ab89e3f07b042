use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use super::eligibility::IneligibilityReason;
use super::identifiers::InvalidIdentifier;
use super::reports::ExportError;
use crate::store::StoreError;

/// Errors surfaced to callers of the engine.
///
/// Data-quality gaps never appear here: unresolved references are logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("student is not eligible: {}", .0.summary())]
    Ineligible(IneligibilityReason),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Persistence(#[from] StoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl PlacementError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PlacementError::Validation(_) => StatusCode::BAD_REQUEST,
            PlacementError::NotFound { .. } => StatusCode::NOT_FOUND,
            PlacementError::Ineligible(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PlacementError::Conflict(_) => StatusCode::CONFLICT,
            PlacementError::Persistence(_) | PlacementError::Export(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<InvalidIdentifier> for PlacementError {
    fn from(value: InvalidIdentifier) -> Self {
        Self::Validation(value.to_string())
    }
}

impl IntoResponse for PlacementError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "placement request failed");
        }

        let body = match &self {
            PlacementError::Ineligible(reason) => json!({
                "error": self.to_string(),
                "reason": reason,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
