pub mod admin;
pub mod appointments;
pub mod availability;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, ExistingBooking};

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

/// Standard error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_appointment: Option<ExistingBooking>,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            kind: None,
            existing_appointment: None,
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = match &self {
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::Unavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::Conflict(_) | BookingError::ActiveBooking(_) => StatusCode::CONFLICT,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Storage(e) => {
                tracing::error!("Storage error: {:#}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Internal server error".to_string(),
                        kind: Some(self.kind().to_string()),
                        existing_appointment: None,
                    }),
                )
                    .into_response();
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            kind: Some(self.kind().to_string()),
            existing_appointment: match self {
                BookingError::ActiveBooking(existing) => Some(existing),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}
