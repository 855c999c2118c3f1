use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid stored document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Schedule conflict: {0}")]
    ScheduleConflict(String),

    #[error("Student {student_id} is already enrolled in offering {offering_id}")]
    DuplicateEnrollment {
        student_id: String,
        offering_id: String,
    },

    #[error("Offering {offering_id} is full ({max_students} students)")]
    CapacityExceeded {
        offering_id: String,
        max_students: i64,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transaction aborted: {0}")]
    TransactionAbort(String),

    #[error("Version copy failed after committing phases {completed_phases:?}: {message}")]
    PartialClone {
        completed_phases: Vec<&'static str>,
        message: String,
    },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            AppError::ScheduleConflict(_)
            | AppError::DuplicateEnrollment { .. }
            | AppError::CapacityExceeded { .. }
            | AppError::Conflict(_)
            | AppError::TransactionAbort(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::PartialClone { .. } => {
                error!("partial clone: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Database(ref e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Serialization(ref e) => {
                error!("stored document decode error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Stored document could not be decoded".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}
