use axum::response::{IntoResponse, Response};
use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;
use sqlx::Error as SqlxError;

use crate::plugins::communication::follows::error::FollowError;
use crate::plugins::communication::stories::error::StoryError;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: Option<String>,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub code: Option<String>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), code: None }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.message, code: self.code };
        (self.status, Json(body)).into_response()
    }
}

impl From<SqlxError> for AppError {
    fn from(e: SqlxError) -> Self {
        use sqlx::Error::*;
        match e {
            RowNotFound => AppError::new(StatusCode::NOT_FOUND, "notFound").with_code("not_found"),
            Database(db) => {
                match db.code().as_deref() {
                    // unique_violation
                    Some("23505") => AppError::new(StatusCode::CONFLICT, "duplicateKey").with_code("duplicate_key"),
                    // foreign_key_violation
                    Some("23503") => AppError::new(StatusCode::NOT_FOUND, "referencedRowMissing").with_code("not_found"),
                    _ => AppError::new(StatusCode::INTERNAL_SERVER_ERROR, db.message().to_string()),
                }
            }
            other => AppError::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

pub fn story_status(e: &StoryError) -> StatusCode {
    match e {
        StoryError::InvalidInput(_)
        | StoryError::InvalidOwner
        | StoryError::NoFilesProvided
        | StoryError::InvalidUpload(_)
        | StoryError::TypeMismatch { .. } => StatusCode::BAD_REQUEST,
        StoryError::NotFound => StatusCode::NOT_FOUND,
        StoryError::AccessDenied | StoryError::Unauthorized => StatusCode::FORBIDDEN,
        StoryError::StorageWrite(_) | StoryError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn follow_status(e: &FollowError) -> StatusCode {
    match e {
        FollowError::InvalidInput(_) | FollowError::SelfFollow => StatusCode::BAD_REQUEST,
        FollowError::UnknownTarget => StatusCode::NOT_FOUND,
        FollowError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
