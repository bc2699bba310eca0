use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Uniform response body: `{success, message, code?, ...payload}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(flatten)]
    pub data: T,
    #[serde(skip)]
    pub status: StatusCode,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self { success: true, message: message.into(), code: None, data, status: StatusCode::OK }
    }

    pub fn failure(status: StatusCode, code: impl Into<String>, message: impl Into<String>, data: T) -> Self {
        Self { success: false, message: message.into(), code: Some(code.into()), data, status }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
