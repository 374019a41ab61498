use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use linkcard_cards::{CardError, CardResponse};

pub type AppSuccess = GenericResponse;

/// The `{status, message, data}` envelope. Its `status` field doubles as the
/// HTTP status code of the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericResponse {
    pub status: u16,
    pub message: String,
    pub data: serde_json::Value,
}

impl GenericResponse {
    pub fn new(status: StatusCode, message: &str, data: serde_json::Value) -> Self {
        Self {
            status: status.as_u16(),
            message: message.to_string(),
            data,
        }
    }
}

impl From<CardResponse> for GenericResponse {
    fn from(response: CardResponse) -> Self {
        Self {
            status: response.status,
            message: response.message,
            data: response.data,
        }
    }
}

impl From<CardError> for GenericResponse {
    fn from(error: CardError) -> Self {
        if error.status() >= 500 {
            tracing::error!("CODE: {}, ERROR: {:?}", error.status(), error);
        }
        error.to_response().into()
    }
}

impl IntoResponse for GenericResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json::from(self)).into_response()
    }
}

// Make our own error that wraps `anyhow::Error`.
#[derive(Debug)]
pub struct AppError(pub StatusCode, pub anyhow::Error);
impl AppError {
    pub fn new(status: StatusCode, err: anyhow::Error) -> Self {
        Self(status, err)
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("CODE: {}, MESSAGE: {}", self.0.as_u16(), self.1);
        GenericResponse::new(self.0, &self.1.to_string(), json!({})).into_response()
    }
}

// This enables using `?` on functions that return `Result<_, anyhow::Error>` to turn them into
// `Result<_, AppError>`. That way you don't need to do that manually.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(StatusCode::BAD_REQUEST, err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkcard_cards::FieldErrors;

    #[test]
    fn card_response_maps_field_by_field() {
        let response: GenericResponse =
            CardResponse::created("card created", json!({ "x": 1 })).into();
        assert_eq!(response.status, 201);
        assert_eq!(response.message, "card created");
        assert_eq!(response.data["x"], 1);
    }

    #[test]
    fn card_error_keeps_its_status_and_body() {
        let mut errors = FieldErrors::new();
        errors.insert("name".to_string(), "name is required".to_string());
        let response: GenericResponse = CardError::Validation(errors).into();
        assert_eq!(response.status, 422);
        assert_eq!(response.data["errors"]["name"], "name is required");
    }
}
