//! Unified application error model and mapping helpers.
//! Every handler, the auth gate and the document store report failures through
//! `AppError`; the HTTP layer turns them into a status code plus a
//! `{code, message}` JSON body.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// No `Authorization` header on a route that requires one.
    #[error("{code}: {message}")]
    MissingCredential { code: String, message: String },
    /// Token malformed, expired, or signed with another secret.
    #[error("{code}: {message}")]
    InvalidCredential { code: String, message: String },
    /// An authorization check ran without a verified identity.
    #[error("{code}: {message}")]
    Unauthenticated { code: String, message: String },
    #[error("{code}: {message}")]
    Forbidden { code: String, message: String },
    /// Missing or malformed record identifier.
    #[error("{code}: {message}")]
    InvalidKey { code: String, message: String },
    #[error("{code}: {message}")]
    UserInput { code: String, message: String },
    /// The document store could not be reached or could not persist.
    #[error("{code}: {message}")]
    Unavailable { code: String, message: String },
    #[error("{code}: {message}")]
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::MissingCredential { code, .. }
            | AppError::InvalidCredential { code, .. }
            | AppError::Unauthenticated { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::InvalidKey { code, .. }
            | AppError::UserInput { code, .. }
            | AppError::Unavailable { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::MissingCredential { message, .. }
            | AppError::InvalidCredential { message, .. }
            | AppError::Unauthenticated { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::InvalidKey { message, .. }
            | AppError::UserInput { message, .. }
            | AppError::Unavailable { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn missing_credential() -> Self {
        AppError::MissingCredential { code: "missing_credential".into(), message: "unauthorized access".into() }
    }
    pub fn invalid_credential() -> Self {
        AppError::InvalidCredential { code: "invalid_credential".into(), message: "Forbidden access".into() }
    }
    pub fn unauthenticated() -> Self {
        AppError::Unauthenticated { code: "unauthenticated".into(), message: "unauthorized access".into() }
    }
    pub fn forbidden() -> Self {
        AppError::Forbidden { code: "forbidden".into(), message: "forbidden access".into() }
    }
    pub fn forbidden_with<S: Into<String>>(code: S, msg: S) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn invalid_key<S: Into<String>>(msg: S) -> Self { AppError::InvalidKey { code: "invalid_key".into(), message: msg.into() } }
    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn unavailable<S: Into<String>>(msg: S) -> Self { AppError::Unavailable { code: "unavailable".into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::MissingCredential { .. } => 401,
            AppError::InvalidCredential { .. } => 403,
            AppError::Unauthenticated { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::InvalidKey { .. } => 400,
            AppError::UserInput { .. } => 400,
            AppError::Unavailable { .. } => 500,
            AppError::Internal { .. } => 500,
        }
    }

    /// Message exposed to clients. Store failures are reported generically.
    fn public_message(&self) -> &str {
        match self {
            AppError::Unavailable { .. } => "Error updating document",
            AppError::Internal { .. } => "internal server error",
            _ => self.message(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self { AppError::unavailable(err.to_string()) }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self { AppError::internal("serialization_error".to_string(), err.to_string()) }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self { AppError::user("invalid_body".to_string(), rejection.body_text()) }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(code = self.code_str(), "request failed: {}", self.message());
        }
        let body = serde_json::json!({ "code": self.code_str(), "message": self.public_message() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
