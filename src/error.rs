use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde_json::json;

/// Unified error type for API responses.
///
/// Domain errors render as `{"error": "..."}` with 403, matching the
/// original form-validation behavior; `NotFound` is 404, `Db`/`Internal`
/// are 500, and `Unauthorized` redirects to the login page instead of
/// erroring.
#[derive(Debug)]
pub enum AppError {
    InvalidSymbol,
    InvalidShareCount,
    InsufficientFunds,
    InsufficientShares,
    UsernameTaken,
    PasswordPolicy(&'static str),
    PasswordMismatch,
    InvalidCredentials,
    QuoteUnavailable(String),
    Unauthorized,
    NotFound,
    Db(String),
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSymbol => write!(f, "invalid symbol"),
            Self::InvalidShareCount => write!(f, "invalid number of shares"),
            Self::InsufficientFunds => write!(f, "can't afford"),
            Self::InsufficientShares => write!(f, "not enough shares"),
            Self::UsernameTaken => write!(f, "username already taken"),
            Self::PasswordPolicy(msg) => write!(f, "{msg}"),
            Self::PasswordMismatch => write!(f, "passwords do not match"),
            Self::InvalidCredentials => write!(f, "invalid username and/or password"),
            Self::QuoteUnavailable(msg) => write!(f, "quote provider unavailable: {msg}"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::NotFound => write!(f, "not found"),
            Self::Db(msg) => write!(f, "db_error: {msg}"),
            Self::Internal(msg) => write!(f, "internal_error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized => return Redirect::to("/login").into_response(),
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Db(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::FORBIDDEN,
        };

        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Db(e.to_string())
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        Self::Db(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.to_string())
    }
}
