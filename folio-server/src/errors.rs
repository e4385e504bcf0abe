use std::fmt::{Display, Formatter};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crate::mail::MailError;
use folio_core::FolioError;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    ApiError(#[from] ApiError),

    #[error("{0}")]
    Folio(#[from] FolioError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mail delivery failed: {0}")]
    Mail(#[from] MailError),
}

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    InternalServerError(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalServerError(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            ApiError::InternalServerError(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::InternalServerError(message) => write!(f, "Status=500, InternalServerError: {}", message),
            ApiError::BadRequest(message) => write!(f, "Status=400, BadRequest: {}", message),
            ApiError::Unauthorized(message) => write!(f, "Status=401, Unauthorized: {}", message),
            ApiError::Forbidden(message) => write!(f, "Status=403, Forbidden: {}", message),
            ApiError::NotFound(message) => write!(f, "Status=404, NotFound: {}", message),
            ApiError::Conflict(message) => write!(f, "Status=409, Conflict: {}", message),
        }
    }
}

/// Domain errors that have a natural HTTP meaning. Everything else is a 500.
fn classify(error: &FolioError) -> Option<ApiError> {
    match error {
        FolioError::ArticleNotFound(_) => Some(ApiError::not_found("Article not found")),
        FolioError::UserNotFound(_) => Some(ApiError::not_found("User not found")),
        FolioError::EmailTaken(_) => Some(ApiError::conflict("Email already registered")),
        FolioError::TokenExpired => Some(ApiError::unauthorized("Token expired")),
        FolioError::InvalidToken(_) => Some(ApiError::unauthorized("Invalid token")),
        _ => None,
    }
}

fn api_response(e: ApiError) -> (StatusCode, String) {
    if matches!(e, ApiError::InternalServerError(_)) {
        error!("{}", e);
    } else {
        info!("{}", e);
    }
    e.status_and_message()
}

fn opaque_response(e: &dyn std::error::Error) -> (StatusCode, String) {
    error!(error = %e, "Unhandled server error");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        #[derive(serde::Serialize)]
        struct ErrorResponse {
            message: String,
        }

        let (status, message) = match self {
            ServerError::ApiError(e) => api_response(e),
            ServerError::Folio(e) => match classify(&e) {
                Some(api) => api_response(api),
                None => opaque_response(&e),
            },
            other => opaque_response(&other),
        };

        (status, axum::Json(ErrorResponse { message })).into_response()
    }
}
