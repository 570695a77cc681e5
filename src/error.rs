//! Error type shared by every handler.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::validation::FieldError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("email already registered")]
    Conflict,

    #[error("account not found")]
    AccountNotFound,

    #[error("invalid credential")]
    InvalidCredential,

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct MessageBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorsBody {
    errors: Vec<FieldError>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::Conflict
            | Self::AccountNotFound
            | Self::InvalidCredential => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn field_errors(self) -> Option<Vec<FieldError>> {
        match self {
            Self::Validation(errors) => Some(errors),
            Self::Conflict => Some(vec![FieldError::new("email", "Email already registered")]),
            Self::AccountNotFound => Some(vec![FieldError::new(
                "email",
                "Account not found please register",
            )]),
            Self::InvalidCredential => Some(vec![FieldError::new("password", "Invalid password")]),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            Self::Unauthorized(msg) | Self::NotFound(msg) => msg.to_string(),
            Self::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
                "Server error".to_string()
            }
            _ => String::new(),
        };

        match self.field_errors() {
            Some(errors) => (status, Json(ErrorsBody { errors })).into_response(),
            None => (status, Json(MessageBody { message })).into_response(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

pub type AppResult<T> = Result<T, AppError>;
