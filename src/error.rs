use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::config::{AppConfig, Env};

/// AppError
///
/// The single failure type every handler, repository and service returns.
/// Operational variants are expected, user-facing outcomes and carry the message that is
/// sent to the caller. `Unexpected` covers infrastructure faults: the detail is logged and
/// only ever leaves the process in development mode (see `expose_error_detail`).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    CapacityExceeded(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(detail: impl std::fmt::Display) -> Self {
        Self::Unexpected(detail.to_string())
    }

    /// Maps the variant onto its HTTP status. This is the only place the taxonomy meets HTTP.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            // Duplicate email / name is reported as a plain bad request, matching the public API.
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::CapacityExceeded(_) => StatusCode::BAD_REQUEST,
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_operational(&self) -> bool {
        !matches!(self, AppError::Unexpected(_))
    }
}

/// UnexpectedDetail
///
/// Response extension carrying the internal detail of a 500. The body itself never
/// contains it; `expose_error_detail` decides whether it gets attached.
#[derive(Debug, Clone)]
pub struct UnexpectedDetail(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            AppError::Unexpected(detail) => {
                tracing::error!(error = %detail, "unexpected error while handling request");
                let mut response = (
                    status,
                    Json(json!({ "success": false, "message": "Something went wrong" })),
                )
                    .into_response();
                response.extensions_mut().insert(UnexpectedDetail(detail));
                response
            }
            operational => {
                (status, Json(json!({ "success": false, "message": operational.to_string() })))
                    .into_response()
            }
        }
    }
}

/// expose_error_detail
///
/// Boundary middleware. In development it rewrites generic 500 bodies to include the
/// logged detail under `error`; in every other environment it leaves them untouched.
pub async fn expose_error_detail(
    State(config): State<AppConfig>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if config.env != Env::Development {
        return response;
    }

    match response.extensions().get::<UnexpectedDetail>().cloned() {
        Some(UnexpectedDetail(detail)) => (
            response.status(),
            Json(json!({
                "success": false,
                "message": "Something went wrong",
                "error": detail,
            })),
        )
            .into_response(),
        None => response,
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique constraint");
                return AppError::Conflict(format!("Duplicate value violates {}", constraint));
            }
        }
        AppError::Unexpected(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Unexpected(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Unexpected(format!("password hashing failed: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join(", "))
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::Validation(format!("Invalid multipart body: {}", err.body_text()))
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}
