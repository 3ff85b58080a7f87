use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use folio_core::error::CoreError;
use folio_events::WebhookError;
use serde::Serialize;
use serde_json::json;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Application-level error type for HTTP handlers.
///
/// Domain failures arrive as [`CoreError`]; storage failures as raw
/// `sqlx::Error` so constraint violations can be reported precisely.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Logged in full, reported to the client as a generic message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(errors.to_string()))
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::EndpointNotFound(id) => AppError::Core(CoreError::NotFound {
                entity: "WebhookEndpoint",
                id,
            }),
            WebhookError::Database(e) => AppError::Database(e),
            other => AppError::InternalError(other.to_string()),
        }
    }
}

/// JSON body of every error response.
///
/// `details` is only present for lock conflicts, where the editor needs the
/// current holder to offer a takeover.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ErrorBody {
    fn new(code: &'static str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    fn internal() -> Self {
        Self::new("INTERNAL_ERROR", INTERNAL_MESSAGE)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Core(core) => describe_core(core),
            AppError::Database(err) => describe_sqlx(err),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
            }
        };
        (status, Json(body)).into_response()
    }
}

fn describe_core(err: &CoreError) -> (StatusCode, ErrorBody) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            ErrorBody::new("NOT_FOUND", format!("{entity} with id {id} not found")),
        ),
        CoreError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            ErrorBody::new("VALIDATION_ERROR", msg.as_str()),
        ),
        CoreError::Conflict(msg) => (
            StatusCode::CONFLICT,
            ErrorBody::new("CONFLICT", msg.as_str()),
        ),
        CoreError::LockConflict {
            post_id,
            holder_user_id,
            acquired_at,
            expires_at,
        } => {
            let mut body = ErrorBody::new("LOCK_CONFLICT", err.to_string());
            body.details = Some(json!({
                "post_id": post_id,
                "holder_user_id": holder_user_id,
                "acquired_at": acquired_at,
                "expires_at": expires_at,
            }));
            (StatusCode::CONFLICT, body)
        }
        CoreError::Unauthorized(msg) => (
            StatusCode::UNAUTHORIZED,
            ErrorBody::new("UNAUTHORIZED", msg.as_str()),
        ),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
        }
    }
}

/// Map a sqlx error onto an HTTP status and body.
///
/// Unique violations on `uq_`-prefixed constraints become 409, foreign-key
/// violations (a parent row deleted mid-request) become 404. Anything else
/// is a sanitized 500.
fn describe_sqlx(err: &sqlx::Error) -> (StatusCode, ErrorBody) {
    if let sqlx::Error::RowNotFound = err {
        return (
            StatusCode::NOT_FOUND,
            ErrorBody::new("NOT_FOUND", "Resource not found"),
        );
    }

    if let sqlx::Error::Database(db_err) = err {
        let constraint = db_err.constraint().unwrap_or("unknown");
        match db_err.code().as_deref() {
            Some("23505") if constraint == "uq_posts_organization_slug" => {
                return (
                    StatusCode::CONFLICT,
                    ErrorBody::new(
                        "CONFLICT",
                        "A post with this slug already exists in the organization",
                    ),
                );
            }
            Some("23505") if constraint.starts_with("uq_") => {
                return (
                    StatusCode::CONFLICT,
                    ErrorBody::new(
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    ),
                );
            }
            Some("23503") => {
                return (
                    StatusCode::NOT_FOUND,
                    ErrorBody::new("NOT_FOUND", "Referenced resource no longer exists"),
                );
            }
            _ => {}
        }
    }

    tracing::error!(error = %err, "Database error");
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
}
