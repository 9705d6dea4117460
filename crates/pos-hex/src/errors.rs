use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pos_types::ports::order_store::RepoError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Verification failure: {0}")]
    VerificationFailure(String),
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        AppError::StorageFailure(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, msg) = match &self {
            AppError::InvalidInput(m) => (StatusCode::BAD_REQUEST, m.clone()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            AppError::StorageFailure(_) | AppError::VerificationFailure(_) => {
                tracing::error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
            }
        };

        let body = serde_json::to_string(&ErrorBody { error: msg })
            .unwrap_or_else(|_| "{\"error\":\"internal serialization\"}".into());
        (code, [("content-type", "application/json")], body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_per_variant() {
        let cases = [
            (AppError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("order 1".into()), StatusCode::NOT_FOUND),
            (
                AppError::StorageFailure("disk".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::VerificationFailure("token".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(err.into_response().status(), code);
        }
    }

    #[test]
    fn repo_conflicts_surface_as_storage_failures() {
        let err: AppError = RepoError::Conflict("tracking_token".into()).into();
        assert!(matches!(err, AppError::StorageFailure(m) if m.contains("tracking_token")));
    }
}
