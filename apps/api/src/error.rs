//! HTTP mapping for application errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cambo_core::AppError;
use serde::Serialize;
use tracing::error;

/// JSON body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    message: String,
}

/// Wraps [`AppError`] so application results convert straight into HTTP
/// responses.
#[derive(Debug)]
pub struct ApiError(pub AppError);

/// Result type returned by handlers and request guards.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Storage fault detail stays in the log; clients get a generic
        // message.
        let message = match &self.0 {
            AppError::Internal(detail) => {
                error!(%detail, "request failed with an internal error");
                "internal server error".to_owned()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use cambo_core::{AppError, AppResult};

    use super::ApiError;

    #[test]
    fn status_follows_the_error_taxonomy() {
        let cases = [
            (AppError::Validation(String::new()), StatusCode::BAD_REQUEST),
            (AppError::NotFound(String::new()), StatusCode::NOT_FOUND),
            (AppError::Conflict(String::new()), StatusCode::CONFLICT),
            (
                AppError::Unauthorized(String::new()),
                StatusCode::UNAUTHORIZED,
            ),
            (AppError::Forbidden(String::new()), StatusCode::FORBIDDEN),
            (
                AppError::Internal(String::new()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError(error).into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn internal_detail_never_reaches_the_client() -> AppResult<()> {
        let detail = "connection refused at db:5432";
        let response = ApiError(AppError::Internal(detail.to_owned())).into_response();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|error| AppError::Internal(format!("failed to read body: {error}")))?;
        let body = String::from_utf8_lossy(&bytes);

        assert!(body.contains("internal server error"));
        assert!(!body.contains(detail));
        Ok(())
    }

    #[tokio::test]
    async fn user_facing_messages_pass_through() -> AppResult<()> {
        let response =
            ApiError(AppError::Conflict("role 'editor' already exists".to_owned()))
                .into_response();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|error| AppError::Internal(format!("failed to read body: {error}")))?;
        let body = String::from_utf8_lossy(&bytes);

        assert!(body.contains("role 'editor' already exists"));
        Ok(())
    }
}
