use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gatehouse_core::auth_errors::{INTERNAL_ERROR, NOT_FOUND, UNAUTHORIZED};
use serde::Serialize;

/// Failures of the app's own `/api` routes.
///
/// Bodies carry the same `code` vocabulary as the auth provider so a client
/// can look every failure up in one message table.
#[derive(Debug)]
pub enum AppError {
    /// No usable session on a route that needs one.
    Auth(String),
    NotFound(String),
    Internal(anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    code: &'static str,
    error: String,
}

impl AppError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Auth(reason) => (StatusCode::UNAUTHORIZED, UNAUTHORIZED, reason),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, NOT_FOUND, what),
            AppError::Internal(err) => {
                tracing::error!("Request failed: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error) = self.parts();
        let body = ErrorBody {
            success: false,
            code,
            error,
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_session_is_401_with_code() {
        let response = AppError::Auth("Missing session token".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = body(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], UNAUTHORIZED);
        assert_eq!(json["error"], "Missing session token");
    }

    #[tokio::test]
    async fn unknown_route_is_404_with_code() {
        let response = AppError::NotFound("No route for /api/x".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(response).await["code"], NOT_FOUND);
    }

    #[tokio::test]
    async fn internal_error_hides_details() {
        let err: AppError = anyhow::anyhow!("db password is hunter2").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body(response).await;
        assert_eq!(json["code"], INTERNAL_ERROR);
        assert_eq!(json["error"], "Internal server error");
    }
}
