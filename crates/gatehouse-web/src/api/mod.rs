use axum::http::Uri;
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::auth::extractor::AuthUser;
use crate::dto::{HealthResponse, UserView};
use crate::error::AppError;
use crate::state::AppState;

/// Routes under `/api`. The auth provider's routes are served by the
/// pipeline before the router is reached.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/health", get(health))
        .fallback(not_found)
}

async fn me(AuthUser(user): AuthUser) -> Json<UserView> {
    Json(user)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
