//! Authentication provider seam.
//!
//! The auth middleware knows nothing about users or sessions: it hands every
//! request under the provider's base path to an [`AuthProvider`] and either
//! returns what the provider produced or, if the provider declines, lets the
//! request continue down the pipeline.

pub mod email_password;
pub mod extractor;
pub mod password;
pub mod session;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gatehouse_core::auth_error_message;
use serde::Serialize;

/// Per-request facts the provider may need.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthContext {
    /// The app is starting up or prerendering. Providers must not touch
    /// their backing stores and should decline or answer with a safe default.
    pub building: bool,
}

/// What a provider did with a request.
pub enum AuthOutcome {
    Handled(Response),
    /// Not an auth request; the request is handed back unchanged.
    Declined(Request<Body>),
}

/// An embedded authentication backend.
#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    /// Path prefix the provider owns, e.g. `/api/auth`.
    fn base_path(&self) -> &str;

    /// Handles `request`, whose path relative to [`AuthProvider::base_path`]
    /// is `route` (e.g. `/sign-in/email`).
    async fn handle(
        &self,
        route: &str,
        request: Request<Body>,
        ctx: &AuthContext,
    ) -> Result<AuthOutcome, AuthProviderError>;
}

/// A failure reported by the provider, keyed by a stable error code.
///
/// The code is passed to the client verbatim; only the accompanying message
/// is looked up locally.
#[derive(Debug)]
pub struct AuthProviderError {
    pub status: StatusCode,
    pub code: String,
    pub details: Option<serde_json::Value>,
}

impl AuthProviderError {
    pub fn new(status: StatusCode, code: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for AuthProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code, self.status)
    }
}

impl std::error::Error for AuthProviderError {}

#[derive(Serialize)]
pub(crate) struct AuthErrorBody<'a> {
    pub code: &'a str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'a serde_json::Value>,
}

impl IntoResponse for AuthProviderError {
    fn into_response(self) -> Response {
        let body = AuthErrorBody {
            code: &self.code,
            message: auth_error_message(&self.code),
            details: self.details.as_ref(),
        };
        (self.status, Json(body)).into_response()
    }
}
