use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{self, HeaderValue};
use axum::response::Response;

use super::{Middleware, Next};

/// Hardening headers added to every response.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityHeaders {
    /// Also send `Strict-Transport-Security`; only meaningful behind TLS.
    pub hsts: bool,
}

impl SecurityHeaders {
    pub fn new(hsts: bool) -> Self {
        Self { hsts }
    }

    fn apply(&self, response: &mut Response) {
        let headers = response.headers_mut();

        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        headers.insert(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        );
        headers
            .entry(header::CONTENT_SECURITY_POLICY)
            .or_insert(HeaderValue::from_static(
                "default-src 'self'; style-src 'self' 'unsafe-inline'; frame-ancestors 'none'",
            ));

        if self.hsts {
            headers.insert(
                header::STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_static("max-age=31536000; includeSubDomains"),
            );
        }
    }
}

#[async_trait]
impl Middleware for SecurityHeaders {
    async fn handle(&self, request: Request<Body>, next: Next<'_>) -> Response {
        let mut response = next.run(request).await;
        self.apply(&mut response);
        response
    }
}
