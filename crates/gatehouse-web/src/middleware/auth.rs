//! Auth stage: rate-limits and dispatches requests under the provider's base path.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use gatehouse_core::auth_errors::TOO_MANY_REQUESTS;
use gatehouse_core::{Decision, RateLimiter};

use super::{Middleware, Next};
use crate::auth::{AuthContext, AuthOutcome, AuthProvider, AuthProviderError};

const UNKNOWN_IDENTITY: &str = "unknown";

pub struct AuthMiddleware {
    provider: Arc<dyn AuthProvider>,
    limiter: Option<Arc<RateLimiter>>,
    building: bool,
    trust_proxy: bool,
}

impl AuthMiddleware {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            limiter: None,
            building: false,
            trust_proxy: false,
        }
    }

    pub fn with_limiter(mut self, limiter: Option<Arc<RateLimiter>>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn building(mut self, building: bool) -> Self {
        self.building = building;
        self
    }

    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`.
    pub fn trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(&self, request: Request<Body>, next: Next<'_>) -> Response {
        let Some(route) = auth_route(self.provider.base_path(), request.uri().path()) else {
            return next.run(request).await;
        };

        if !self.building {
            if let Some(limiter) = &self.limiter {
                let identity = client_identity(&request, self.trust_proxy);
                if let Decision::Deny { retry_after } = limiter.check_now(&identity, &route).await {
                    tracing::warn!(%identity, %route, "auth request rate limited");
                    return too_many_requests(retry_after);
                }
            }
        }

        let ctx = AuthContext {
            building: self.building,
        };
        match self.provider.handle(&route, request, &ctx).await {
            Ok(AuthOutcome::Handled(response)) => response,
            Ok(AuthOutcome::Declined(request)) => next.run(request).await,
            Err(e) => {
                if e.status.is_server_error() {
                    tracing::error!(%route, code = %e.code, "auth provider failed");
                } else {
                    tracing::debug!(
                        %route,
                        code = %e.code,
                        status = %e.status,
                        "auth request rejected"
                    );
                }
                e.into_response()
            }
        }
    }
}

/// Path of `path` relative to `base_path`, or `None` if it lies outside it.
///
/// `/api/auth` itself maps to `/`; `/api/authx` is not under `/api/auth`.
pub fn auth_route(base_path: &str, path: &str) -> Option<String> {
    let base = base_path.trim_end_matches('/');
    let rest = path.strip_prefix(base)?;
    match rest {
        "" => Some("/".to_string()),
        r if r.starts_with('/') => Some(r.to_string()),
        _ => None,
    }
}

/// The key requests are counted under: the peer IP, or with `trust_proxy` the
/// first forwarded address.
pub fn client_identity(request: &Request<Body>, trust_proxy: bool) -> String {
    if trust_proxy {
        let headers = request.headers();
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        let real_ip = || {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
        };
        if let Some(ip) = forwarded.or_else(real_ip) {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string())
}

fn too_many_requests(retry_after: Duration) -> Response {
    let secs = retry_after
        .as_secs()
        .saturating_add(u64::from(retry_after.subsec_nanos() > 0))
        .max(1);

    let mut response =
        AuthProviderError::new(StatusCode::TOO_MANY_REQUESTS, TOO_MANY_REQUESTS).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    response
}
