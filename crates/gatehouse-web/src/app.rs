use std::sync::Arc;

use axum::Router;
use gatehouse_core::RateLimiter;
use tower::Layer;

use crate::api;
use crate::auth::email_password::EmailPasswordProvider;
use crate::config::ServerConfig;
use crate::middleware::auth::AuthMiddleware;
use crate::middleware::locale::LocaleMiddleware;
use crate::middleware::security_headers::SecurityHeaders;
use crate::middleware::{run_pipeline, sequence, Middleware, Sequence};
use crate::pages;
use crate::state::AppState;

/// Security headers → locale → auth, in that order.
///
/// The locale stage runs before auth so a prefixed auth path
/// (`/de/api/auth/...`) is already stripped when the provider sees it.
pub fn build_pipeline(
    config: &ServerConfig,
    provider: Arc<EmailPasswordProvider>,
    limiter: Option<Arc<RateLimiter>>,
) -> Sequence {
    let auth = AuthMiddleware::new(provider)
        .with_limiter(limiter)
        .building(config.building)
        .trust_proxy(config.settings.rate_limit.trust_proxy);

    let stages: Vec<Arc<dyn Middleware>> = vec![
        Arc::new(SecurityHeaders::new(config.tls.is_enabled())),
        Arc::new(LocaleMiddleware::from_settings(&config.settings.locale)),
        Arc::new(auth),
    ];
    sequence(stages)
}

/// The pipeline wraps the whole router rather than individual routes, so
/// path rewrites made by a stage are visible to routing.
pub fn build_app(state: AppState, pipeline: Sequence) -> Router {
    let routes = Router::new()
        .nest("/api", api::router())
        .fallback(pages::app_shell)
        .with_state(state);

    let wrapped = axum::middleware::from_fn_with_state(pipeline, run_pipeline).layer(routes);
    Router::new().fallback_service(wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::Request;
    use axum::http::{header, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    fn app_with(config: ServerConfig) -> Router {
        let limiter = RateLimiter::from_settings(&config.settings.rate_limit)
            .unwrap()
            .map(Arc::new);
        let provider = Arc::new(EmailPasswordProvider::new(&config.auth));
        let pipeline = build_pipeline(&config, provider.clone(), limiter);
        let state = AppState {
            config: Arc::new(config),
            provider,
        };
        build_app(state, pipeline)
    }

    fn app() -> Router {
        let mut config = ServerConfig::default();
        config.settings.locale.locales = vec!["en".into(), "de".into(), "fr".into()];
        app_with(config)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        serde_json::from_str(&text(response).await).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok_with_security_headers() {
        let response = app().oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn shell_gets_negotiated_locale() {
        let response = app().oneshot(get("/de/settings")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(text(response).await.contains("<html lang=\"de\">"));

        let request = Request::builder()
            .uri("/")
            .header(header::ACCEPT_LANGUAGE, "fr-CH, fr;q=0.9, en;q=0.5")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert!(text(response).await.contains("<html lang=\"fr\">"));

        let response = app().oneshot(get("/")).await.unwrap();
        assert!(text(response).await.contains("<html lang=\"en\">"));
    }

    #[tokio::test]
    async fn unknown_api_route_is_json_404() {
        let response = app().oneshot(get("/api/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["success"], false);
    }

    #[tokio::test]
    async fn me_requires_session() {
        let response = app().oneshot(get("/api/me")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/me")
            .header(header::AUTHORIZATION, "Bearer not-a-session")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signed_up_user_can_fetch_me() {
        let app = app();
        let body = serde_json::json!({
            "name": "Grace",
            "email": "grace@example.com",
            "password": "cobol1959",
            "confirmPassword": "cobol1959",
        });
        let response = app
            .clone()
            .oneshot(post_json("/api/auth/sign-up/email", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let token = json(response).await["token"].as_str().unwrap().to_string();

        let request = Request::builder()
            .uri("/api/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["email"], "grace@example.com");
    }

    #[tokio::test]
    async fn sign_up_is_limited_to_five_per_window() {
        let app = app();
        let invalid = serde_json::json!({ "name": "", "email": "", "password": "" });

        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(post_json("/api/auth/sign-up/email", invalid.clone()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }

        let response = app
            .clone()
            .oneshot(post_json("/api/auth/sign-up/email", invalid))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = response.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=900).contains(&retry_after));
        assert_eq!(json(response).await["code"], "TOO_MANY_REQUESTS");

        // Other auth routes keep their own counters.
        let response = app.oneshot(get("/api/auth/get-session")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn building_mode_declines_auth_routes() {
        let mut config = ServerConfig::default();
        config.building = true;
        let app = app_with(config);

        for _ in 0..6 {
            let response = app
                .clone()
                .oneshot(post_json("/api/auth/sign-up/email", serde_json::json!({})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn disabled_rate_limit_never_denies() {
        let mut config = ServerConfig::default();
        config.settings.rate_limit.enabled = false;
        let app = app_with(config);

        for _ in 0..12 {
            let response = app
                .clone()
                .oneshot(post_json("/api/auth/sign-in/email", serde_json::json!({})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }
}
