mod api;
mod app;
mod auth;
mod config;
mod dto;
mod error;
mod middleware;
mod pages;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, Method};
use gatehouse_core::RateLimiter;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::email_password::EmailPasswordProvider;
use crate::config::ServerConfig;
use crate::state::AppState;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatehouse_web=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load()?;
    let bind_addr = config.bind_addr;
    let tls_config = config.tls.clone();
    let tls_enabled = tls_config.is_enabled();

    // Invalid policies abort startup.
    let limiter = RateLimiter::from_settings(&config.settings.rate_limit)?.map(Arc::new);
    match &limiter {
        Some(limiter) => tracing::info!(
            default_window_secs = limiter.table().default_policy().window_seconds(),
            default_max = limiter.table().default_policy().max_requests(),
            "Rate limiting enabled"
        ),
        None => tracing::warn!("Rate limiting disabled"),
    }
    if config.building {
        tracing::info!("Build mode: auth provider declines all requests");
    }

    let provider =
        Arc::new(EmailPasswordProvider::new(&config.auth).with_secure_cookie(tls_enabled));
    let pipeline = app::build_pipeline(&config, provider.clone(), limiter.clone());
    tracing::debug!(stages = pipeline.len(), "Pipeline built");

    let state = AppState {
        config: Arc::new(config),
        provider: provider.clone(),
    };

    // Session + counter cleanup task
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let sessions = provider.cleanup_expired_sessions();
            let counters = match &limiter {
                Some(limiter) => limiter.purge_expired().await,
                None => 0,
            };
            if sessions + counters > 0 {
                tracing::debug!(sessions, counters, "Expired entries removed");
            }
        }
    });

    // CORS: same-origin only by default (no cross-origin requests allowed)
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = app::build_app(state, pipeline)
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    if let (Some(cert), Some(key)) = (&tls_config.cert_path, &tls_config.key_path) {
        use axum_server::tls_rustls::RustlsConfig;
        let rustls_config = RustlsConfig::from_pem_file(cert, key).await?;
        tracing::info!("gatehouse-web listening on https://{}", bind_addr);
        axum_server::bind_rustls(bind_addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        tracing::info!("gatehouse-web listening on http://{}", bind_addr);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}
