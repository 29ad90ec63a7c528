use axum::{
    routing::{get, post},
    Router,
};

use http::{header, Method};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod state;
mod db;
mod crypto {
    pub mod aes;
    pub mod identity;
}

mod models {
    pub mod cache;
    pub mod session;
    pub mod snapshot;
}

mod provider {
    pub mod client;
    pub mod envelope;
    pub mod session;
    pub mod transport;
}

mod repositories {
    pub mod audit;
    pub mod cache;
}

mod services {
    pub mod cache;
}

mod handlers {
    pub mod auth;
    pub mod cache;
    pub mod ops;
}

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().unwrap(),
            "http://127.0.0.1:3000".parse().unwrap(),
        ])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(86400));

    let app = Router::new()
        .route("/health", get(handlers::ops::health))
        .route("/api/status", get(handlers::ops::status))
        .route("/api/auth/initiate", post(handlers::auth::initiate_login))
        .route("/api/auth/status", get(handlers::auth::auth_status))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/snapshot", get(handlers::cache::get_snapshot))
        .route("/api/snapshot/refresh", post(handlers::cache::refresh_snapshot))
        .route("/api/cache/status", get(handlers::cache::cache_status))
        .route("/api/cache/invalidate", post(handlers::cache::invalidate_cache))
        .route("/api/cache/cleanup", post(handlers::cache::cleanup_cache))
        .route("/api/cache/audit", get(handlers::cache::cache_audit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(cors)
        .with_state(state.clone());

    let cleanup_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            tracing::info!("🧹 Running scheduled cleanup of expired cache entries...");
            match cleanup_state.cache.cleanup_expired().await {
                Ok(deleted) => {
                    tracing::info!("✅ Cleanup job completed ({} rows removed)", deleted);
                }
                Err(e) => {
                    tracing::error!("❌ Cleanup job failed: {}", e);
                }
            }
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("✅ Background cleanup job started (runs every hour)");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
