use std::net::SocketAddr;

use anyhow::Context;
use axum::response::Json;
use axum::routing::get;
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use template_approval_api::config::AppConfig;
use template_approval_api::middleware::cors::create_cors_layer;
use template_approval_api::routes::{self, AppState};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // RUST_LOG environment variable controls log level (default: info)
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = AppConfig::from_env();
    let port = config.port;
    let upload_dir = config.upload_dir.clone();

    let app_state = AppState::from_config(config).await?;

    let app = axum::Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api", routes::create_api_router(&app_state))
        .nest_service("/uploads", ServeDir::new(&upload_dir))
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer()),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {} (port {})", addr, port);
    info!("Health check available at http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn root() -> &'static str {
    "API is running..."
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "template-approval-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Handle both SIGINT (Ctrl+C) and SIGTERM (container stop).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("SIGINT received, shutting down gracefully");
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down gracefully");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Shutdown signal received");
    }
}
