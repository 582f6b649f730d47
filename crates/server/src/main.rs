mod api;
mod bootstrap;
mod catalog;
mod health;
mod pdf;
mod quotes;
mod templates;
mod workspace;

use std::time::Duration;

use anyhow::Result;
use axum::Router;
use devis_core::config::{AppConfig, LoadOptions};

use crate::api::AppState;

fn init_logging(config: &AppConfig) {
    use devis_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let state = AppState::new(app.db_pool.clone(), &app.config);
    let router = api_router(state);

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        "devis-server started"
    );

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(true);
    });

    let mut drain_rx = shutdown_rx.clone();
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = drain_rx.changed().await;
    });

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    tokio::select! {
        result = server => result?,
        _ = async {
            let _ = shutdown_rx.changed().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                grace_secs = grace.as_secs(),
                "open connections did not drain in time, shutting down anyway"
            );
        }
    }

    tracing::info!(event_name = "system.server.stopping", "devis-server stopping");
    app.db_pool.close().await;

    Ok(())
}

fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(catalog::router(state.clone()))
        .merge(templates::router(state.clone()))
        .merge(quotes::router(state))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::util::ServiceExt;

    use crate::api::AppState;
    use crate::api_router;

    #[tokio::test]
    async fn routes_dispatch_to_catalog_templates_and_quotes() {
        let router = api_router(AppState::in_memory());

        for path in ["/api/materials", "/api/labor", "/api/templates", "/api/quotes"] {
            let response = router
                .clone()
                .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        }
    }

    #[tokio::test]
    async fn quote_creation_and_send_flow_over_http() {
        let router = api_router(AppState::in_memory());

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/quotes")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"client_name":"Marie Dupont"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let created: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(created["synced"], serde_json::Value::Bool(true));
        let id = created["id"].as_str().unwrap().to_string();

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/quotes/{id}/send"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let sent: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(sent["status"], serde_json::Value::String("sent".to_string()));
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let router = api_router(AppState::in_memory());
        let response = router
            .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
