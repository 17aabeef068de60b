//! Control surface consumed by the dashboard: health probe, manual
//! update trigger, latest snapshot readout.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use screener::exchange::{self, ClientRegistry};
use screener::Screener;
use serde_json::{json, Value};
use shared::Config;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting screener API server...");

    let config = Config::from_env()?;
    let addr = config.api_addr.clone();

    let http = exchange::http_client(config.fetch_timeout_secs)?;
    let registry = Arc::new(ClientRegistry::builtin(http));
    let screener = Arc::new(Screener::new(config, registry)?);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/update", post(run_update))
        .route("/api/snapshot/latest", get(latest_snapshot))
        .layer(TraceLayer::new_for_http())
        .with_state(screener);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on http://{addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Run one cycle now, waiting for any in-flight cycle to finish first.
/// The dashboard's "last update" stamp only advances on success.
async fn run_update(State(screener): State<Arc<Screener>>) -> Response {
    match screener.run_cycle().await {
        Ok(timestamp) => Json(json!({ "timestamp": timestamp })).into_response(),
        Err(err) => {
            error!(error = %err, "manual update failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

async fn latest_snapshot(State(screener): State<Arc<Screener>>) -> Response {
    match screener.store().load_latest() {
        Ok(Some(snapshot)) => Json(snapshot).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no snapshot yet" })),
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "snapshot read failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}
