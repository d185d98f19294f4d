//! HTTP echo service: answers every request on `/` with a fixed greeting

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use pulse_common::config::ServeConfig;
use pulse_obs::{init as obs_init, render, ECHO_REQUESTS_TOTAL};

#[derive(Clone)]
pub struct AppState {
    message: Arc<str>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
pub struct EchoResponse {
    pub result: String,
}

pub fn app(message: impl Into<String>) -> Router {
    obs_init();
    let state = AppState { message: Arc::from(message.into()) };

    Router::new()
        .route("/", any(echo))
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn echo(State(state): State<AppState>) -> Json<EchoResponse> {
    ECHO_REQUESTS_TOTAL.inc();
    tracing::debug!(target: "echo", "echo request");
    Json(EchoResponse { result: state.message.to_string() })
}

async fn metrics() -> impl IntoResponse {
    let (content_type, body) = render();
    ([("content-type", content_type)], body)
}

/// Binds `cfg.host:cfg.port` and serves until `shutdown` resolves.
pub async fn serve<F>(cfg: &ServeConfig, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind((cfg.host.as_str(), cfg.port)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!(target: "echo", "listening on http://{}", addr);
    axum::serve(listener, app(cfg.message.clone()))
        .with_graceful_shutdown(shutdown)
        .await
}
