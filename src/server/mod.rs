//! Browser-facing surface: a small JSON API plus one WebSocket that carries
//! live frame updates and timer notifications.

mod routes;
mod socket;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, info};
use serde_json::json;

use crate::{error::FocusError, service::FocusService};

pub fn router(service: FocusService) -> Router {
    Router::new()
        .route("/api/start", post(routes::start))
        .route("/api/stop", post(routes::stop))
        .route("/api/configure", post(routes::configure))
        .route("/api/state", get(routes::state))
        .route("/api/history", get(routes::history))
        .route("/api/summary/latest", get(routes::latest_summary))
        .route("/api/trends", get(routes::trends))
        .route("/ws", get(socket::upgrade))
        .with_state(service)
}

/// Serves until ctrl-c, then stops any running session so it is persisted.
pub async fn serve(service: FocusService, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(service.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutting down; stopping active session");
    tokio::task::spawn_blocking(move || service.stop())
        .await
        .context("shutdown stop task failed")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
}

/// [`FocusError`] as an HTTP response.
pub struct ApiError(FocusError);

impl From<FocusError> for ApiError {
    fn from(err: FocusError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            FocusError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            FocusError::DeviceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            FocusError::Busy => StatusCode::CONFLICT,
            FocusError::Storage(_) | FocusError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Runs a blocking service call off the async workers.
pub(crate) async fn blocking<T, F>(call: F) -> Result<T, FocusError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|err| FocusError::Internal(format!("blocking task failed: {err}")))
}
