use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    models::HistoryRecord,
    service::{FocusService, ServiceStart, ServiceState, ServiceStop},
    summary::{SessionSummary, TrendReport},
    timer::TimerConfig,
};

use super::{blocking, ApiError};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub n: Option<usize>,
}

/// Missing fields read as zero so validation names them.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ConfigureRequest {
    #[serde(alias = "focusTotal")]
    pub focus_total: u64,
    #[serde(alias = "restDuration")]
    pub rest_duration: u64,
    #[serde(alias = "checkInterval")]
    pub check_interval: u64,
}

pub async fn start(State(service): State<FocusService>) -> Result<Json<ServiceStart>, ApiError> {
    let outcome = blocking(move || service.start()).await??;
    Ok(Json(outcome))
}

pub async fn stop(State(service): State<FocusService>) -> Result<Json<ServiceStop>, ApiError> {
    let outcome = blocking(move || service.stop()).await?;
    Ok(Json(outcome))
}

pub async fn configure(
    State(service): State<FocusService>,
    Json(request): Json<ConfigureRequest>,
) -> Result<Json<TimerConfig>, ApiError> {
    let config = service.configure(
        request.focus_total,
        request.rest_duration,
        request.check_interval,
    )?;
    Ok(Json(config))
}

pub async fn state(State(service): State<FocusService>) -> Json<ServiceState> {
    Json(service.get_state())
}

pub async fn history(
    State(service): State<FocusService>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    let n = query.n.unwrap_or_else(|| service.history().capacity());
    Ok(Json(service.get_history(n).await?))
}

pub async fn latest_summary(
    State(service): State<FocusService>,
) -> Result<Json<Option<SessionSummary>>, ApiError> {
    Ok(Json(service.latest_summary().await?))
}

pub async fn trends(State(service): State<FocusService>) -> Result<Json<TrendReport>, ApiError> {
    Ok(Json(service.trends().await?))
}
