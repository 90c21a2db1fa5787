//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub active_emergencies: usize,
    pub open_scopes: usize,
}

/// `GET /api/health` — liveness plus a coarse load indicator.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let active = ctx.service.active_emergencies()?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        active_emergencies: active.len(),
        open_scopes: ctx.service.broker().scope_count(),
    }))
}
