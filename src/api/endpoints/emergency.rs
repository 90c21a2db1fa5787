//! Emergency coordination endpoints.
//!
//! Thin transports over `EmergencyService`: every handler extracts the
//! resolved `Actor`, delegates, and returns the authoritative
//! post-mutation record.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::enums::EmergencyStatus;
use crate::models::{Actor, ChatMessage, Emergency};
use crate::service::CreateEmergency;

/// `POST /api/emergency` — report a new emergency.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateEmergency>,
) -> Result<(StatusCode, Json<Emergency>), ApiError> {
    let record = ctx.service.create(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /api/emergency/active` — all emergencies in a non-terminal status.
pub async fn active(
    State(ctx): State<ApiContext>,
    Extension(_actor): Extension<Actor>,
) -> Result<Json<Vec<Emergency>>, ApiError> {
    Ok(Json(ctx.service.active_emergencies()?))
}

/// `GET /api/emergency/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(_actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Json<Emergency>, ApiError> {
    Ok(Json(ctx.service.get(&id)?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: EmergencyStatus,
    pub notes: Option<String>,
}

/// `PUT /api/emergency/:id/status`
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Emergency>, ApiError> {
    let record = ctx
        .service
        .update_status(&id, request.status, request.notes, &actor)
        .await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct AssignAmbulanceRequest {
    pub resource_id: Uuid,
    pub estimated_arrival: DateTime<Utc>,
}

/// `PUT /api/emergency/:id/assign-ambulance`
pub async fn assign_ambulance(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<AssignAmbulanceRequest>,
) -> Result<Json<Emergency>, ApiError> {
    let record = ctx
        .service
        .assign_ambulance(&id, request.resource_id, request.estimated_arrival, &actor)
        .await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct AssignHospitalRequest {
    pub resource_id: Uuid,
}

/// `PUT /api/emergency/:id/assign-hospital`
pub async fn assign_hospital(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<AssignHospitalRequest>,
) -> Result<Json<Emergency>, ApiError> {
    let record = ctx
        .service
        .assign_hospital(&id, request.resource_id, &actor)
        .await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct UpdateLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
}

/// `PUT /api/emergency/:id/location`
pub async fn update_location(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<UpdateLocationRequest>,
) -> Result<Json<Emergency>, ApiError> {
    let record = ctx
        .service
        .update_location(
            &id,
            request.latitude,
            request.longitude,
            request.accuracy_meters,
            &actor,
        )
        .await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// `POST /api/emergency/:id/chat`
pub async fn post_chat(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Emergency>, ApiError> {
    let record = ctx
        .service
        .post_chat_message(&id, request.message, &actor)
        .await?;
    Ok(Json(record))
}

/// `GET /api/emergency/:id/chat`
pub async fn chat_history(
    State(ctx): State<ApiContext>,
    Extension(_actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(ctx.service.chat_messages(&id)?))
}

/// `GET /api/emergency/patient/:patient_id` — one patient's history.
pub async fn patient_history(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Vec<Emergency>>, ApiError> {
    Ok(Json(ctx.service.emergencies_for_patient(patient_id, &actor)?))
}

/// `DELETE /api/emergency/:id` — cancel; the record is kept for audit.
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Json<Emergency>, ApiError> {
    let record = ctx.service.cancel(&id, &actor).await?;
    Ok(Json(record))
}
