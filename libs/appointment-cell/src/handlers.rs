use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AppointmentListQuery, CreateAppointmentRequest, UpdateAppointmentRequest, UpdateStatusRequest};
use crate::services::lifecycle::valid_transitions;
use crate::services::AppointmentService;

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let workspace = user.require_workspace()?;
    let service = AppointmentService::new(&state);

    let appointment = service.create_appointment(workspace, request, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = AppointmentService::new(&state);

    let appointments = service
        .list_appointments(clinic_id, user.location_id, query, auth.token())
        .await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = AppointmentService::new(&state);

    let appointment = service.get_appointment(clinic_id, appointment_id, auth.token()).await?;

    Ok(Json(json!({
        "appointment": appointment,
        "allowed_transitions": valid_transitions(appointment.status)
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = AppointmentService::new(&state);

    let appointment = service
        .update_appointment(clinic_id, appointment_id, request, auth.token())
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = AppointmentService::new(&state);

    let appointment = service
        .update_status(clinic_id, appointment_id, request.status, request.notes, auth.token())
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_dashboard(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let workspace = user.require_workspace()?;
    let service = AppointmentService::new(&state);

    let summary = service.dashboard(workspace, Utc::now(), auth.token()).await?;

    Ok(Json(json!(summary)))
}
