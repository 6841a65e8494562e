use std::sync::Arc;
use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreatePatientRequest, PatientSearchQuery, SetPatientSpecialtiesRequest, UpdatePatientRequest};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = PatientService::new(&config);

    let patient = service.create_patient(clinic_id, request, auth.token()).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = PatientService::new(&config);

    let patient = service.get_patient(clinic_id, patient_id, auth.token()).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = PatientService::new(&config);

    let patient = service.update_patient(clinic_id, patient_id, request, auth.token()).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn archive_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = PatientService::new(&config);

    let patient = service.archive_patient(clinic_id, patient_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "patient": patient
    })))
}

#[axum::debug_handler]
pub async fn search_patients(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = PatientService::new(&config);

    let patients = service.search_patients(clinic_id, query, auth.token()).await?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

#[axum::debug_handler]
pub async fn get_patient_specialties(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = PatientService::new(&config);

    let specialties = service.get_specialties(clinic_id, patient_id, auth.token()).await?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "specialties": specialties
    })))
}

#[axum::debug_handler]
pub async fn set_patient_specialties(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<SetPatientSpecialtiesRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = PatientService::new(&config);

    let specialties = service
        .set_specialties(clinic_id, patient_id, request.specialties, auth.token())
        .await?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "specialties": specialties
    })))
}
