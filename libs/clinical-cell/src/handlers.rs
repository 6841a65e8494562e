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

use crate::models::{CreateRecordRequest, RecordListQuery, RiskInputs, TermQuery};
use crate::services::{assess_risk, RecordService, TermService};

/// Computes flags for an intake without saving anything.
#[axum::debug_handler]
pub async fn assess(
    Extension(user): Extension<User>,
    Json(inputs): Json<RiskInputs>,
) -> Result<Json<Value>, AppError> {
    user.require_clinic()?;

    inputs.screening.validate().map_err(AppError::ValidationError)?;
    if let Some(form) = &inputs.form {
        form.validate()
            .map_err(|e| AppError::ValidationError(format!("Invalid {} form: {}", form.specialty(), e)))?;
    }

    Ok(Json(json!(assess_risk(&inputs))))
}

#[axum::debug_handler]
pub async fn create_record(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateRecordRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = RecordService::new(&config);

    let record = service.create_record(clinic_id, request, auth.token()).await?;

    Ok(Json(json!(record)))
}

#[axum::debug_handler]
pub async fn list_records(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<RecordListQuery>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = RecordService::new(&config);

    let records = service.list_records(clinic_id, query, auth.token()).await?;

    Ok(Json(json!({
        "records": records,
        "total": records.len()
    })))
}

#[axum::debug_handler]
pub async fn get_record(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(record_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = RecordService::new(&config);

    let record = service.get_record(clinic_id, record_id, auth.token()).await?;

    Ok(Json(json!(record)))
}

#[axum::debug_handler]
pub async fn search_terms(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<TermQuery>,
) -> Result<Json<Value>, AppError> {
    let service = TermService::new(&config);

    let terms = service.search_terms(query, auth.token()).await?;

    Ok(Json(json!({
        "terms": terms,
        "total": terms.len()
    })))
}
