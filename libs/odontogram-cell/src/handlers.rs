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

use crate::layout::Layout;
use crate::models::{CreateFindingRequest, DragRequest, FindingHistoryQuery, LayoutQuery, SaveLayoutRequest};
use crate::services::{ChartService, LayoutService};
use crate::tooth::ToothId;

fn layout_json(layout: &Layout) -> Value {
    json!({
        "dentition": layout.dentition,
        "teeth": layout.placed_teeth()
    })
}

#[axum::debug_handler]
pub async fn get_chart(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = ChartService::new(&config);

    let chart = service.chart(clinic_id, patient_id, auth.token()).await?;

    Ok(Json(json!(chart)))
}

#[axum::debug_handler]
pub async fn record_finding(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<CreateFindingRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let user_id = user.user_uuid()?;
    let service = ChartService::new(&config);

    let finding = service
        .record_finding(clinic_id, patient_id, user_id, request, auth.token())
        .await?;

    Ok(Json(json!(finding)))
}

#[axum::debug_handler]
pub async fn finding_history(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<FindingHistoryQuery>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = ChartService::new(&config);

    let findings = service.history(clinic_id, patient_id, query.tooth, auth.token()).await?;

    Ok(Json(json!({
        "findings": findings,
        "total": findings.len()
    })))
}

#[axum::debug_handler]
pub async fn get_layout(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<LayoutQuery>,
) -> Result<Json<Value>, AppError> {
    let user_id = user.user_uuid()?;
    let service = LayoutService::new(&config);

    let layout = service.get_layout(user_id, query.dentition, auth.token()).await?;

    Ok(Json(layout_json(&layout)))
}

#[axum::debug_handler]
pub async fn save_layout(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SaveLayoutRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user.user_uuid()?;
    let service = LayoutService::new(&config);

    let layout = service
        .save_layout(user_id, request.dentition, &request.poses, auth.token())
        .await?;

    Ok(Json(layout_json(&layout)))
}

#[axum::debug_handler]
pub async fn drag_tooth(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(tooth): Path<String>,
    Json(request): Json<DragRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user.user_uuid()?;
    let tooth: ToothId = tooth.parse().map_err(AppError::ValidationError)?;
    let service = LayoutService::new(&config);

    let pose = service
        .drag_tooth(user_id, tooth, request.dx, request.dy, auth.token())
        .await?;

    Ok(Json(json!({
        "tooth": tooth,
        "pose": pose
    })))
}

#[axum::debug_handler]
pub async fn reset_layout(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<LayoutQuery>,
) -> Result<Json<Value>, AppError> {
    let user_id = user.user_uuid()?;
    let service = LayoutService::new(&config);

    let layout = service.reset_layout(user_id, query.dentition, auth.token()).await?;

    Ok(Json(layout_json(&layout)))
}
