use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateLocationRequest, LocationListQuery, UpdateClinicRequest, UpdateLocationRequest};
use crate::services::ClinicService;

#[axum::debug_handler]
pub async fn get_current_clinic(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = ClinicService::new(&config);

    let clinic = service.get_clinic(clinic_id, auth.token()).await?;

    Ok(Json(json!(clinic)))
}

#[axum::debug_handler]
pub async fn update_current_clinic(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateClinicRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    user.require_admin()?;
    let service = ClinicService::new(&config);

    let clinic = service.update_clinic(clinic_id, request, auth.token()).await?;

    Ok(Json(json!(clinic)))
}

#[axum::debug_handler]
pub async fn list_locations(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<LocationListQuery>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    // Inactive locations are an admin concern only.
    let include_inactive = query.include_inactive.unwrap_or(false) && user.is_admin();
    let service = ClinicService::new(&config);

    let locations = service.list_locations(clinic_id, include_inactive, auth.token()).await?;

    Ok(Json(json!({
        "locations": locations,
        "total": locations.len()
    })))
}

#[axum::debug_handler]
pub async fn create_location(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateLocationRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    user.require_admin()?;
    let service = ClinicService::new(&config);

    let location = service.create_location(clinic_id, request, auth.token()).await?;

    Ok(Json(json!(location)))
}

#[axum::debug_handler]
pub async fn update_location(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(location_id): Path<Uuid>,
    Json(request): Json<UpdateLocationRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    user.require_admin()?;
    let service = ClinicService::new(&config);

    let location = service.update_location(clinic_id, location_id, request, auth.token()).await?;

    Ok(Json(json!(location)))
}
