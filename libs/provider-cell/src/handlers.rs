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

use crate::models::{CreateProviderRequest, ProviderListQuery, UpdateProviderRequest};
use crate::services::ProviderService;

#[axum::debug_handler]
pub async fn list_providers(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ProviderListQuery>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = ProviderService::new(&state);

    let providers = service
        .list_providers(
            clinic_id,
            query.active_only.unwrap_or(true),
            query.specialty.as_deref(),
            auth.token(),
        )
        .await?;

    Ok(Json(json!({
        "providers": providers,
        "total": providers.len()
    })))
}

#[axum::debug_handler]
pub async fn get_provider(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = user.require_clinic()?;
    let service = ProviderService::new(&state);

    let provider = service.get_provider(clinic_id, provider_id, auth.token()).await?;

    Ok(Json(json!(provider)))
}

#[axum::debug_handler]
pub async fn create_provider(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateProviderRequest>,
) -> Result<Json<Value>, AppError> {
    user.require_admin()?;
    let clinic_id = user.require_clinic()?;
    let service = ProviderService::new(&state);

    let created = service.create_provider(clinic_id, request, auth.token()).await?;

    Ok(Json(json!(created)))
}

#[axum::debug_handler]
pub async fn update_provider(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(provider_id): Path<Uuid>,
    Json(request): Json<UpdateProviderRequest>,
) -> Result<Json<Value>, AppError> {
    user.require_admin()?;
    let clinic_id = user.require_clinic()?;
    let service = ProviderService::new(&state);

    let provider = service.update_provider(clinic_id, provider_id, request, auth.token()).await?;

    Ok(Json(json!(provider)))
}

#[axum::debug_handler]
pub async fn deactivate_provider(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    user.require_admin()?;
    let clinic_id = user.require_clinic()?;
    let service = ProviderService::new(&state);

    service.deactivate_provider(clinic_id, provider_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "provider_id": provider_id
    })))
}

#[axum::debug_handler]
pub async fn list_specialties(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = ProviderService::new(&state);

    let specialties = service.list_specialties(auth.token()).await?;

    Ok(Json(json!({ "specialties": specialties })))
}

#[axum::debug_handler]
pub async fn list_team(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    user.require_admin()?;
    let clinic_id = user.require_clinic()?;
    let service = ProviderService::new(&state);

    let team = service.list_team(clinic_id, auth.token()).await?;

    Ok(Json(json!({
        "members": team,
        "total": team.len()
    })))
}
