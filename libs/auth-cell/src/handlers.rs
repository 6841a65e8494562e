use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::HeaderMap,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::extractor::extract_bearer_token;
use shared_utils::jwt;

use crate::models::{AuthSession, LoginRequest, SelectWorkspaceRequest, SignupRequest};
use crate::services::auth::{AuthService, CurrentSession};

#[axum::debug_handler]
pub async fn signup(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<AuthSession>, AppError> {
    let service = AuthService::new(&config);

    let session = service.signup(request).await?;

    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthSession>, AppError> {
    let service = AuthService::new(&config);

    let session = service.login(request).await?;

    Ok(Json(session))
}

#[axum::debug_handler]
pub async fn select_workspace(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SelectWorkspaceRequest>,
) -> Result<Json<AuthSession>, AppError> {
    let clinic_id = user.require_clinic()?;
    let user_id = user.user_uuid()?;
    let service = AuthService::new(&config);

    let session = service
        .select_workspace(user_id, clinic_id, request.location_id, auth.token())
        .await?;

    Ok(Json(session))
}

/// Tokens are stateless; clients drop theirs. Kept as an endpoint so sign-out
/// shows up in request logs.
#[axum::debug_handler]
pub async fn logout(
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    info!("User {} signed out", user.id);

    Ok(Json(json!({ "success": true })))
}

#[axum::debug_handler]
pub async fn me(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<CurrentSession>, AppError> {
    let clinic_id = user.require_clinic()?;
    let user_id = user.user_uuid()?;
    let service = AuthService::new(&config);

    let session = service
        .current_session(user_id, clinic_id, user.location_id, auth.token())
        .await?;

    Ok(Json(session))
}

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;

    let user = jwt::validate_token(&token, &config.supabase_jwt_secret)
        .map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
        clinic_id: user.clinic_id,
        location_id: user.location_id,
    }))
}

pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = extract_bearer_token(&headers)?;
    let valid = jwt::validate_token(&token, &config.supabase_jwt_secret).is_ok();

    Ok(Json(json!({ "valid": valid })))
}
