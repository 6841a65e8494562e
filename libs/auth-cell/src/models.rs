use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clinic_cell::models::{Clinic, ClinicError, Location};
use shared_models::auth::{StaffRole, Workspace};
use shared_models::error::AppError;

/// A row of the `users` table. Never serialized to clients directly; see
/// [`StaffProfile`].
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: StaffRole,
    pub password_hash: String,
    #[serde(default)]
    pub failed_login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffProfile {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: StaffRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserAccount> for StaffProfile {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id,
            clinic_id: account.clinic_id,
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            role: account.role,
            is_active: account.is_active,
            last_login_at: account.last_login_at,
            created_at: account.created_at,
        }
    }
}

/// Fields needed to insert a staff account; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUserAccount {
    pub clinic_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: StaffRole,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub clinic_name: String,
    pub clinic_code: String,
    pub location_name: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub clinic_phone: Option<String>,
    pub location_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub clinic_code: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectWorkspaceRequest {
    pub location_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: StaffProfile,
    pub clinic: Clinic,
    pub locations: Vec<Location>,
    pub workspace: Option<Workspace>,
    pub requires_workspace_selection: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid clinic code, email or password")]
    InvalidCredentials,

    #[error("Account locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    #[error("Account is deactivated")]
    AccountInactive,

    #[error("Clinic code {code} is already registered")]
    ClinicCodeTaken { code: String },

    #[error("A staff account with email {email} already exists in this clinic")]
    EmailTaken { email: String },

    #[error("Password does not meet policy: {0}")]
    WeakPassword(String),

    #[error("Location not found in this clinic")]
    LocationNotFound,

    #[error("Location is inactive")]
    LocationInactive,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::DatabaseError(err.to_string())
    }
}

impl From<ClinicError> for AuthError {
    fn from(err: ClinicError) -> Self {
        match err {
            ClinicError::CodeTaken { code } => AuthError::ClinicCodeTaken { code },
            ClinicError::LocationNotFound => AuthError::LocationNotFound,
            ClinicError::NotFound => AuthError::ClinicNotFound,
            ClinicError::ValidationError(msg) => AuthError::ValidationError(msg),
            ClinicError::DatabaseError(msg) => AuthError::DatabaseError(msg),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::Auth(err.to_string()),
            AuthError::AccountLocked { .. } => AppError::Locked(err.to_string()),
            AuthError::AccountInactive => AppError::Forbidden(err.to_string()),
            AuthError::ClinicCodeTaken { .. } | AuthError::EmailTaken { .. } => AppError::Conflict(err.to_string()),
            AuthError::ValidationError(msg) => AppError::ValidationError(msg),
            AuthError::WeakPassword(_) | AuthError::LocationInactive => AppError::ValidationError(err.to_string()),
            AuthError::LocationNotFound | AuthError::AccountNotFound | AuthError::ClinicNotFound => {
                AppError::NotFound(err.to_string())
            }
            AuthError::Token(msg) => AppError::Internal(msg),
            AuthError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
