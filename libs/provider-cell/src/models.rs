use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use auth_cell::models::AuthError;
use clinic_cell::models::{ClinicError, Specialty};
use shared_models::auth::StaffRole;
use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub clinic_id: Uuid,
    pub title: Option<String>,
    pub license_number: Option<String>,
    pub bio: Option<String>,
    pub calendar_color: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSpecialtyLink {
    pub provider_id: Uuid,
    pub specialty_id: Uuid,
}

/// A provider profile joined with its staff account and specialties.
#[derive(Debug, Clone, Serialize)]
pub struct Provider {
    #[serde(flatten)]
    pub profile: ProviderProfile,
    pub full_name: String,
    pub email: String,
    pub role: StaffRole,
    pub specialties: Vec<Specialty>,
}

impl Provider {
    pub fn display_name(&self) -> String {
        match &self.profile.title {
            Some(title) if !title.trim().is_empty() => format!("{} {}", title.trim(), self.full_name),
            _ => self.full_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProviderRequest {
    pub email: String,
    pub full_name: String,
    pub role: StaffRole,
    pub title: Option<String>,
    pub license_number: Option<String>,
    pub bio: Option<String>,
    pub calendar_color: Option<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProviderRequest {
    pub full_name: Option<String>,
    pub title: Option<String>,
    pub license_number: Option<String>,
    pub bio: Option<String>,
    pub calendar_color: Option<String>,
    /// Replaces the whole specialty set when present.
    pub specialties: Option<Vec<String>>,
}

/// Returned once on creation; the temporary password is never stored in
/// clear and cannot be fetched again.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedProvider {
    pub provider: Provider,
    pub temporary_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderListQuery {
    pub active_only: Option<bool>,
    pub specialty: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider not found")]
    NotFound,

    #[error("Role {0} cannot hold a provider profile")]
    NotAProviderRole(StaffRole),

    #[error("A staff account with email {email} already exists in this clinic")]
    EmailTaken { email: String },

    #[error("Invalid calendar color: {0}")]
    InvalidColor(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for ProviderError {
    fn from(err: anyhow::Error) -> Self {
        ProviderError::DatabaseError(err.to_string())
    }
}

impl From<ClinicError> for ProviderError {
    fn from(err: ClinicError) -> Self {
        match err {
            ClinicError::ValidationError(msg) => ProviderError::ValidationError(msg),
            other => ProviderError::DatabaseError(other.to_string()),
        }
    }
}

impl From<AuthError> for ProviderError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::EmailTaken { email } => ProviderError::EmailTaken { email },
            AuthError::AccountNotFound => ProviderError::NotFound,
            AuthError::ValidationError(msg) => ProviderError::ValidationError(msg),
            other => ProviderError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound => AppError::NotFound(err.to_string()),
            ProviderError::NotAProviderRole(_) | ProviderError::InvalidColor(_) => {
                AppError::ValidationError(err.to_string())
            }
            ProviderError::EmailTaken { .. } => AppError::Conflict(err.to_string()),
            ProviderError::ValidationError(msg) => AppError::ValidationError(msg),
            ProviderError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
