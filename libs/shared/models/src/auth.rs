use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<AppMetadata>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Tenant and staff-role data carried inside issued tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppMetadata {
    pub role: Option<StaffRole>,
    pub clinic_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Admin,
    Dentist,
    Hygienist,
    Assistant,
    Receptionist,
}

impl StaffRole {
    /// Roles that may hold a provider profile and be booked on appointments.
    pub fn is_provider(&self) -> bool {
        matches!(self, StaffRole::Dentist | StaffRole::Hygienist)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Admin => "admin",
            StaffRole::Dentist => "dentist",
            StaffRole::Hygienist => "hygienist",
            StaffRole::Assistant => "assistant",
            StaffRole::Receptionist => "receptionist",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaffRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(StaffRole::Admin),
            "dentist" => Ok(StaffRole::Dentist),
            "hygienist" => Ok(StaffRole::Hygienist),
            "assistant" => Ok(StaffRole::Assistant),
            "receptionist" => Ok(StaffRole::Receptionist),
            other => Err(format!("Unknown staff role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<StaffRole>,
    pub clinic_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A resolved clinic + location pairing for the session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Workspace {
    pub clinic_id: Uuid,
    pub location_id: Uuid,
}

impl User {
    pub fn user_uuid(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.id)
            .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))
    }

    pub fn require_clinic(&self) -> Result<Uuid, AppError> {
        self.clinic_id
            .ok_or_else(|| AppError::Forbidden("Token is not bound to a clinic".to_string()))
    }

    pub fn require_workspace(&self) -> Result<Workspace, AppError> {
        let clinic_id = self.require_clinic()?;
        let location_id = self.location_id.ok_or_else(|| {
            AppError::BadRequest("No workspace selected; choose a location first".to_string())
        })?;

        Ok(Workspace { clinic_id, location_id })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(StaffRole::Admin)
    }

    pub fn has_any_role(&self, roles: &[StaffRole]) -> bool {
        self.role.map(|r| roles.contains(&r)).unwrap_or(false)
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Only clinic administrators can perform this action".to_string()))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<StaffRole>,
    pub clinic_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}
