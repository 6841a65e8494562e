use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use patient_cell::models::PatientError;
use shared_models::error::AppError;

use crate::layout::Pose;
use crate::tooth::{Dentition, Surface, ToothId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToothCondition {
    Healthy,
    Caries,
    Filling,
    Crown,
    Missing,
    Implant,
    RootCanal,
    ExtractionPlanned,
    BridgePontic,
    Sealant,
    Fracture,
}

impl ToothCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToothCondition::Healthy => "healthy",
            ToothCondition::Caries => "caries",
            ToothCondition::Filling => "filling",
            ToothCondition::Crown => "crown",
            ToothCondition::Missing => "missing",
            ToothCondition::Implant => "implant",
            ToothCondition::RootCanal => "root_canal",
            ToothCondition::ExtractionPlanned => "extraction_planned",
            ToothCondition::BridgePontic => "bridge_pontic",
            ToothCondition::Sealant => "sealant",
            ToothCondition::Fracture => "fracture",
        }
    }

    /// Conditions recorded against individual surfaces rather than the
    /// whole tooth.
    pub fn allows_surfaces(&self) -> bool {
        matches!(
            self,
            ToothCondition::Caries | ToothCondition::Filling | ToothCondition::Sealant | ToothCondition::Fracture
        )
    }
}

impl fmt::Display for ToothCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToothFinding {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub tooth: ToothId,
    #[serde(default)]
    pub surfaces: Vec<Surface>,
    pub condition: ToothCondition,
    pub notes: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFindingRequest {
    pub tooth: u8,
    #[serde(default)]
    pub surfaces: Vec<Surface>,
    pub condition: ToothCondition,
    pub notes: Option<String>,
}

/// A finding that passed tooth and surface checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidFinding {
    pub tooth: ToothId,
    pub surfaces: BTreeSet<Surface>,
    pub condition: ToothCondition,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FindingHistoryQuery {
    pub tooth: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToothChart {
    pub patient_id: Uuid,
    pub teeth: Vec<ToothFinding>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutQuery {
    #[serde(default)]
    pub dentition: Dentition,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveLayoutRequest {
    #[serde(default)]
    pub dentition: Dentition,
    pub poses: BTreeMap<u8, Pose>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DragRequest {
    pub dx: f64,
    pub dy: f64,
}

/// A row of `odontogram_layouts`: only the user's overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredLayout {
    pub id: Uuid,
    pub user_id: Uuid,
    pub dentition: Dentition,
    #[serde(default)]
    pub poses: BTreeMap<ToothId, Pose>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum OdontogramError {
    #[error("Patient not found")]
    PatientNotFound,

    #[error("{0}")]
    InvalidTooth(String),

    #[error("{0}")]
    InvalidSurface(String),

    #[error("Tooth {tooth} does not belong to the {dentition} dentition")]
    WrongDentition { tooth: ToothId, dentition: Dentition },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for OdontogramError {
    fn from(err: anyhow::Error) -> Self {
        OdontogramError::DatabaseError(err.to_string())
    }
}

impl From<PatientError> for OdontogramError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => OdontogramError::PatientNotFound,
            other => OdontogramError::DatabaseError(other.to_string()),
        }
    }
}

impl From<OdontogramError> for AppError {
    fn from(err: OdontogramError) -> Self {
        match err {
            OdontogramError::PatientNotFound => AppError::NotFound(err.to_string()),
            OdontogramError::InvalidTooth(_)
            | OdontogramError::InvalidSurface(_)
            | OdontogramError::WrongDentition { .. } => AppError::ValidationError(err.to_string()),
            OdontogramError::ValidationError(msg) => AppError::ValidationError(msg),
            OdontogramError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
