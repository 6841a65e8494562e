use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use patient_cell::models::PatientError;
use shared_models::error::AppError;
use shared_models::specialty::SpecialtyCode;

use crate::forms::{in_range, SpecialtyForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Swelling {
    #[default]
    None,
    Localized,
    Diffuse,
}

/// Intake screening shared by every specialty form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Screening {
    pub pain_score: u8,
    pub fever: bool,
    pub temperature_c: Option<f64>,
    pub swelling: Swelling,
    pub difficulty_swallowing: bool,
    pub difficulty_breathing: bool,
    pub trismus: bool,
    pub anticoagulants: bool,
    pub bisphosphonates: bool,
    pub uncontrolled_diabetes: bool,
    pub pregnant: bool,
    pub local_anesthetic_allergy: bool,
    pub systolic_bp: Option<u16>,
    pub diastolic_bp: Option<u16>,
    pub planned_surgery: bool,
}

impl Screening {
    pub fn validate(&self) -> Result<(), String> {
        in_range("pain_score", self.pain_score, 0, 10)?;
        if let Some(temp) = self.temperature_c {
            if !temp.is_finite() {
                return Err("temperature_c must be a number".to_string());
            }
            in_range("temperature_c", temp, 30.0, 45.0)?;
        }
        if let Some(systolic) = self.systolic_bp {
            in_range("systolic_bp", systolic, 50, 300)?;
        }
        if let Some(diastolic) = self.diastolic_bp {
            in_range("diastolic_bp", diastolic, 30, 200)?;
        }
        Ok(())
    }
}

/// Everything the risk rules look at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskInputs {
    #[serde(default)]
    pub screening: Screening,
    pub form: Option<SpecialtyForm>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFlag {
    pub name: String,
    pub severity: Severity,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub flags: Vec<RiskFlag>,
    pub overall: Option<Severity>,
}

impl RiskAssessment {
    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f.name == name)
    }

    pub fn severity_of(&self, name: &str) -> Option<Severity> {
        self.flags.iter().find(|f| f.name == name).map(|f| f.severity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalRecord {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub specialty: SpecialtyCode,
    pub screening: Screening,
    pub form: SpecialtyForm,
    pub risk: RiskAssessment,
    pub overall_severity: Option<Severity>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecordRequest {
    pub patient_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    #[serde(default)]
    pub screening: Screening,
    pub form: SpecialtyForm,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordListQuery {
    pub patient_id: Option<Uuid>,
    pub specialty: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalTerm {
    pub id: Uuid,
    pub specialty: SpecialtyCode,
    pub code: String,
    pub label: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TermQuery {
    pub specialty: Option<String>,
    pub q: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ClinicalError {
    #[error("Clinical record not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Appointment not found for this patient")]
    AppointmentNotFound,

    #[error("Invalid {specialty} form: {message}")]
    InvalidForm { specialty: SpecialtyCode, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for ClinicalError {
    fn from(err: anyhow::Error) -> Self {
        ClinicalError::DatabaseError(err.to_string())
    }
}

impl From<PatientError> for ClinicalError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => ClinicalError::PatientNotFound,
            other => ClinicalError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ClinicalError> for AppError {
    fn from(err: ClinicalError) -> Self {
        match err {
            ClinicalError::NotFound | ClinicalError::PatientNotFound | ClinicalError::AppointmentNotFound => {
                AppError::NotFound(err.to_string())
            }
            ClinicalError::InvalidForm { .. } => AppError::ValidationError(err.to_string()),
            ClinicalError::ValidationError(msg) => AppError::ValidationError(msg),
            ClinicalError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
