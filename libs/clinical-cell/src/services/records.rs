use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use patient_cell::services::PatientService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::specialty::SpecialtyCode;

use crate::models::{ClinicalError, ClinicalRecord, CreateRecordRequest, RecordListQuery, RiskAssessment, RiskInputs, Severity};
use crate::services::risk::assess_risk;

pub const DEFAULT_RECORD_LIMIT: i64 = 50;
pub const MAX_RECORD_LIMIT: i64 = 200;

/// Checks screening and form ranges and computes the risk assessment.
pub fn evaluate(request: &CreateRecordRequest) -> Result<RiskAssessment, ClinicalError> {
    request.screening.validate().map_err(ClinicalError::ValidationError)?;
    request.form.validate().map_err(|message| ClinicalError::InvalidForm {
        specialty: request.form.specialty(),
        message,
    })?;

    Ok(assess_risk(&RiskInputs {
        screening: request.screening.clone(),
        form: Some(request.form.clone()),
    }))
}

pub struct RecordService {
    supabase: SupabaseClient,
    patients: PatientService,
}

impl RecordService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            patients: PatientService::new(config),
        }
    }

    async fn ensure_appointment(
        &self,
        clinic_id: Uuid,
        patient_id: Uuid,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ClinicalError> {
        let appointment: Option<Value> = self.supabase
            .select_one(
                "appointments",
                &format!("id=eq.{}&clinic_id=eq.{}&patient_id=eq.{}", appointment_id, clinic_id, patient_id),
                auth_token,
            )
            .await?;
        appointment.map(|_| ()).ok_or(ClinicalError::AppointmentNotFound)
    }

    pub async fn create_record(
        &self,
        clinic_id: Uuid,
        request: CreateRecordRequest,
        auth_token: &str,
    ) -> Result<ClinicalRecord, ClinicalError> {
        let specialty = request.form.specialty();
        debug!("Recording {} form for patient {}", specialty, request.patient_id);

        let risk = evaluate(&request)?;

        self.patients.get_patient(clinic_id, request.patient_id, auth_token).await?;
        if let Some(appointment_id) = request.appointment_id {
            self.ensure_appointment(clinic_id, request.patient_id, appointment_id, auth_token).await?;
        }

        let record_data = json!({
            "clinic_id": clinic_id,
            "patient_id": request.patient_id,
            "provider_id": request.provider_id,
            "appointment_id": request.appointment_id,
            "specialty": specialty,
            "screening": request.screening,
            "form": request.form,
            "risk": risk,
            "overall_severity": risk.overall,
            "created_at": Utc::now().to_rfc3339()
        });

        let mut rows: Vec<ClinicalRecord> = self.supabase
            .insert("clinical_records", record_data, auth_token)
            .await?;
        if rows.is_empty() {
            return Err(ClinicalError::DatabaseError("Failed to save clinical record".to_string()));
        }

        let record = rows.swap_remove(0);
        if matches!(record.overall_severity, Some(Severity::High | Severity::Critical)) {
            warn!(
                "Clinical record {} for patient {} flagged {}",
                record.id,
                record.patient_id,
                record.overall_severity.map(|s| s.as_str()).unwrap_or_default()
            );
        }
        info!("Clinical record {} ({}) saved", record.id, specialty);
        Ok(record)
    }

    pub async fn get_record(&self, clinic_id: Uuid, record_id: Uuid, auth_token: &str) -> Result<ClinicalRecord, ClinicalError> {
        self.supabase
            .select_one(
                "clinical_records",
                &format!("id=eq.{}&clinic_id=eq.{}", record_id, clinic_id),
                auth_token,
            )
            .await?
            .ok_or(ClinicalError::NotFound)
    }

    pub async fn list_records(
        &self,
        clinic_id: Uuid,
        query: RecordListQuery,
        auth_token: &str,
    ) -> Result<Vec<ClinicalRecord>, ClinicalError> {
        debug!("Listing clinical records for clinic {}: {:?}", clinic_id, query);

        let mut query_parts = vec![format!("clinic_id=eq.{}", clinic_id)];
        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(code) = query.specialty.as_deref() {
            let specialty: SpecialtyCode = code.parse().map_err(ClinicalError::ValidationError)?;
            query_parts.push(format!("specialty=eq.{}", specialty));
        }

        let limit = query.limit.unwrap_or(DEFAULT_RECORD_LIMIT).clamp(1, MAX_RECORD_LIMIT);
        query_parts.push(format!("order=created_at.desc&limit={}", limit));

        Ok(self.supabase.select("clinical_records", &query_parts.join("&"), auth_token).await?)
    }
}
