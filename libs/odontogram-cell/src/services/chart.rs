use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use patient_cell::services::PatientService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreateFindingRequest, OdontogramError, ToothChart, ToothFinding, ValidFinding};
use crate::tooth::ToothId;

/// Checks the tooth number and that every surface makes sense for both the
/// condition and the tooth. Duplicate surfaces collapse.
pub fn validate_finding(request: &CreateFindingRequest) -> Result<ValidFinding, OdontogramError> {
    let tooth = ToothId::new(request.tooth).map_err(OdontogramError::InvalidTooth)?;
    let surfaces: BTreeSet<_> = request.surfaces.iter().copied().collect();

    if !surfaces.is_empty() && !request.condition.allows_surfaces() {
        return Err(OdontogramError::InvalidSurface(format!(
            "{} is recorded for the whole tooth and takes no surfaces",
            request.condition
        )));
    }

    let kind = tooth.kind();
    if let Some(surface) = surfaces.iter().find(|s| !s.applies_to(kind)) {
        return Err(OdontogramError::InvalidSurface(format!(
            "Surface {:?} does not exist on tooth {}",
            surface, tooth
        )));
    }

    Ok(ValidFinding { tooth, surfaces, condition: request.condition })
}

/// Most recent finding for each tooth, ordered by tooth number.
pub fn latest_per_tooth(findings: Vec<ToothFinding>) -> Vec<ToothFinding> {
    let mut latest: BTreeMap<ToothId, ToothFinding> = BTreeMap::new();
    for finding in findings {
        match latest.get(&finding.tooth) {
            Some(current) if current.recorded_at >= finding.recorded_at => {}
            _ => {
                latest.insert(finding.tooth, finding);
            }
        }
    }
    latest.into_values().collect()
}

pub struct ChartService {
    supabase: SupabaseClient,
    patients: PatientService,
}

impl ChartService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            patients: PatientService::new(config),
        }
    }

    pub async fn chart(&self, clinic_id: Uuid, patient_id: Uuid, auth_token: &str) -> Result<ToothChart, OdontogramError> {
        debug!("Building tooth chart for patient {}", patient_id);
        self.patients.get_patient(clinic_id, patient_id, auth_token).await?;

        let findings: Vec<ToothFinding> = self.supabase
            .select(
                "tooth_findings",
                &format!("clinic_id=eq.{}&patient_id=eq.{}&order=recorded_at.desc", clinic_id, patient_id),
                auth_token,
            )
            .await?;

        Ok(ToothChart {
            patient_id,
            teeth: latest_per_tooth(findings),
        })
    }

    pub async fn record_finding(
        &self,
        clinic_id: Uuid,
        patient_id: Uuid,
        recorded_by: Uuid,
        request: CreateFindingRequest,
        auth_token: &str,
    ) -> Result<ToothFinding, OdontogramError> {
        let finding = validate_finding(&request)?;
        self.patients.get_patient(clinic_id, patient_id, auth_token).await?;

        let finding_data = json!({
            "clinic_id": clinic_id,
            "patient_id": patient_id,
            "tooth": finding.tooth,
            "surfaces": finding.surfaces,
            "condition": finding.condition,
            "notes": request.notes,
            "recorded_by": recorded_by,
            "recorded_at": Utc::now().to_rfc3339()
        });

        let mut rows: Vec<ToothFinding> = self.supabase
            .insert("tooth_findings", finding_data, auth_token)
            .await?;
        if rows.is_empty() {
            return Err(OdontogramError::DatabaseError("Failed to record finding".to_string()));
        }

        let saved = rows.swap_remove(0);
        info!("Recorded {} on tooth {} for patient {}", saved.condition, saved.tooth, patient_id);
        Ok(saved)
    }

    pub async fn history(
        &self,
        clinic_id: Uuid,
        patient_id: Uuid,
        tooth: Option<u8>,
        auth_token: &str,
    ) -> Result<Vec<ToothFinding>, OdontogramError> {
        self.patients.get_patient(clinic_id, patient_id, auth_token).await?;

        let mut query = format!("clinic_id=eq.{}&patient_id=eq.{}", clinic_id, patient_id);
        if let Some(code) = tooth {
            let tooth = ToothId::new(code).map_err(OdontogramError::InvalidTooth)?;
            query.push_str(&format!("&tooth=eq.{}", tooth));
        }
        query.push_str("&order=recorded_at.desc");

        Ok(self.supabase.select("tooth_findings", &query, auth_token).await?)
    }
}
