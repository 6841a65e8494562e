use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use clinic_cell::services::specialties::{stale_links_filter, SpecialtyService};
use shared_config::AppConfig;
use shared_database::supabase::{encode, DataApiError, SupabaseClient};
use shared_models::specialty::SpecialtyCode;
use shared_utils::validation::search_term;

use crate::models::{
    CreatePatientRequest, Patient, PatientError, PatientSearchQuery, PatientSpecialty,
    PatientSpecialtyInput, PatientSpecialtyLink, UpdatePatientRequest,
};
use crate::services::validation::{
    check_email, check_phone, check_primary_specialties, parse_date_of_birth, parse_sex, validate_new_patient,
};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

pub struct PatientService {
    supabase: SupabaseClient,
    specialties: SpecialtyService,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            specialties: SpecialtyService::new(config),
        }
    }

    async fn email_in_use(
        &self,
        clinic_id: Uuid,
        email: &str,
        except: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, PatientError> {
        let mut query = format!("clinic_id=eq.{}&email=eq.{}", clinic_id, encode(email));
        if let Some(id) = except {
            query.push_str(&format!("&id=neq.{}", id));
        }
        let existing: Option<Value> = self.supabase.select_one("patients", &query, auth_token).await?;
        Ok(existing.is_some())
    }

    pub async fn create_patient(
        &self,
        clinic_id: Uuid,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let patient = validate_new_patient(request, Utc::now().date_naive())?;
        debug!("Registering patient {} {} in clinic {}", patient.first_name, patient.last_name, clinic_id);

        if let Some(email) = &patient.email {
            if self.email_in_use(clinic_id, email, None, auth_token).await? {
                return Err(PatientError::EmailAlreadyExists { email: email.clone() });
            }
        }

        let now = Utc::now().to_rfc3339();
        let patient_data = json!({
            "clinic_id": clinic_id,
            "first_name": patient.first_name,
            "last_name": patient.last_name,
            "email": patient.email,
            "phone": patient.phone,
            "date_of_birth": patient.date_of_birth.format("%Y-%m-%d").to_string(),
            "sex": patient.sex,
            "address": patient.address,
            "allergies": patient.allergies,
            "medical_notes": patient.medical_notes,
            "is_active": true,
            "created_at": now,
            "updated_at": now
        });

        let mut rows: Vec<Patient> = self.supabase
            .insert("patients", patient_data, auth_token)
            .await
            .map_err(|e| {
                if DataApiError::is_conflict(&e) {
                    PatientError::EmailAlreadyExists { email: patient.email.clone().unwrap_or_default() }
                } else {
                    PatientError::from(e)
                }
            })?;

        if rows.is_empty() {
            return Err(PatientError::DatabaseError("Failed to create patient".to_string()));
        }

        let created = rows.swap_remove(0);
        info!("Patient {} registered in clinic {}", created.id, clinic_id);
        Ok(created)
    }

    /// Clinic-scoped lookup; a patient of another clinic reads as missing.
    pub async fn get_patient(&self, clinic_id: Uuid, patient_id: Uuid, auth_token: &str) -> Result<Patient, PatientError> {
        debug!("Fetching patient {}", patient_id);

        self.supabase
            .select_one("patients", &format!("id=eq.{}&clinic_id=eq.{}", patient_id, clinic_id), auth_token)
            .await?
            .ok_or(PatientError::NotFound)
    }

    pub async fn update_patient(
        &self,
        clinic_id: Uuid,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient {}", patient_id);

        let mut update_data = serde_json::Map::new();

        for (field, value) in [("first_name", &request.first_name), ("last_name", &request.last_name)] {
            if let Some(v) = value {
                if v.trim().is_empty() {
                    return Err(PatientError::ValidationError(format!("{} cannot be blank", field)));
                }
                update_data.insert(field.to_string(), json!(v.trim()));
            }
        }
        if let Some(phone) = &request.phone {
            check_phone(phone)?;
            update_data.insert("phone".to_string(), json!(phone.trim()));
        }
        if let Some(dob) = &request.date_of_birth {
            let date = parse_date_of_birth(dob, Utc::now().date_naive())?;
            update_data.insert("date_of_birth".to_string(), json!(date.format("%Y-%m-%d").to_string()));
        }
        if let Some(sex) = &request.sex {
            update_data.insert("sex".to_string(), json!(parse_sex(sex)?));
        }
        if request.email.is_some() {
            let email = check_email(request.email)?;
            if let Some(email) = &email {
                if self.email_in_use(clinic_id, email, Some(patient_id), auth_token).await? {
                    return Err(PatientError::EmailAlreadyExists { email: email.clone() });
                }
            }
            update_data.insert("email".to_string(), json!(email));
        }
        for (field, value) in [
            ("address", request.address),
            ("allergies", request.allergies),
            ("medical_notes", request.medical_notes),
        ] {
            if let Some(v) = value {
                let v = v.trim().to_string();
                update_data.insert(field.to_string(), if v.is_empty() { Value::Null } else { json!(v) });
            }
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let mut rows: Vec<Patient> = self.supabase
            .update(
                "patients",
                &format!("id=eq.{}&clinic_id=eq.{}", patient_id, clinic_id),
                Value::Object(update_data),
                auth_token,
            )
            .await?;

        if rows.is_empty() {
            return Err(PatientError::NotFound);
        }
        Ok(rows.swap_remove(0))
    }

    /// Archives instead of deleting; clinical history keeps its patient.
    pub async fn archive_patient(&self, clinic_id: Uuid, patient_id: Uuid, auth_token: &str) -> Result<Patient, PatientError> {
        let mut rows: Vec<Patient> = self.supabase
            .update(
                "patients",
                &format!("id=eq.{}&clinic_id=eq.{}", patient_id, clinic_id),
                json!({ "is_active": false, "updated_at": Utc::now().to_rfc3339() }),
                auth_token,
            )
            .await?;

        if rows.is_empty() {
            return Err(PatientError::NotFound);
        }
        info!("Patient {} archived", patient_id);
        Ok(rows.swap_remove(0))
    }

    pub async fn search_patients(
        &self,
        clinic_id: Uuid,
        query: PatientSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Patient>, PatientError> {
        debug!("Searching patients in clinic {}: {:?}", clinic_id, query);

        let mut query_parts = vec![format!("clinic_id=eq.{}", clinic_id)];

        if !query.include_archived.unwrap_or(false) {
            query_parts.push("is_active=eq.true".to_string());
        }
        if let Some(name) = query.name.as_deref().map(search_term).filter(|n| !n.is_empty()) {
            let term = encode(&name);
            query_parts.push(format!("or=(first_name.ilike.*{}*,last_name.ilike.*{}*)", term, term));
        }
        if let Some(email) = query.email.as_deref().map(search_term).filter(|e| !e.is_empty()) {
            query_parts.push(format!("email=ilike.*{}*", encode(&email)));
        }
        if let Some(phone) = query.phone.as_deref().map(search_term).filter(|p| !p.is_empty()) {
            query_parts.push(format!("phone=ilike.*{}*", encode(&phone)));
        }
        if let Some(code) = query.specialty.as_deref() {
            let code: SpecialtyCode = code.parse().map_err(PatientError::ValidationError)?;
            let resolved = self.specialties.resolve_codes(&[code.to_string()], auth_token).await?;
            let Some(specialty) = resolved.first() else {
                return Ok(Vec::new());
            };
            // Inner embed keeps only patients that carry the link.
            query_parts.push("select=*,patient_specialties!inner(specialty_id)".to_string());
            query_parts.push(format!("patient_specialties.specialty_id=eq.{}", specialty.id));
        }

        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = query.offset.unwrap_or(0).max(0);
        query_parts.push("order=last_name.asc,first_name.asc".to_string());
        query_parts.push(format!("limit={}&offset={}", limit, offset));

        Ok(self.supabase.select("patients", &query_parts.join("&"), auth_token).await?)
    }

    pub async fn get_specialties(
        &self,
        clinic_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<PatientSpecialty>, PatientError> {
        self.get_patient(clinic_id, patient_id, auth_token).await?;

        let links: Vec<PatientSpecialtyLink> = self.supabase
            .select("patient_specialties", &format!("patient_id=eq.{}", patient_id), auth_token)
            .await?;
        let catalogue = self.specialties.by_id(auth_token).await?;

        let mut specialties: Vec<PatientSpecialty> = links
            .into_iter()
            .filter_map(|link| {
                catalogue.get(&link.specialty_id).map(|specialty| PatientSpecialty {
                    specialty: specialty.clone(),
                    is_primary: link.is_primary,
                })
            })
            .collect();
        specialties.sort_by(|a, b| b.is_primary.cmp(&a.is_primary).then(a.specialty.code.cmp(&b.specialty.code)));

        Ok(specialties)
    }

    /// Replaces the patient's specialty set. At most one may be primary.
    pub async fn set_specialties(
        &self,
        clinic_id: Uuid,
        patient_id: Uuid,
        inputs: Vec<PatientSpecialtyInput>,
        auth_token: &str,
    ) -> Result<Vec<PatientSpecialty>, PatientError> {
        check_primary_specialties(&inputs)?;
        self.get_patient(clinic_id, patient_id, auth_token).await?;

        let codes: Vec<String> = inputs.iter().map(|i| i.code.clone()).collect();
        let resolved = self.specialties.resolve_codes(&codes, auth_token).await?;

        let rows: Vec<Value> = resolved
            .iter()
            .map(|specialty| {
                let is_primary = inputs.iter().any(|input| {
                    input.is_primary
                        && input.code.parse::<SpecialtyCode>().map(|c| c == specialty.code).unwrap_or(false)
                });
                json!({
                    "patient_id": patient_id,
                    "specialty_id": specialty.id,
                    "is_primary": is_primary
                })
            })
            .collect();

        // New links land before stale ones are pruned.
        if !rows.is_empty() {
            let _: Vec<Value> = self.supabase
                .upsert("patient_specialties", "patient_id,specialty_id", Value::Array(rows), auth_token)
                .await?;
        }
        self.supabase
            .delete("patient_specialties", &stale_links_filter("patient_id", patient_id, &resolved), auth_token)
            .await?;

        info!("Patient {} specialties replaced ({} entries)", patient_id, resolved.len());
        self.get_specialties(clinic_id, patient_id, auth_token).await
    }
}
