use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use patient_cell::services::PatientService;
use shared_config::AppConfig;
use shared_database::supabase::{DataApiError, SupabaseClient};
use shared_models::auth::Workspace;
use shared_models::specialty::SpecialtyCode;

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, AppointmentStatus, CreateAppointmentRequest,
    DashboardSummary, UpdateAppointmentRequest,
};
use crate::services::conflict::{status_list, timestamp, ConflictDetectionService};
use crate::services::lifecycle::{validate_status_transition, validate_window};

pub const DEFAULT_LIST_LIMIT: i64 = 200;
pub const MAX_LIST_LIMIT: i64 = 500;
pub const DASHBOARD_UPCOMING: usize = 10;

/// The appointments table rejects overlapping active windows per provider
/// with an exclusion constraint, which the data API reports as a conflict.
fn slot_error(err: anyhow::Error) -> AppointmentError {
    if DataApiError::is_conflict(&err) {
        AppointmentError::SlotTaken
    } else {
        AppointmentError::from(err)
    }
}

fn parse_specialty(code: Option<&str>) -> Result<Option<SpecialtyCode>, AppointmentError> {
    code.map(SpecialtyCode::from_str)
        .transpose()
        .map_err(AppointmentError::ValidationError)
}

/// Per-status counts with every status present.
pub fn count_by_status(appointments: &[Appointment]) -> BTreeMap<AppointmentStatus, usize> {
    let mut counts: BTreeMap<AppointmentStatus, usize> =
        AppointmentStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for appointment in appointments {
        *counts.entry(appointment.status).or_default() += 1;
    }
    counts
}

pub struct AppointmentService {
    supabase: SupabaseClient,
    patients: PatientService,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            patients: PatientService::new(config),
        }
    }

    async fn ensure_provider(&self, clinic_id: Uuid, provider_id: Uuid, auth_token: &str) -> Result<(), AppointmentError> {
        let profile: Option<Value> = self.supabase
            .select_one(
                "provider_profiles",
                &format!("id=eq.{}&clinic_id=eq.{}&is_active=eq.true", provider_id, clinic_id),
                auth_token,
            )
            .await?;
        profile.map(|_| ()).ok_or(AppointmentError::ProviderNotFound)
    }

    pub async fn create_appointment(
        &self,
        workspace: Workspace,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Booking appointment for patient {} at {}", request.patient_id, request.starts_at);

        validate_window(request.starts_at, request.ends_at)?;
        let specialty = parse_specialty(request.specialty_code.as_deref())?;

        self.patients.get_patient(workspace.clinic_id, request.patient_id, auth_token).await?;

        if let Some(provider_id) = request.provider_id {
            self.ensure_provider(workspace.clinic_id, provider_id, auth_token).await?;
            ConflictDetectionService::new(&self.supabase)
                .ensure_provider_free(workspace.clinic_id, provider_id, request.starts_at, request.ends_at, None, auth_token)
                .await?;
        }

        let now = Utc::now().to_rfc3339();
        let appointment_data = json!({
            "clinic_id": workspace.clinic_id,
            "location_id": workspace.location_id,
            "patient_id": request.patient_id,
            "provider_id": request.provider_id,
            "starts_at": request.starts_at.to_rfc3339(),
            "ends_at": request.ends_at.to_rfc3339(),
            "status": AppointmentStatus::Scheduled,
            "reason": request.reason,
            "notes": request.notes,
            "specialty_code": specialty,
            "created_at": now,
            "updated_at": now
        });

        let mut rows: Vec<Appointment> = self.supabase
            .insert("appointments", appointment_data, auth_token)
            .await
            .map_err(slot_error)?;
        if rows.is_empty() {
            return Err(AppointmentError::DatabaseError("Failed to create appointment".to_string()));
        }

        let appointment = rows.swap_remove(0);
        info!("Appointment {} booked at location {}", appointment.id, workspace.location_id);
        Ok(appointment)
    }

    pub async fn get_appointment(&self, clinic_id: Uuid, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.supabase
            .select_one(
                "appointments",
                &format!("id=eq.{}&clinic_id=eq.{}", appointment_id, clinic_id),
                auth_token,
            )
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn list_appointments(
        &self,
        clinic_id: Uuid,
        default_location: Option<Uuid>,
        query: AppointmentListQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing appointments for clinic {}: {:?}", clinic_id, query);

        let mut query_parts = vec![format!("clinic_id=eq.{}", clinic_id)];

        if let Some(location_id) = query.location_id.or(default_location) {
            query_parts.push(format!("location_id=eq.{}", location_id));
        }
        if let Some(from) = query.from {
            query_parts.push(format!("ends_at=gt.{}", timestamp(from)));
        }
        if let Some(to) = query.to {
            query_parts.push(format!("starts_at=lt.{}", timestamp(to)));
        }
        if let Some(provider_id) = query.provider_id {
            query_parts.push(format!("provider_id=eq.{}", provider_id));
        }
        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }

        let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        query_parts.push(format!("order=starts_at.asc&limit={}", limit));

        Ok(self.supabase.select("appointments", &query_parts.join("&"), auth_token).await?)
    }

    /// Reschedule, reassign or annotate. Time and provider changes re-run
    /// validation and the conflict check against everything but itself.
    pub async fn update_appointment(
        &self,
        clinic_id: Uuid,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(clinic_id, appointment_id, auth_token).await?;
        if current.status.is_terminal() {
            return Err(AppointmentError::Closed(current.status));
        }

        let starts_at = request.starts_at.unwrap_or(current.starts_at);
        let ends_at = request.ends_at.unwrap_or(current.ends_at);
        let provider_id = request.provider_id.unwrap_or(current.provider_id);
        validate_window(starts_at, ends_at)?;

        let rescheduled = starts_at != current.starts_at || ends_at != current.ends_at;
        let reassigned = provider_id != current.provider_id;

        if let Some(provider_id) = provider_id {
            if reassigned {
                self.ensure_provider(clinic_id, provider_id, auth_token).await?;
            }
            if rescheduled || reassigned {
                ConflictDetectionService::new(&self.supabase)
                    .ensure_provider_free(clinic_id, provider_id, starts_at, ends_at, Some(appointment_id), auth_token)
                    .await?;
            }
        }

        let mut update_data = serde_json::Map::new();
        if rescheduled {
            update_data.insert("starts_at".to_string(), json!(starts_at.to_rfc3339()));
            update_data.insert("ends_at".to_string(), json!(ends_at.to_rfc3339()));
        }
        if reassigned {
            update_data.insert("provider_id".to_string(), json!(provider_id));
        }
        if let Some(reason) = request.reason {
            update_data.insert("reason".to_string(), json!(reason));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        if request.specialty_code.is_some() {
            update_data.insert(
                "specialty_code".to_string(),
                json!(parse_specialty(request.specialty_code.as_deref())?),
            );
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let updated = self.patch(clinic_id, appointment_id, Value::Object(update_data), auth_token).await?;
        if rescheduled {
            info!("Appointment {} moved to {} - {}", appointment_id, starts_at, ends_at);
        }
        Ok(updated)
    }

    pub async fn update_status(
        &self,
        clinic_id: Uuid,
        appointment_id: Uuid,
        next: AppointmentStatus,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(clinic_id, appointment_id, auth_token).await?;
        validate_status_transition(current.status, next)?;

        let mut update_data = serde_json::Map::new();
        update_data.insert("status".to_string(), json!(next));
        if let Some(notes) = notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let updated = self.patch(clinic_id, appointment_id, Value::Object(update_data), auth_token).await?;
        info!("Appointment {} status {} -> {}", appointment_id, current.status, next);
        Ok(updated)
    }

    async fn patch(&self, clinic_id: Uuid, appointment_id: Uuid, body: Value, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let mut rows: Vec<Appointment> = self.supabase
            .update(
                "appointments",
                &format!("id=eq.{}&clinic_id=eq.{}", appointment_id, clinic_id),
                body,
                auth_token,
            )
            .await
            .map_err(slot_error)?;
        if rows.is_empty() {
            return Err(AppointmentError::NotFound);
        }
        Ok(rows.swap_remove(0))
    }

    /// Today's per-status counts and the next active appointments for one
    /// location. Days are UTC calendar days.
    pub async fn dashboard(
        &self,
        workspace: Workspace,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<DashboardSummary, AppointmentError> {
        let date: NaiveDate = now.date_naive();
        let day_start = date.and_time(chrono::NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1);

        let today: Vec<Appointment> = self.supabase
            .select(
                "appointments",
                &format!(
                    "clinic_id=eq.{}&location_id=eq.{}&starts_at=gte.{}&starts_at=lt.{}&order=starts_at.asc",
                    workspace.clinic_id,
                    workspace.location_id,
                    timestamp(day_start),
                    timestamp(day_end),
                ),
                auth_token,
            )
            .await?;

        let upcoming: Vec<Appointment> = self.supabase
            .select(
                "appointments",
                &format!(
                    "clinic_id=eq.{}&location_id=eq.{}&starts_at=gte.{}&status=in.({})&order=starts_at.asc&limit={}",
                    workspace.clinic_id,
                    workspace.location_id,
                    timestamp(now),
                    status_list(&AppointmentStatus::ACTIVE),
                    DASHBOARD_UPCOMING,
                ),
                auth_token,
            )
            .await?;

        Ok(DashboardSummary {
            date,
            location_id: workspace.location_id,
            total: today.len(),
            counts: count_by_status(&today),
            upcoming,
        })
    }
}
