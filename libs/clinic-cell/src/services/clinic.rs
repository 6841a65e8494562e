use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{encode, DataApiError, SupabaseClient};
use shared_utils::validation::{is_valid_clinic_code, is_valid_email, normalize_clinic_code, normalize_email};

use crate::models::{
    Clinic, ClinicError, CreateLocationRequest, Location, NewClinic, UpdateClinicRequest,
    UpdateLocationRequest,
};

pub struct ClinicService {
    supabase: SupabaseClient,
}

impl ClinicService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn supabase(&self) -> &SupabaseClient {
        &self.supabase
    }

    pub async fn get_clinic(&self, clinic_id: Uuid, auth_token: &str) -> Result<Clinic, ClinicError> {
        debug!("Fetching clinic {}", clinic_id);

        self.supabase
            .select_one("clinics", &format!("id=eq.{}", clinic_id), auth_token)
            .await?
            .ok_or(ClinicError::NotFound)
    }

    pub async fn find_by_code(&self, code: &str, auth_token: &str) -> Result<Option<Clinic>, ClinicError> {
        let code = normalize_clinic_code(code);
        debug!("Looking up clinic by code {}", code);

        Ok(self.supabase
            .select_one("clinics", &format!("code=eq.{}", encode(&code)), auth_token)
            .await?)
    }

    /// Inserts a clinic after checking the code is free. The unique index on
    /// `code` still backs this up; a 409 from the data API maps the same way.
    pub async fn create_clinic(&self, new_clinic: NewClinic, auth_token: &str) -> Result<Clinic, ClinicError> {
        let code = normalize_clinic_code(&new_clinic.code);
        if !is_valid_clinic_code(&code) {
            return Err(ClinicError::ValidationError(
                "clinic_code must be 3-16 characters of letters, digits or '-'".to_string(),
            ));
        }
        if new_clinic.name.trim().is_empty() {
            return Err(ClinicError::ValidationError("clinic_name is required".to_string()));
        }

        if self.find_by_code(&code, auth_token).await?.is_some() {
            return Err(ClinicError::CodeTaken { code });
        }

        let now = Utc::now().to_rfc3339();
        let clinic_data = json!({
            "name": new_clinic.name.trim(),
            "code": code,
            "phone": new_clinic.phone,
            "email": new_clinic.email.as_deref().map(normalize_email),
            "created_at": now,
            "updated_at": now
        });

        let mut rows: Vec<Clinic> = self.supabase
            .insert("clinics", clinic_data, auth_token)
            .await
            .map_err(|e| {
                if DataApiError::is_conflict(&e) {
                    ClinicError::CodeTaken { code: code.clone() }
                } else {
                    ClinicError::from(e)
                }
            })?;

        if rows.is_empty() {
            return Err(ClinicError::DatabaseError("Failed to create clinic".to_string()));
        }

        let clinic = rows.swap_remove(0);
        info!("Clinic {} registered with code {}", clinic.id, clinic.code);
        Ok(clinic)
    }

    pub async fn update_clinic(
        &self,
        clinic_id: Uuid,
        request: UpdateClinicRequest,
        auth_token: &str,
    ) -> Result<Clinic, ClinicError> {
        debug!("Updating clinic {}", clinic_id);

        let mut update_data = serde_json::Map::new();

        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(ClinicError::ValidationError("name cannot be blank".to_string()));
            }
            update_data.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(email) = request.email {
            let email = normalize_email(&email);
            if !is_valid_email(&email) {
                return Err(ClinicError::ValidationError(format!("Invalid email: {}", email)));
            }
            update_data.insert("email".to_string(), json!(email));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let mut rows: Vec<Clinic> = self.supabase
            .update("clinics", &format!("id=eq.{}", clinic_id), Value::Object(update_data), auth_token)
            .await?;

        if rows.is_empty() {
            return Err(ClinicError::NotFound);
        }
        Ok(rows.swap_remove(0))
    }

    pub async fn list_locations(
        &self,
        clinic_id: Uuid,
        include_inactive: bool,
        auth_token: &str,
    ) -> Result<Vec<Location>, ClinicError> {
        debug!("Listing locations for clinic {} (include_inactive: {})", clinic_id, include_inactive);

        let mut query = format!("clinic_id=eq.{}", clinic_id);
        if !include_inactive {
            query.push_str("&is_active=eq.true");
        }
        query.push_str("&order=name.asc");

        Ok(self.supabase.select("locations", &query, auth_token).await?)
    }

    /// Location lookup scoped to a clinic; foreign locations read as missing.
    pub async fn get_location(
        &self,
        clinic_id: Uuid,
        location_id: Uuid,
        auth_token: &str,
    ) -> Result<Location, ClinicError> {
        self.supabase
            .select_one(
                "locations",
                &format!("id=eq.{}&clinic_id=eq.{}", location_id, clinic_id),
                auth_token,
            )
            .await?
            .ok_or(ClinicError::LocationNotFound)
    }

    pub async fn create_location(
        &self,
        clinic_id: Uuid,
        request: CreateLocationRequest,
        auth_token: &str,
    ) -> Result<Location, ClinicError> {
        if request.name.trim().is_empty() {
            return Err(ClinicError::ValidationError("Location name is required".to_string()));
        }

        let now = Utc::now().to_rfc3339();
        let location_data = json!({
            "clinic_id": clinic_id,
            "name": request.name.trim(),
            "address": request.address,
            "phone": request.phone,
            "is_active": true,
            "created_at": now,
            "updated_at": now
        });

        let mut rows: Vec<Location> = self.supabase
            .insert("locations", location_data, auth_token)
            .await?;

        if rows.is_empty() {
            return Err(ClinicError::DatabaseError("Failed to create location".to_string()));
        }

        let location = rows.swap_remove(0);
        info!("Location {} created for clinic {}", location.id, clinic_id);
        Ok(location)
    }

    /// Hard delete, used only to undo a signup that did not complete.
    pub async fn delete_location(&self, clinic_id: Uuid, location_id: Uuid, auth_token: &str) -> Result<(), ClinicError> {
        self.supabase
            .delete("locations", &format!("id=eq.{}&clinic_id=eq.{}", location_id, clinic_id), auth_token)
            .await?;
        Ok(())
    }

    pub async fn delete_clinic(&self, clinic_id: Uuid, auth_token: &str) -> Result<(), ClinicError> {
        self.supabase
            .delete("clinics", &format!("id=eq.{}", clinic_id), auth_token)
            .await?;
        Ok(())
    }

    pub async fn update_location(
        &self,
        clinic_id: Uuid,
        location_id: Uuid,
        request: UpdateLocationRequest,
        auth_token: &str,
    ) -> Result<Location, ClinicError> {
        let mut update_data = serde_json::Map::new();

        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(ClinicError::ValidationError("Location name cannot be blank".to_string()));
            }
            update_data.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(is_active) = request.is_active {
            update_data.insert("is_active".to_string(), json!(is_active));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let mut rows: Vec<Location> = self.supabase
            .update(
                "locations",
                &format!("id=eq.{}&clinic_id=eq.{}", location_id, clinic_id),
                Value::Object(update_data),
                auth_token,
            )
            .await?;

        if rows.is_empty() {
            return Err(ClinicError::LocationNotFound);
        }
        Ok(rows.swap_remove(0))
    }
}
