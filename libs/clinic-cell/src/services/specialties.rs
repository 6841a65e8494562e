use std::collections::HashMap;
use std::str::FromStr;

use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::specialty::SpecialtyCode;

use crate::models::{ClinicError, Specialty};

/// Read access to the global specialty catalogue.
pub struct SpecialtyService {
    supabase: SupabaseClient,
}

impl SpecialtyService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_specialties(&self, auth_token: &str) -> Result<Vec<Specialty>, ClinicError> {
        debug!("Listing specialty catalogue");

        Ok(self.supabase.select("specialties", "order=name.asc", auth_token).await?)
    }

    /// Catalogue keyed by row id, for joining link tables.
    pub async fn by_id(&self, auth_token: &str) -> Result<HashMap<Uuid, Specialty>, ClinicError> {
        Ok(self.list_specialties(auth_token)
            .await?
            .into_iter()
            .map(|specialty| (specialty.id, specialty))
            .collect())
    }

    /// Resolves user-supplied codes to catalogue rows. Unknown codes and codes
    /// missing from the catalogue are validation errors; duplicates collapse.
    pub async fn resolve_codes(&self, codes: &[String], auth_token: &str) -> Result<Vec<Specialty>, ClinicError> {
        let mut wanted = Vec::with_capacity(codes.len());
        for code in codes {
            let parsed = SpecialtyCode::from_str(code).map_err(ClinicError::ValidationError)?;
            if !wanted.contains(&parsed) {
                wanted.push(parsed);
            }
        }
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let catalogue = self.list_specialties(auth_token).await?;
        wanted
            .into_iter()
            .map(|code| {
                catalogue
                    .iter()
                    .find(|specialty| specialty.code == code)
                    .cloned()
                    .ok_or_else(|| ClinicError::ValidationError(format!("Unknown specialty: {}", code)))
            })
            .collect()
    }
}

/// Filter for an owner's link rows that point outside `keep`. With nothing to
/// keep it matches every link of the owner.
pub fn stale_links_filter(owner_column: &str, owner_id: Uuid, keep: &[Specialty]) -> String {
    if keep.is_empty() {
        return format!("{}=eq.{}", owner_column, owner_id);
    }
    format!(
        "{}=eq.{}&specialty_id=not.in.({})",
        owner_column,
        owner_id,
        keep.iter().map(|s| s.id.to_string()).collect::<Vec<_>>().join(",")
    )
}
