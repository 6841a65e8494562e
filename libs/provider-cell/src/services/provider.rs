use std::collections::HashMap;
use std::str::FromStr;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use auth_cell::models::{NewUserAccount, StaffProfile, UserAccount};
use auth_cell::services::{AccountService, PasswordService};
use clinic_cell::models::Specialty;
use clinic_cell::services::specialties::{stale_links_filter, SpecialtyService};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::specialty::SpecialtyCode;
use shared_utils::validation::is_valid_hex_color;

use crate::models::{
    CreateProviderRequest, CreatedProvider, Provider, ProviderError, ProviderProfile,
    ProviderSpecialtyLink, UpdateProviderRequest,
};

const TEMPORARY_PASSWORD_LENGTH: usize = 14;

fn id_list(ids: impl IntoIterator<Item = Uuid>) -> String {
    ids.into_iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}

fn check_color(color: Option<&str>) -> Result<(), ProviderError> {
    match color {
        Some(c) if !is_valid_hex_color(c) => Err(ProviderError::InvalidColor(c.to_string())),
        _ => Ok(()),
    }
}

pub struct ProviderService {
    supabase: SupabaseClient,
    accounts: AccountService,
    specialties: SpecialtyService,
}

impl ProviderService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            accounts: AccountService::new(config),
            specialties: SpecialtyService::new(config),
        }
    }

    /// Joins profiles with their accounts and specialty links. Profiles whose
    /// account is missing are dropped.
    async fn assemble(
        &self,
        profiles: Vec<ProviderProfile>,
        auth_token: &str,
    ) -> Result<Vec<Provider>, ProviderError> {
        if profiles.is_empty() {
            return Ok(Vec::new());
        }

        let accounts: Vec<UserAccount> = self.supabase
            .select(
                "users",
                &format!("id=in.({})", id_list(profiles.iter().map(|p| p.user_id))),
                auth_token,
            )
            .await?;
        let accounts: HashMap<Uuid, UserAccount> = accounts.into_iter().map(|a| (a.id, a)).collect();

        let links: Vec<ProviderSpecialtyLink> = self.supabase
            .select(
                "provider_specialties",
                &format!("provider_id=in.({})", id_list(profiles.iter().map(|p| p.id))),
                auth_token,
            )
            .await?;
        let catalogue = self.specialties.by_id(auth_token).await?;

        let mut specialties_by_provider: HashMap<Uuid, Vec<Specialty>> = HashMap::new();
        for link in links {
            if let Some(specialty) = catalogue.get(&link.specialty_id) {
                specialties_by_provider.entry(link.provider_id).or_default().push(specialty.clone());
            }
        }

        Ok(profiles
            .into_iter()
            .filter_map(|profile| {
                let account = accounts.get(&profile.user_id)?;
                let mut specialties = specialties_by_provider.remove(&profile.id).unwrap_or_default();
                specialties.sort_by_key(|s| s.code);
                Some(Provider {
                    full_name: account.full_name.clone(),
                    email: account.email.clone(),
                    role: account.role,
                    specialties,
                    profile,
                })
            })
            .collect())
    }

    /// Replaces the provider's specialty links. New links land before stale
    /// ones are pruned.
    async fn replace_specialties(
        &self,
        provider_id: Uuid,
        specialties: &[Specialty],
        auth_token: &str,
    ) -> Result<(), ProviderError> {
        if !specialties.is_empty() {
            let rows: Vec<Value> = specialties
                .iter()
                .map(|s| json!({ "provider_id": provider_id, "specialty_id": s.id }))
                .collect();
            let _: Vec<Value> = self.supabase
                .upsert("provider_specialties", "provider_id,specialty_id", Value::Array(rows), auth_token)
                .await?;
        }

        self.supabase
            .delete("provider_specialties", &stale_links_filter("provider_id", provider_id, specialties), auth_token)
            .await?;
        Ok(())
    }

    async fn get_profile(&self, clinic_id: Uuid, provider_id: Uuid, auth_token: &str) -> Result<ProviderProfile, ProviderError> {
        self.supabase
            .select_one(
                "provider_profiles",
                &format!("id=eq.{}&clinic_id=eq.{}", provider_id, clinic_id),
                auth_token,
            )
            .await?
            .ok_or(ProviderError::NotFound)
    }

    pub async fn list_providers(
        &self,
        clinic_id: Uuid,
        active_only: bool,
        specialty: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<Provider>, ProviderError> {
        debug!("Listing providers for clinic {} (active_only: {})", clinic_id, active_only);

        let specialty = specialty
            .map(SpecialtyCode::from_str)
            .transpose()
            .map_err(ProviderError::ValidationError)?;

        let mut query = format!("clinic_id=eq.{}", clinic_id);
        if active_only {
            query.push_str("&is_active=eq.true");
        }
        query.push_str("&order=created_at.asc");

        let profiles: Vec<ProviderProfile> = self.supabase.select("provider_profiles", &query, auth_token).await?;
        let mut providers = self.assemble(profiles, auth_token).await?;

        if let Some(code) = specialty {
            providers.retain(|p| p.specialties.iter().any(|s| s.code == code));
        }
        providers.sort_by(|a, b| a.full_name.to_lowercase().cmp(&b.full_name.to_lowercase()));

        Ok(providers)
    }

    pub async fn get_provider(&self, clinic_id: Uuid, provider_id: Uuid, auth_token: &str) -> Result<Provider, ProviderError> {
        let profile = self.get_profile(clinic_id, provider_id, auth_token).await?;

        self.assemble(vec![profile], auth_token)
            .await?
            .pop()
            .ok_or(ProviderError::NotFound)
    }

    /// Creates the staff account, its provider profile and specialty links.
    /// The generated password is returned to the caller exactly once.
    pub async fn create_provider(
        &self,
        clinic_id: Uuid,
        request: CreateProviderRequest,
        auth_token: &str,
    ) -> Result<CreatedProvider, ProviderError> {
        if !request.role.is_provider() {
            return Err(ProviderError::NotAProviderRole(request.role));
        }
        check_color(request.calendar_color.as_deref())?;

        let specialties = self.specialties.resolve_codes(&request.specialties, auth_token).await?;

        let temporary_password = PasswordService::generate_temporary_password(TEMPORARY_PASSWORD_LENGTH);
        let password_hash = PasswordService::hash_password(&temporary_password)
            .map_err(|e| ProviderError::DatabaseError(format!("Failed to hash password: {}", e)))?;

        let profile_data = json!({
            "clinic_id": clinic_id,
            "title": request.title,
            "license_number": request.license_number,
            "bio": request.bio,
            "calendar_color": request.calendar_color,
            "is_active": true
        });

        let account = self.accounts.create_account(
            NewUserAccount {
                clinic_id,
                email: request.email,
                full_name: request.full_name,
                role: request.role,
                password_hash,
            },
            auth_token,
        ).await?;

        let profile = match self.attach_profile(&account, profile_data, &specialties, auth_token).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!("Provider setup for account {} failed, removing the account", account.id);
                if let Err(e) = self.accounts.delete_account(clinic_id, account.id, auth_token).await {
                    error!("Failed to remove account {} of incomplete provider: {}", account.id, e);
                }
                return Err(err);
            }
        };

        info!("Provider {} created for account {}", profile.id, account.id);

        Ok(CreatedProvider {
            provider: Provider {
                full_name: account.full_name,
                email: account.email,
                role: account.role,
                specialties,
                profile,
            },
            temporary_password,
        })
    }

    /// Inserts the profile for a fresh account and links its specialties. The
    /// profile is removed again when linking fails.
    async fn attach_profile(
        &self,
        account: &UserAccount,
        mut profile_data: Value,
        specialties: &[Specialty],
        auth_token: &str,
    ) -> Result<ProviderProfile, ProviderError> {
        let now = Utc::now().to_rfc3339();
        profile_data["user_id"] = json!(account.id);
        profile_data["created_at"] = json!(now);
        profile_data["updated_at"] = json!(now);

        let mut rows: Vec<ProviderProfile> = self.supabase
            .insert("provider_profiles", profile_data, auth_token)
            .await?;
        if rows.is_empty() {
            return Err(ProviderError::DatabaseError("Failed to create provider profile".to_string()));
        }
        let profile = rows.swap_remove(0);

        if let Err(err) = self.replace_specialties(profile.id, specialties, auth_token).await {
            if let Err(e) = self.supabase
                .delete("provider_profiles", &format!("id=eq.{}", profile.id), auth_token)
                .await
            {
                error!("Failed to remove provider profile {}: {}", profile.id, e);
            }
            return Err(err);
        }

        Ok(profile)
    }

    pub async fn update_provider(
        &self,
        clinic_id: Uuid,
        provider_id: Uuid,
        request: UpdateProviderRequest,
        auth_token: &str,
    ) -> Result<Provider, ProviderError> {
        debug!("Updating provider {}", provider_id);
        check_color(request.calendar_color.as_deref())?;

        let profile = self.get_profile(clinic_id, provider_id, auth_token).await?;

        let specialties = match &request.specialties {
            Some(codes) => Some(self.specialties.resolve_codes(codes, auth_token).await?),
            None => None,
        };

        let mut update_data = serde_json::Map::new();
        if let Some(title) = request.title {
            update_data.insert("title".to_string(), json!(title));
        }
        if let Some(license) = request.license_number {
            update_data.insert("license_number".to_string(), json!(license));
        }
        if let Some(bio) = request.bio {
            update_data.insert("bio".to_string(), json!(bio));
        }
        if let Some(color) = request.calendar_color {
            update_data.insert("calendar_color".to_string(), json!(color));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let _: Vec<ProviderProfile> = self.supabase
            .update(
                "provider_profiles",
                &format!("id=eq.{}&clinic_id=eq.{}", provider_id, clinic_id),
                Value::Object(update_data),
                auth_token,
            )
            .await?;

        if request.full_name.is_some() {
            self.accounts
                .update_account(clinic_id, profile.user_id, request.full_name, None, None, auth_token)
                .await?;
        }

        if let Some(specialties) = specialties {
            self.replace_specialties(provider_id, &specialties, auth_token).await?;
        }

        self.get_provider(clinic_id, provider_id, auth_token).await
    }

    /// Soft delete: the profile and its account are deactivated, history stays.
    pub async fn deactivate_provider(&self, clinic_id: Uuid, provider_id: Uuid, auth_token: &str) -> Result<(), ProviderError> {
        let profile = self.get_profile(clinic_id, provider_id, auth_token).await?;

        let _: Vec<ProviderProfile> = self.supabase
            .update(
                "provider_profiles",
                &format!("id=eq.{}&clinic_id=eq.{}", provider_id, clinic_id),
                json!({ "is_active": false, "updated_at": Utc::now().to_rfc3339() }),
                auth_token,
            )
            .await?;

        self.accounts
            .update_account(clinic_id, profile.user_id, None, None, Some(false), auth_token)
            .await?;

        info!("Provider {} deactivated", provider_id);
        Ok(())
    }

    pub async fn list_specialties(&self, auth_token: &str) -> Result<Vec<Specialty>, ProviderError> {
        Ok(self.specialties.list_specialties(auth_token).await?)
    }

    pub async fn list_team(&self, clinic_id: Uuid, auth_token: &str) -> Result<Vec<StaffProfile>, ProviderError> {
        let accounts = self.accounts.list_accounts(clinic_id, auth_token).await?;
        Ok(accounts.iter().map(StaffProfile::from).collect())
    }
}
