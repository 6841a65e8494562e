use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{encode, DataApiError, SupabaseClient};
use shared_models::auth::StaffRole;
use shared_utils::validation::{is_valid_email, normalize_email};

use crate::models::{AuthError, NewUserAccount, UserAccount};
use crate::services::lockout::LoginDecision;

/// Data access for the `users` table.
pub struct AccountService {
    supabase: SupabaseClient,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn supabase(&self) -> &SupabaseClient {
        &self.supabase
    }

    pub async fn find_by_email(
        &self,
        clinic_id: Uuid,
        email: &str,
        auth_token: &str,
    ) -> Result<Option<UserAccount>, AuthError> {
        let email = normalize_email(email);
        debug!("Looking up account {} in clinic {}", email, clinic_id);

        Ok(self.supabase
            .select_one(
                "users",
                &format!("clinic_id=eq.{}&email=eq.{}", clinic_id, encode(&email)),
                auth_token,
            )
            .await?)
    }

    pub async fn get_account(
        &self,
        clinic_id: Uuid,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<UserAccount, AuthError> {
        self.supabase
            .select_one("users", &format!("id=eq.{}&clinic_id=eq.{}", user_id, clinic_id), auth_token)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    pub async fn list_accounts(&self, clinic_id: Uuid, auth_token: &str) -> Result<Vec<UserAccount>, AuthError> {
        Ok(self.supabase
            .select("users", &format!("clinic_id=eq.{}&order=full_name.asc", clinic_id), auth_token)
            .await?)
    }

    /// Inserts a staff account. Email is unique per clinic, not globally.
    pub async fn create_account(&self, new_account: NewUserAccount, auth_token: &str) -> Result<UserAccount, AuthError> {
        let email = normalize_email(&new_account.email);
        if !is_valid_email(&email) {
            return Err(AuthError::ValidationError(format!("Invalid email: {}", email)));
        }
        if new_account.full_name.trim().is_empty() {
            return Err(AuthError::ValidationError("full_name is required".to_string()));
        }

        if self.find_by_email(new_account.clinic_id, &email, auth_token).await?.is_some() {
            return Err(AuthError::EmailTaken { email });
        }

        let now = Utc::now().to_rfc3339();
        let user_data = json!({
            "clinic_id": new_account.clinic_id,
            "email": email,
            "full_name": new_account.full_name.trim(),
            "role": new_account.role,
            "password_hash": new_account.password_hash,
            "failed_login_attempts": 0,
            "locked_until": null,
            "is_active": true,
            "created_at": now,
            "updated_at": now
        });

        let mut rows: Vec<UserAccount> = self.supabase
            .insert("users", user_data, auth_token)
            .await
            .map_err(|e| {
                if DataApiError::is_conflict(&e) {
                    AuthError::EmailTaken { email: email.clone() }
                } else {
                    AuthError::from(e)
                }
            })?;

        if rows.is_empty() {
            return Err(AuthError::DatabaseError("Failed to create staff account".to_string()));
        }

        let account = rows.swap_remove(0);
        info!("Staff account {} created with role {}", account.id, account.role);
        Ok(account)
    }

    pub async fn update_account(
        &self,
        clinic_id: Uuid,
        user_id: Uuid,
        full_name: Option<String>,
        role: Option<StaffRole>,
        is_active: Option<bool>,
        auth_token: &str,
    ) -> Result<UserAccount, AuthError> {
        let mut update_data = serde_json::Map::new();

        if let Some(name) = full_name {
            if name.trim().is_empty() {
                return Err(AuthError::ValidationError("full_name cannot be blank".to_string()));
            }
            update_data.insert("full_name".to_string(), json!(name.trim()));
        }
        if let Some(role) = role {
            update_data.insert("role".to_string(), json!(role));
        }
        if let Some(active) = is_active {
            update_data.insert("is_active".to_string(), json!(active));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let mut rows: Vec<UserAccount> = self.supabase
            .update(
                "users",
                &format!("id=eq.{}&clinic_id=eq.{}", user_id, clinic_id),
                Value::Object(update_data),
                auth_token,
            )
            .await?;

        if rows.is_empty() {
            return Err(AuthError::AccountNotFound);
        }
        Ok(rows.swap_remove(0))
    }

    /// Removes an account that never got past creation.
    pub async fn delete_account(&self, clinic_id: Uuid, user_id: Uuid, auth_token: &str) -> Result<(), AuthError> {
        self.supabase
            .delete("users", &format!("id=eq.{}&clinic_id=eq.{}", user_id, clinic_id), auth_token)
            .await?;
        Ok(())
    }

    /// Persists the counter/lock changes a login decision implies.
    pub async fn record_login_outcome(
        &self,
        account: &UserAccount,
        decision: &LoginDecision,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<(), AuthError> {
        let update = match decision {
            LoginDecision::Success => json!({
                "failed_login_attempts": 0,
                "locked_until": null,
                "last_login_at": now.to_rfc3339(),
                "updated_at": now.to_rfc3339()
            }),
            LoginDecision::Rejected { failed_attempts, locked_until } => {
                if let Some(until) = locked_until {
                    warn!("Account {} locked until {} after {} failed logins", account.id, until, failed_attempts);
                }
                json!({
                    "failed_login_attempts": failed_attempts,
                    "locked_until": locked_until.map(|t| t.to_rfc3339()),
                    "updated_at": now.to_rfc3339()
                })
            }
            LoginDecision::Locked { .. } | LoginDecision::Inactive => return Ok(()),
        };

        let _: Vec<Value> = self.supabase
            .update("users", &format!("id=eq.{}", account.id), update, auth_token)
            .await?;
        Ok(())
    }
}
