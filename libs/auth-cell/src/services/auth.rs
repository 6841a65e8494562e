use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use clinic_cell::models::{Clinic, CreateLocationRequest, Location, NewClinic};
use clinic_cell::services::ClinicService;
use shared_config::AppConfig;
use shared_models::auth::{StaffRole, Workspace};
use shared_utils::jwt::{issue_token, TokenSubject};
use shared_utils::validation::{is_valid_email, normalize_email, require_non_blank};

use crate::models::{
    AuthError, AuthSession, LoginRequest, NewUserAccount, SignupRequest, StaffProfile, UserAccount,
};
use crate::services::accounts::AccountService;
use crate::services::lockout::{evaluate_login, LoginDecision, LoginPolicy};
use crate::services::password::PasswordService;

fn required(field: &str, value: &str) -> Result<String, AuthError> {
    require_non_blank(field, Some(value)).map_err(AuthError::ValidationError)
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentSession {
    pub user: StaffProfile,
    pub clinic: Clinic,
    pub location: Option<Location>,
}

pub struct AuthService {
    accounts: AccountService,
    clinics: ClinicService,
    jwt_secret: String,
    token_ttl: Duration,
    policy: LoginPolicy,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            accounts: AccountService::new(config),
            clinics: ClinicService::new(config),
            jwt_secret: config.supabase_jwt_secret.clone(),
            token_ttl: Duration::hours(config.token_ttl_hours.max(1)),
            policy: LoginPolicy::from_config(config),
        }
    }

    fn service_token(&self) -> String {
        self.accounts.supabase().service_token().to_string()
    }

    fn build_session(
        &self,
        account: &UserAccount,
        clinic: Clinic,
        locations: Vec<Location>,
        location_id: Option<Uuid>,
    ) -> Result<AuthSession, AuthError> {
        let subject = TokenSubject {
            user_id: account.id,
            email: account.email.clone(),
            role: account.role,
            clinic_id: clinic.id,
            location_id,
        };
        let access_token = issue_token(&subject, &self.jwt_secret, self.token_ttl)
            .map_err(AuthError::Token)?;

        Ok(AuthSession {
            access_token,
            token_type: "bearer",
            expires_in: self.token_ttl.num_seconds(),
            user: StaffProfile::from(account),
            workspace: location_id.map(|location_id| Workspace { clinic_id: clinic.id, location_id }),
            requires_workspace_selection: location_id.is_none(),
            clinic,
            locations,
        })
    }

    /// Registers a clinic with its first location and an admin account.
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthSession, AuthError> {
        let clinic_name = required("clinic_name", &request.clinic_name)?;
        let location_name = required("location_name", &request.location_name)?;
        let full_name = required("full_name", &request.full_name)?;

        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(AuthError::ValidationError(format!("Invalid email: {}", email)));
        }
        PasswordService::check_policy(&request.password).map_err(AuthError::WeakPassword)?;

        let password_hash = PasswordService::hash_password(&request.password)
            .map_err(|e| AuthError::DatabaseError(format!("Failed to hash password: {}", e)))?;

        debug!("Signing up clinic {} for {}", request.clinic_code, email);
        let token = self.service_token();

        let clinic = self.clinics.create_clinic(
            NewClinic {
                name: clinic_name,
                code: request.clinic_code,
                phone: request.clinic_phone,
                email: Some(email.clone()),
            },
            &token,
        ).await?;

        let location = match self.clinics.create_location(
            clinic.id,
            CreateLocationRequest {
                name: location_name,
                address: request.location_address,
                phone: None,
            },
            &token,
        ).await {
            Ok(location) => location,
            Err(err) => {
                self.undo_signup(clinic.id, None, &token).await;
                return Err(err.into());
            }
        };

        let account = match self.accounts.create_account(
            NewUserAccount {
                clinic_id: clinic.id,
                email,
                full_name,
                role: StaffRole::Admin,
                password_hash,
            },
            &token,
        ).await {
            Ok(account) => account,
            Err(err) => {
                self.undo_signup(clinic.id, Some(location.id), &token).await;
                return Err(err);
            }
        };

        info!("Clinic {} signed up with admin {}", clinic.code, account.id);
        let location_id = location.id;
        self.build_session(&account, clinic, vec![location], Some(location_id))
    }

    /// Removes the clinic (and its first location) of a signup that failed
    /// part way, so the clinic code can be registered again.
    async fn undo_signup(&self, clinic_id: Uuid, location_id: Option<Uuid>, token: &str) {
        warn!("Signup for clinic {} did not complete, removing its rows", clinic_id);
        if let Some(location_id) = location_id {
            if let Err(e) = self.clinics.delete_location(clinic_id, location_id, token).await {
                error!("Failed to remove location {} of incomplete signup: {}", location_id, e);
            }
        }
        if let Err(e) = self.clinics.delete_clinic(clinic_id, token).await {
            error!("Failed to remove clinic {} of incomplete signup: {}", clinic_id, e);
        }
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession, AuthError> {
        if request.clinic_code.trim().is_empty() || request.email.trim().is_empty() || request.password.is_empty() {
            return Err(AuthError::ValidationError(
                "clinic_code, email and password are required".to_string(),
            ));
        }

        let token = self.service_token();

        let Some(clinic) = self.clinics.find_by_code(&request.clinic_code, &token).await? else {
            warn!("Login attempt for unknown clinic code {}", request.clinic_code);
            return Err(AuthError::InvalidCredentials);
        };

        let Some(account) = self.accounts.find_by_email(clinic.id, &request.email, &token).await? else {
            warn!("Login attempt for unknown account in clinic {}", clinic.code);
            return Err(AuthError::InvalidCredentials);
        };

        let password_ok = PasswordService::verify_password(&request.password, &account.password_hash)
            .unwrap_or_else(|e| {
                error!("Stored password hash for account {} is unreadable: {}", account.id, e);
                false
            });

        let now = Utc::now();
        let decision = evaluate_login(&account, password_ok, now, &self.policy);
        self.accounts.record_login_outcome(&account, &decision, now, &token).await?;

        match decision {
            LoginDecision::Success => {
                let locations = self.clinics.list_locations(clinic.id, false, &token).await?;
                info!("Account {} signed in to clinic {}", account.id, clinic.code);
                // The location is bound later through select-workspace.
                self.build_session(&account, clinic, locations, None)
            }
            LoginDecision::Rejected { locked_until: Some(until), .. } => Err(AuthError::AccountLocked { until }),
            LoginDecision::Rejected { failed_attempts, locked_until: None } => {
                warn!("Wrong password for account {} ({} consecutive failures)", account.id, failed_attempts);
                Err(AuthError::InvalidCredentials)
            }
            LoginDecision::Locked { until } => Err(AuthError::AccountLocked { until }),
            LoginDecision::Inactive => Err(AuthError::AccountInactive),
        }
    }

    /// Re-issues the caller's token bound to one of the clinic's locations.
    pub async fn select_workspace(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
        location_id: Uuid,
        auth_token: &str,
    ) -> Result<AuthSession, AuthError> {
        debug!("User {} selecting location {}", user_id, location_id);

        let account = self.accounts.get_account(clinic_id, user_id, auth_token).await?;
        if !account.is_active {
            return Err(AuthError::AccountInactive);
        }

        let location = self.clinics.get_location(clinic_id, location_id, auth_token).await?;
        if !location.is_active {
            return Err(AuthError::LocationInactive);
        }

        let clinic = self.clinics.get_clinic(clinic_id, auth_token).await?;
        let locations = self.clinics.list_locations(clinic_id, false, auth_token).await?;

        info!("User {} switched workspace to location {}", user_id, location_id);
        self.build_session(&account, clinic, locations, Some(location.id))
    }

    pub async fn current_session(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
        location_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<CurrentSession, AuthError> {
        let account = self.accounts.get_account(clinic_id, user_id, auth_token).await?;
        let clinic = self.clinics.get_clinic(clinic_id, auth_token).await?;
        let location = match location_id {
            Some(id) => Some(self.clinics.get_location(clinic_id, id, auth_token).await?),
            None => None,
        };

        Ok(CurrentSession {
            user: StaffProfile::from(&account),
            clinic,
            location,
        })
    }
}
