use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{StaffRole, User};
use shared_models::specialty::SpecialtyCode;

use crate::jwt::{issue_token, TokenSubject};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_url(supabase_url: &str) -> Self {
        Self {
            supabase_url: supabase_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig::with_data_api(&self.supabase_url, &self.jwt_secret)
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: StaffRole,
    pub clinic_id: Uuid,
    pub location_id: Option<Uuid>,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("staff@example.com", StaffRole::Dentist)
    }
}

impl TestUser {
    pub fn new(email: &str, role: StaffRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
            clinic_id: Uuid::new_v4(),
            location_id: Some(Uuid::new_v4()),
        }
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, StaffRole::Admin)
    }

    pub fn dentist(email: &str) -> Self {
        Self::new(email, StaffRole::Dentist)
    }

    pub fn receptionist(email: &str) -> Self {
        Self::new(email, StaffRole::Receptionist)
    }

    /// Same user, signed in but before choosing a location.
    pub fn without_workspace(mut self) -> Self {
        self.location_id = None;
        self
    }

    pub fn in_clinic(mut self, clinic_id: Uuid) -> Self {
        self.clinic_id = clinic_id;
        self
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.to_string(),
            email: Some(self.email.clone()),
            role: Some(self.role),
            clinic_id: Some(self.clinic_id),
            location_id: self.location_id,
            created_at: Some(Utc::now()),
        }
    }

    pub fn to_subject(&self) -> TokenSubject {
        TokenSubject {
            user_id: self.id,
            email: self.email.clone(),
            role: self.role,
            clinic_id: self.clinic_id,
            location_id: self.location_id,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        issue_token(&user.to_subject(), secret, Duration::hours(exp_hours.unwrap_or(24)))
            .expect("test token should sign")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    /// Token shaped like one from an external issuer: no app metadata.
    pub fn create_token_without_clinic(user_id: &str, secret: &str) -> String {
        let now = Utc::now();
        let header = json!({ "alg": "HS256", "typ": "JWT" });
        let payload = json!({
            "sub": user_id,
            "role": "authenticated",
            "iat": now.timestamp(),
            "exp": (now + Duration::hours(1)).timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature)
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn clinic_response(clinic_id: &Uuid, code: &str) -> serde_json::Value {
        json!({
            "id": clinic_id,
            "name": "Smile Dental",
            "code": code,
            "phone": "+353 1 555 0100",
            "email": "hello@smile.example.com",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn location_response(location_id: &Uuid, clinic_id: &Uuid, name: &str) -> serde_json::Value {
        json!({
            "id": location_id,
            "clinic_id": clinic_id,
            "name": name,
            "address": "1 Main Street",
            "phone": null,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn user_account_response(
        user: &TestUser,
        password_hash: &str,
        failed_login_attempts: u32,
    ) -> serde_json::Value {
        json!({
            "id": user.id,
            "clinic_id": user.clinic_id,
            "email": user.email,
            "full_name": "Test Staff",
            "role": user.role,
            "password_hash": password_hash,
            "failed_login_attempts": failed_login_attempts,
            "locked_until": null,
            "is_active": true,
            "last_login_at": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_response(patient_id: &Uuid, clinic_id: &Uuid) -> serde_json::Value {
        json!({
            "id": patient_id,
            "clinic_id": clinic_id,
            "first_name": "Aoife",
            "last_name": "Byrne",
            "email": "aoife@example.com",
            "phone": "+353 87 123 4567",
            "date_of_birth": "1990-04-12",
            "sex": "female",
            "address": null,
            "allergies": "penicillin",
            "medical_notes": null,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        appointment_id: &Uuid,
        clinic_id: &Uuid,
        patient_id: &Uuid,
        provider_id: Option<&Uuid>,
        starts_at: &str,
        ends_at: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "clinic_id": clinic_id,
            "location_id": Uuid::new_v4(),
            "patient_id": patient_id,
            "provider_id": provider_id,
            "starts_at": starts_at,
            "ends_at": ends_at,
            "status": status,
            "reason": "Check-up",
            "notes": null,
            "specialty_code": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn provider_profile_response(provider_id: &Uuid, user_id: &Uuid, clinic_id: &Uuid) -> serde_json::Value {
        json!({
            "id": provider_id,
            "user_id": user_id,
            "clinic_id": clinic_id,
            "title": "Dr.",
            "license_number": "DC-12345",
            "bio": null,
            "calendar_color": "#4f9dde",
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    /// The full specialty catalogue with stable ids derived from the code.
    pub fn specialty_catalogue_response() -> serde_json::Value {
        let rows: Vec<serde_json::Value> = SpecialtyCode::ALL
            .iter()
            .map(|code| json!({
                "id": Self::specialty_id(*code),
                "code": code,
                "name": code.as_str().replace('_', " ")
            }))
            .collect();
        serde_json::Value::Array(rows)
    }

    pub fn specialty_id(code: SpecialtyCode) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, code.as_str().as_bytes())
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::validate_token;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::dentist("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, StaffRole::Dentist);

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.role, Some(StaffRole::Dentist));
        assert_eq!(user_model.id, user.id.to_string());
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert_eq!(token.split('.').count(), 3);
        assert!(validate_token(&token, secret).is_ok());
    }

    #[test]
    fn test_token_without_clinic_has_no_workspace() {
        let secret = "test-secret";
        let token = JwtTestUtils::create_token_without_clinic("abc", secret);
        let user = validate_token(&token, secret).unwrap();

        assert!(user.clinic_id.is_none());
        assert!(user.role.is_none());
    }
}
