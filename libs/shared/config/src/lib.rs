use std::env;
use std::str::FromStr;
use tracing::warn;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_FAILED_LOGINS: u32 = 5;
const DEFAULT_LOCKOUT_MINUTES: i64 = 15;
const DEFAULT_TOKEN_TTL_HOURS: i64 = 12;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub port: u16,
    pub max_failed_logins: u32,
    pub lockout_minutes: i64,
    pub token_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            port: parse_or_default("PORT", DEFAULT_PORT),
            max_failed_logins: parse_or_default("AUTH_MAX_FAILED_LOGINS", DEFAULT_MAX_FAILED_LOGINS),
            lockout_minutes: parse_or_default("AUTH_LOCKOUT_MINUTES", DEFAULT_LOCKOUT_MINUTES),
            token_ttl_hours: parse_or_default("AUTH_TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    /// Config pointing at a given data API, with auth defaults. Used by tests
    /// and local tooling that don't read the environment.
    pub fn with_data_api(supabase_url: &str, jwt_secret: &str) -> Self {
        Self {
            supabase_url: supabase_url.to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            supabase_jwt_secret: jwt_secret.to_string(),
            port: DEFAULT_PORT,
            max_failed_logins: DEFAULT_MAX_FAILED_LOGINS,
            lockout_minutes: DEFAULT_LOCKOUT_MINUTES,
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_service_role_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
