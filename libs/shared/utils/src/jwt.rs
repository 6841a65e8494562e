use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{AppMetadata, JwtClaims, StaffRole, User};

type HmacSha256 = Hmac<Sha256>;

/// Database role the data API runs signed-in requests as.
pub const AUTHENTICATED_ROLE: &str = "authenticated";

/// Who a token is being issued for.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub email: String,
    pub role: StaffRole,
    pub clinic_id: Uuid,
    pub location_id: Option<Uuid>,
}

fn sign(signing_input: &str, jwt_secret: &str) -> Result<Vec<u8>, String> {
    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(signing_input.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn issue_token(subject: &TokenSubject, jwt_secret: &str, ttl: Duration) -> Result<String, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let now = Utc::now();
    let header = json!({ "alg": "HS256", "typ": "JWT" });
    let claims = json!({
        "sub": subject.user_id,
        "email": subject.email,
        "role": AUTHENTICATED_ROLE,
        "aud": AUTHENTICATED_ROLE,
        "iat": now.timestamp(),
        "exp": (now + ttl).timestamp(),
        "app_metadata": AppMetadata {
            role: Some(subject.role),
            clinic_id: Some(subject.clinic_id),
            location_id: subject.location_id,
        },
    });

    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signing_input = format!("{}.{}", header_b64, claims_b64);
    let signature = sign(&signing_input, jwt_secret)?;

    debug!("Issued token for user {} (location: {:?})", subject.user_id, subject.location_id);
    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
}

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    // Split token into parts
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let signature_string = format!("{}.{}", header_b64, claims_b64);

    let mut mac = match HmacSha256::new_from_slice(jwt_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return Err("Failed to create HMAC".to_string()),
    };

    mac.update(signature_string.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_json = match URL_SAFE_NO_PAD.decode(claims_b64) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(json_str) => json_str,
            Err(_) => return Err("Invalid claims encoding".to_string()),
        },
        Err(_) => return Err("Invalid claims encoding".to_string()),
    };

    let claims: JwtClaims = match serde_json::from_str(&claims_json) {
        Ok(c) => c,
        Err(e) => {
            debug!("Failed to parse claims: {}", e);
            return Err("Invalid claims format".to_string());
        },
    };

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    let created_at = claims.iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let metadata = claims.app_metadata.unwrap_or_default();

    // Staff role lives in app metadata; top-level `role` is the database role,
    // which only names a staff role for tokens minted outside this service.
    let role = metadata.role.or_else(|| {
        claims.role.as_deref().and_then(|r| r.parse::<StaffRole>().ok())
    });

    let user = User {
        id: claims.sub,
        email: claims.email,
        role,
        clinic_id: metadata.clinic_id,
        location_id: metadata.location_id,
        created_at,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}
