//! Failed-login counting and temporary account lockout.
//!
//! The decision is pure: callers load the account, verify the password, and
//! persist whatever the returned [`LoginDecision`] says.

use chrono::{DateTime, Duration, Utc};

use shared_config::AppConfig;

use crate::models::UserAccount;

#[derive(Debug, Clone, Copy)]
pub struct LoginPolicy {
    pub max_failed_attempts: u32,
    pub lockout: Duration,
}

impl LoginPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_failed_attempts: config.max_failed_logins.max(1),
            lockout: Duration::minutes(config.lockout_minutes.max(1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginDecision {
    /// Password accepted; counter and lock are cleared.
    Success,
    /// Wrong password. `locked_until` is set when this attempt hit the limit.
    Rejected {
        failed_attempts: u32,
        locked_until: Option<DateTime<Utc>>,
    },
    /// Account is still inside a lockout window; nothing changes.
    Locked { until: DateTime<Utc> },
    Inactive,
}

pub fn evaluate_login(
    account: &UserAccount,
    password_ok: bool,
    now: DateTime<Utc>,
    policy: &LoginPolicy,
) -> LoginDecision {
    if !account.is_active {
        return LoginDecision::Inactive;
    }

    if let Some(until) = account.locked_until {
        if until > now {
            return LoginDecision::Locked { until };
        }
    }

    if password_ok {
        return LoginDecision::Success;
    }

    // An expired lock starts a fresh window.
    let previous = match account.locked_until {
        Some(until) if until <= now => 0,
        _ => account.failed_login_attempts,
    };
    let failed_attempts = previous.saturating_add(1);

    let locked_until = if failed_attempts >= policy.max_failed_attempts {
        Some(now + policy.lockout)
    } else {
        None
    };

    LoginDecision::Rejected { failed_attempts, locked_until }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::auth::StaffRole;
    use uuid::Uuid;

    fn policy() -> LoginPolicy {
        LoginPolicy { max_failed_attempts: 3, lockout: Duration::minutes(15) }
    }

    fn account(failed: u32, locked_until: Option<DateTime<Utc>>) -> UserAccount {
        UserAccount {
            id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            email: "hygienist@example.com".to_string(),
            full_name: "Hy Gienist".to_string(),
            role: StaffRole::Hygienist,
            password_hash: String::new(),
            failed_login_attempts: failed,
            locked_until,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_correct_password_clears_counter() {
        let now = Utc::now();
        assert_eq!(evaluate_login(&account(2, None), true, now, &policy()), LoginDecision::Success);
    }

    #[test]
    fn test_wrong_password_increments() {
        let now = Utc::now();
        assert_eq!(
            evaluate_login(&account(0, None), false, now, &policy()),
            LoginDecision::Rejected { failed_attempts: 1, locked_until: None }
        );
    }

    #[test]
    fn test_reaching_limit_locks() {
        let now = Utc::now();
        assert_eq!(
            evaluate_login(&account(2, None), false, now, &policy()),
            LoginDecision::Rejected { failed_attempts: 3, locked_until: Some(now + Duration::minutes(15)) }
        );
    }

    #[test]
    fn test_locked_account_rejects_even_correct_password() {
        let now = Utc::now();
        let until = now + Duration::minutes(5);
        assert_eq!(
            evaluate_login(&account(3, Some(until)), true, now, &policy()),
            LoginDecision::Locked { until }
        );
    }

    #[test]
    fn test_expired_lock_starts_fresh_window() {
        let now = Utc::now();
        let expired = now - Duration::minutes(1);
        assert_eq!(
            evaluate_login(&account(3, Some(expired)), false, now, &policy()),
            LoginDecision::Rejected { failed_attempts: 1, locked_until: None }
        );
        assert_eq!(evaluate_login(&account(3, Some(expired)), true, now, &policy()), LoginDecision::Success);
    }

    #[test]
    fn test_inactive_account() {
        let mut inactive = account(0, None);
        inactive.is_active = false;
        assert_eq!(evaluate_login(&inactive, true, Utc::now(), &policy()), LoginDecision::Inactive);
    }

    #[test]
    fn test_policy_from_config_never_zero() {
        let mut config = AppConfig::with_data_api("http://localhost", "secret");
        config.max_failed_logins = 0;
        config.lockout_minutes = 0;
        let policy = LoginPolicy::from_config(&config);
        assert_eq!(policy.max_failed_attempts, 1);
        assert_eq!(policy.lockout, Duration::minutes(1));
    }
}
