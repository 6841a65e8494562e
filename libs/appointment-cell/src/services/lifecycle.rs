use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

pub const MAX_APPOINTMENT_HOURS: i64 = 12;

/// Statuses reachable from `current` in one step.
pub fn valid_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
    use AppointmentStatus::*;

    match current {
        Scheduled => &[Confirmed, Cancelled, NoShow],
        Confirmed => &[CheckedIn, Cancelled, NoShow],
        CheckedIn => &[InProgress, Cancelled],
        InProgress => &[Completed],
        Completed | Cancelled | NoShow => &[],
    }
}

pub fn validate_status_transition(
    current: AppointmentStatus,
    next: AppointmentStatus,
) -> Result<(), AppointmentError> {
    debug!("Validating status transition {} -> {}", current, next);

    if !valid_transitions(current).contains(&next) {
        warn!("Invalid status transition attempted: {} -> {}", current, next);
        return Err(AppointmentError::InvalidStatusTransition { from: current, to: next });
    }
    Ok(())
}

/// `ends_at` must follow `starts_at` and the visit may last at most 12 hours.
pub fn validate_window(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), AppointmentError> {
    if ends_at <= starts_at {
        return Err(AppointmentError::InvalidTime("ends_at must be after starts_at".to_string()));
    }
    if ends_at - starts_at > Duration::hours(MAX_APPOINTMENT_HOURS) {
        return Err(AppointmentError::InvalidTime(format!(
            "appointments may last at most {} hours",
            MAX_APPOINTMENT_HOURS
        )));
    }
    Ok(())
}
