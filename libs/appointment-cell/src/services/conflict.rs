use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::{encode, SupabaseClient};

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

/// Half-open intervals `[a_start, a_end)` and `[b_start, b_end)` overlap.
/// Back-to-back slots do not.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// First active appointment in `existing` that overlaps the window, skipping
/// `exclude` (the appointment being rescheduled).
pub fn find_conflict<'a>(
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    existing: &'a [Appointment],
    exclude: Option<Uuid>,
) -> Option<&'a Appointment> {
    existing
        .iter()
        .filter(|a| Some(a.id) != exclude)
        .filter(|a| a.status.is_active())
        .find(|a| overlaps(starts_at, ends_at, a.starts_at, a.ends_at))
}

/// Filter value for a timestamp, keeping any sub-second part.
pub(crate) fn timestamp(value: DateTime<Utc>) -> String {
    encode(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

pub(crate) fn status_list(statuses: &[AppointmentStatus]) -> String {
    statuses.iter().map(AppointmentStatus::as_str).collect::<Vec<_>>().join(",")
}

pub struct ConflictDetectionService<'a> {
    supabase: &'a SupabaseClient,
}

impl<'a> ConflictDetectionService<'a> {
    pub fn new(supabase: &'a SupabaseClient) -> Self {
        Self { supabase }
    }

    /// Fails with `Conflict` when the provider already holds an active
    /// appointment overlapping the window.
    pub async fn ensure_provider_free(
        &self,
        clinic_id: Uuid,
        provider_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        debug!("Checking conflicts for provider {} from {} to {}", provider_id, starts_at, ends_at);

        let mut query = format!(
            "clinic_id=eq.{}&provider_id=eq.{}&status=in.({})&starts_at=lt.{}&ends_at=gt.{}",
            clinic_id,
            provider_id,
            status_list(&AppointmentStatus::ACTIVE),
            timestamp(ends_at),
            timestamp(starts_at),
        );
        if let Some(id) = exclude {
            query.push_str(&format!("&id=neq.{}", id));
        }

        let candidates: Vec<Appointment> = self.supabase.select("appointments", &query, auth_token).await?;

        match find_conflict(starts_at, ends_at, &candidates, exclude) {
            Some(existing) => {
                warn!("Provider {} double-booked against appointment {}", provider_id, existing.id);
                Err(AppointmentError::Conflict {
                    appointment_id: existing.id,
                    starts_at: existing.starts_at,
                    ends_at: existing.ends_at,
                })
            }
            None => Ok(()),
        }
    }
}
