use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::layout::{apply_drag, default_layout, Layout, Pose};
use crate::models::{OdontogramError, StoredLayout};
use crate::tooth::{Dentition, ToothId};

/// Validates client-supplied poses for one dentition and clamps them.
pub fn parse_overrides(
    dentition: Dentition,
    poses: &BTreeMap<u8, Pose>,
) -> Result<BTreeMap<ToothId, Pose>, OdontogramError> {
    let mut overrides = BTreeMap::new();
    for (code, pose) in poses {
        let tooth = ToothId::new(*code).map_err(OdontogramError::InvalidTooth)?;
        if tooth.dentition() != dentition {
            return Err(OdontogramError::WrongDentition { tooth, dentition });
        }
        if !pose.is_finite() {
            return Err(OdontogramError::ValidationError(format!("Pose for tooth {} is not a number", tooth)));
        }
        overrides.insert(tooth, pose.clamped());
    }
    Ok(overrides)
}

/// Per-user odontogram layouts. Only overrides are persisted; reads merge
/// them over the default arch.
pub struct LayoutService {
    supabase: SupabaseClient,
}

impl LayoutService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn filter(user_id: Uuid, dentition: Dentition) -> String {
        format!("user_id=eq.{}&dentition=eq.{}", user_id, dentition)
    }

    async fn stored(&self, user_id: Uuid, dentition: Dentition, auth_token: &str) -> Result<Option<StoredLayout>, OdontogramError> {
        Ok(self.supabase
            .select_one("odontogram_layouts", &Self::filter(user_id, dentition), auth_token)
            .await?)
    }

    pub async fn get_layout(&self, user_id: Uuid, dentition: Dentition, auth_token: &str) -> Result<Layout, OdontogramError> {
        debug!("Loading {} layout for user {}", dentition, user_id);

        let layout = default_layout(dentition);
        Ok(match self.stored(user_id, dentition, auth_token).await? {
            Some(stored) => layout.merge_overrides(&stored.poses),
            None => layout,
        })
    }

    async fn store(
        &self,
        user_id: Uuid,
        dentition: Dentition,
        overrides: BTreeMap<ToothId, Pose>,
        existing: Option<StoredLayout>,
        auth_token: &str,
    ) -> Result<BTreeMap<ToothId, Pose>, OdontogramError> {
        let now = Utc::now().to_rfc3339();

        let rows: Vec<StoredLayout> = match existing {
            Some(stored) => {
                self.supabase
                    .update(
                        "odontogram_layouts",
                        &format!("id=eq.{}", stored.id),
                        json!({ "poses": overrides, "updated_at": now }),
                        auth_token,
                    )
                    .await?
            }
            None => {
                self.supabase
                    .insert(
                        "odontogram_layouts",
                        json!({
                            "user_id": user_id,
                            "dentition": dentition,
                            "poses": overrides,
                            "updated_at": now
                        }),
                        auth_token,
                    )
                    .await?
            }
        };

        rows.into_iter()
            .next()
            .map(|row| row.poses)
            .ok_or_else(|| OdontogramError::DatabaseError("Failed to store layout".to_string()))
    }

    /// Adds the given poses to the user's stored overrides.
    pub async fn save_layout(
        &self,
        user_id: Uuid,
        dentition: Dentition,
        poses: &BTreeMap<u8, Pose>,
        auth_token: &str,
    ) -> Result<Layout, OdontogramError> {
        let updates = parse_overrides(dentition, poses)?;
        let existing = self.stored(user_id, dentition, auth_token).await?;

        let mut overrides = existing.as_ref().map(|s| s.poses.clone()).unwrap_or_default();
        overrides.extend(updates);

        let saved = self.store(user_id, dentition, overrides, existing, auth_token).await?;
        info!("Saved {} layout for user {} ({} custom teeth)", dentition, user_id, saved.len());
        Ok(default_layout(dentition).merge_overrides(&saved))
    }

    /// Moves one tooth by a percentage delta from where the user currently
    /// sees it.
    pub async fn drag_tooth(
        &self,
        user_id: Uuid,
        tooth: ToothId,
        dx: f64,
        dy: f64,
        auth_token: &str,
    ) -> Result<Pose, OdontogramError> {
        if !dx.is_finite() || !dy.is_finite() {
            return Err(OdontogramError::ValidationError("dx and dy must be numbers".to_string()));
        }

        let dentition = tooth.dentition();
        let existing = self.stored(user_id, dentition, auth_token).await?;
        let mut overrides = existing.as_ref().map(|s| s.poses.clone()).unwrap_or_default();

        let current = match overrides.get(&tooth) {
            Some(pose) => pose.clamped(),
            None => default_layout(dentition)
                .pose(tooth)
                .ok_or_else(|| OdontogramError::InvalidTooth(format!("Invalid tooth {}", tooth)))?,
        };
        let moved = apply_drag(current, dx, dy);
        overrides.insert(tooth, moved);

        self.store(user_id, dentition, overrides, existing, auth_token).await?;
        debug!("Tooth {} dragged to ({:.1}, {:.1}) for user {}", tooth, moved.x, moved.y, user_id);
        Ok(moved)
    }

    pub async fn reset_layout(&self, user_id: Uuid, dentition: Dentition, auth_token: &str) -> Result<Layout, OdontogramError> {
        self.supabase
            .delete("odontogram_layouts", &Self::filter(user_id, dentition), auth_token)
            .await?;
        info!("Reset {} layout for user {}", dentition, user_id);
        Ok(default_layout(dentition))
    }
}
