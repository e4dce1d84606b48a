use chrono::Utc;
use falcon_core::settings::{KanbanSettings, KanbanSettingsPatch, UserPrefs, UserPrefsPatch};
use serde_json::json;

use super::{Query, RestGateway};
use crate::error::{GatewayError, Result};

impl RestGateway {
    /// Board settings for my organisation, or the defaults when none were
    /// saved yet.
    pub async fn kanban_settings(&self) -> Result<KanbanSettings> {
        let org = self.my_org_id().await?;
        let row: Option<KanbanSettings> = self
            .select_one(
                "kanban_settings",
                Query::new().select("*").eq("organization_id", org),
            )
            .await?;
        Ok(row.unwrap_or_else(|| KanbanSettings::defaults_for(org)))
    }

    /// Merge `patch` into the stored settings and write the full row back.
    pub async fn update_kanban_settings(&self, patch: &KanbanSettingsPatch) -> Result<KanbanSettings> {
        let next = self.kanban_settings().await?.merged(patch);
        let mut row = serde_json::to_value(&next).map_err(|source| GatewayError::Schema {
            resource: "kanban_settings".into(),
            source,
        })?;
        row["updated_at"] = json!(Utc::now());
        self.upsert("kanban_settings", "organization_id", &row).await?;
        tracing::info!(organization_id = %next.organization_id, "kanban settings saved");
        Ok(next)
    }

    /// My preferences. Anonymous sessions and users without a row get the
    /// defaults.
    pub async fn user_prefs(&self) -> Result<UserPrefs> {
        let uid = match self.current_user_id().await {
            Ok(uid) => uid,
            Err(GatewayError::NotAuthenticated) => return Ok(UserPrefs::default()),
            Err(e) => return Err(e),
        };
        let row: Option<UserPrefs> = self
            .select_one(
                "user_prefs",
                Query::new()
                    .select("mute_my_toasts,orders_default_filters,orders_page_size")
                    .eq("user_id", uid),
            )
            .await?;
        Ok(row.unwrap_or_default())
    }

    pub async fn update_user_prefs(&self, patch: &UserPrefsPatch) -> Result<UserPrefs> {
        let uid = self.current_user_id().await?;
        let next = self.user_prefs().await?.merged(patch);
        let row = json!({
            "user_id": uid,
            "mute_my_toasts": next.mute_my_toasts,
            "orders_default_filters": next.orders_default_filters,
            "orders_page_size": next.orders_page_size,
            "updated_at": Utc::now(),
        });
        self.upsert("user_prefs", "user_id", &row).await?;
        tracing::info!(user_id = %uid, "preferences saved");
        Ok(next)
    }
}
