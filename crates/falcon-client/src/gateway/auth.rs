use reqwest::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use super::{check, decode, Query, RestGateway};
use crate::error::{GatewayError, Result};

#[derive(Deserialize)]
struct AuthUser {
    id: Uuid,
}

#[derive(Deserialize)]
struct UserOrg {
    #[serde(default)]
    organization_id: Option<Uuid>,
}

impl RestGateway {
    /// Id of the signed-in user. Requires an access token; cached after the
    /// first successful lookup.
    pub async fn current_user_id(&self) -> Result<Uuid> {
        self.user_id
            .get_or_try_init(|| async {
                if self.config.access_token.is_none() {
                    return Err(GatewayError::NotAuthenticated);
                }
                let resp = self.auth("user").send().await?;
                if matches!(
                    resp.status(),
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
                ) {
                    return Err(GatewayError::NotAuthenticated);
                }
                let user: AuthUser = decode("auth/user", check(resp).await?).await?;
                Ok(user.id)
            })
            .await
            .copied()
    }

    /// Organisation of the signed-in user, from the `users` table.
    pub async fn my_org_id(&self) -> Result<Uuid> {
        self.org_id
            .get_or_try_init(|| async {
                let uid = self.current_user_id().await?;
                let row: Option<UserOrg> = self
                    .select_one(
                        "users",
                        Query::new().select("organization_id").eq("id", uid),
                    )
                    .await?;
                row.and_then(|r| r.organization_id)
                    .ok_or(GatewayError::NoOrganization)
            })
            .await
            .copied()
    }
}
