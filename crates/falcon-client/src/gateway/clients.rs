use falcon_core::client::{Client, ClientLite, NewClient, UserLite};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{Query, RestGateway};
use crate::error::Result;

/// Row of a table whose label column is called `name`.
#[derive(Deserialize)]
struct NamedRow {
    id: Uuid,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct FullNameRow {
    id: Uuid,
    #[serde(default)]
    full_name: Option<String>,
}

fn labelled(column: &str, q: Option<&str>, limit: u64) -> Query {
    let mut query = Query::new()
        .select(&format!("id,{column}"))
        .order(column, true)
        .limit(limit);
    if let Some(term) = q.map(str::trim).filter(|t| !t.is_empty()) {
        query = query.ilike(column, term);
    }
    query
}

impl RestGateway {
    /// Clients for pickers, optionally filtered by name. Schemas that call
    /// the label column `name` are queried again with that column.
    pub async fn list_clients(&self, q: Option<&str>, limit: u64) -> Result<Vec<ClientLite>> {
        match self
            .select::<ClientLite>("clients", &labelled("display_name", q, limit))
            .await
        {
            Err(e) if e.is_undefined_column() => {
                tracing::debug!("clients has no display_name, using name");
                let rows: Vec<NamedRow> = self.select("clients", &labelled("name", q, limit)).await?;
                Ok(rows
                    .into_iter()
                    .map(|r| ClientLite {
                        id: r.id,
                        display_name: r.name.unwrap_or_default(),
                    })
                    .collect())
            }
            other => other,
        }
    }

    pub async fn fetch_client(&self, client_id: Uuid) -> Result<Option<Client>> {
        self.select_one("clients", Query::new().select("*").eq("id", client_id))
            .await
    }

    pub async fn create_client(&self, client: &NewClient) -> Result<Uuid> {
        let id: Uuid = self
            .rpc(
                "create_client",
                json!({
                    "p_organization_id": client.organization_id,
                    "p_display_name": client.display_name,
                    "p_kind": client.kind,
                    "p_notes": client.notes,
                }),
            )
            .await?;
        tracing::info!(client_id = %id, name = %client.display_name, "created client");
        Ok(id)
    }

    pub async fn archive_client(&self, client_id: Uuid, archived: bool) -> Result<()> {
        let _: serde_json::Value = self
            .rpc(
                "archive_client",
                json!({ "p_client_id": client_id, "p_is_archived": archived }),
            )
            .await?;
        tracing::info!(%client_id, archived, "client archive flag updated");
        Ok(())
    }

    /// Assignable users. Tries `users.full_name`, then `users.name`, then
    /// `profiles.full_name`, moving on only when a column is missing.
    pub async fn list_users(&self, limit: u64) -> Result<Vec<UserLite>> {
        let err = match self
            .select::<FullNameRow>("users", &labelled("full_name", None, limit))
            .await
        {
            Ok(rows) => return Ok(rows.into_iter().map(full_name_user).collect()),
            Err(e) => e,
        };
        if !err.is_undefined_column() {
            return Err(err);
        }

        let err = match self
            .select::<NamedRow>("users", &labelled("name", None, limit))
            .await
        {
            Ok(rows) => {
                return Ok(rows
                    .into_iter()
                    .map(|r| UserLite {
                        id: r.id,
                        full_name: r.name,
                    })
                    .collect())
            }
            Err(e) => e,
        };
        if !err.is_undefined_column() {
            return Err(err);
        }

        tracing::debug!("users has no name column, reading profiles");
        let rows: Vec<FullNameRow> = self
            .select("profiles", &labelled("full_name", None, limit))
            .await?;
        Ok(rows.into_iter().map(full_name_user).collect())
    }
}

fn full_name_user(r: FullNameRow) -> UserLite {
    UserLite {
        id: r.id,
        full_name: r.full_name,
    }
}
