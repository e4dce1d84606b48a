use crate::types::ClientKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    pub display_name: String,
    pub kind: ClientKind,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_archived: Option<bool>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Id and name only, for pickers and typeahead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientLite {
    pub id: Uuid,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
    pub organization_id: Uuid,
    pub display_name: String,
    pub kind: ClientKind,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLite {
    pub id: Uuid,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl UserLite {
    pub fn display(&self) -> &str {
        self.full_name.as_deref().unwrap_or("(unnamed)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_row_parses() {
        let c: Client = serde_json::from_value(serde_json::json!({
            "id": "00000000-0000-4000-8000-0000000000aa",
            "organization_id": "00000000-0000-4000-8000-0000000000bb",
            "display_name": "First Lending",
            "kind": "lender",
            "notes": null,
            "created_at": "2026-01-05T08:00:00Z",
            "updated_at": null
        }))
        .unwrap();
        assert_eq!(c.kind, ClientKind::Lender);
        assert!(c.notes.is_none());
    }

    #[test]
    fn user_display_falls_back() {
        let u = UserLite {
            id: Uuid::nil(),
            full_name: None,
        };
        assert_eq!(u.display(), "(unnamed)");
    }
}
