use crate::types::ActivityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ActivityId
// ---------------------------------------------------------------------------

/// Identifier of an activity row.
///
/// Deployed procedures disagree on the type (uuid text in some schemas, a
/// bigserial in others), so the value is kept opaque rather than guessed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActivityId {
    Text(String),
    Numeric(i64),
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityId::Text(s) => f.write_str(s),
            ActivityId::Numeric(n) => write!(f, "{n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ActivityEvent
// ---------------------------------------------------------------------------

/// One entry of an order's append-only activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ActivityRow")]
pub struct ActivityEvent {
    pub id: ActivityId,
    pub order_id: Uuid,
    pub kind: ActivityKind,
    pub message: Option<String>,
    pub payload: serde_json::Value,
    pub actor: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl ActivityEvent {
    /// String field from the structured payload.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}

/// Wire shape of `v_order_activity`. Older schemas name the columns
/// `event_type`/`event_data`/`occurred_at`, newer ones `kind`/`meta`/`created_at`.
#[derive(Deserialize)]
struct ActivityRow {
    id: ActivityId,
    order_id: Uuid,
    #[serde(default)]
    event_type: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    event_data: Option<serde_json::Value>,
    #[serde(default)]
    meta: Option<serde_json::Value>,
    #[serde(default)]
    payload: Option<serde_json::Value>,
    #[serde(default)]
    actor: Option<String>,
    #[serde(default)]
    actor_name: Option<String>,
    #[serde(default)]
    occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<ActivityRow> for ActivityEvent {
    type Error = String;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let kind = row
            .event_type
            .or(row.kind)
            .ok_or_else(|| format!("activity {} has no event_type or kind", row.id))?;
        let occurred_at = row
            .occurred_at
            .or(row.created_at)
            .ok_or_else(|| format!("activity {} has no timestamp", row.id))?;
        let payload = row
            .event_data
            .or(row.meta)
            .or(row.payload)
            .filter(|v| !v.is_null())
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

        Ok(ActivityEvent {
            id: row.id,
            order_id: row.order_id,
            kind: ActivityKind::from(kind),
            message: row.message,
            payload,
            actor: row.actor.or(row.actor_name),
            occurred_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Appointment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
