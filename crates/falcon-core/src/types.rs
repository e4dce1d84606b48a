use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    InReview,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn all() -> &'static [OrderStatus] {
        &[
            OrderStatus::New,
            OrderStatus::InReview,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ]
    }

    /// Statuses that count as open work.
    pub fn open() -> &'static [OrderStatus] {
        &[OrderStatus::New, OrderStatus::InReview]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::InReview => "in_review",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::InReview => "In Review",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Statuses reachable from `self` in one move. Nothing is terminal:
    /// completed and cancelled orders can both go back to review.
    pub fn allowed_targets(self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::New => &[OrderStatus::InReview, OrderStatus::Cancelled],
            OrderStatus::InReview => &[OrderStatus::Completed, OrderStatus::Cancelled],
            OrderStatus::Completed => &[OrderStatus::InReview],
            OrderStatus::Cancelled => &[OrderStatus::InReview],
        }
    }

    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        self.allowed_targets().contains(&target)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = crate::error::FalconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(OrderStatus::New),
            "in_review" | "in-review" => Ok(OrderStatus::InReview),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(crate::error::FalconError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientKind
// ---------------------------------------------------------------------------

/// Client category. The backend column is free text, so kinds this client
/// does not know about are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClientKind {
    Lender,
    Amc,
    Other(String),
}

impl ClientKind {
    pub fn as_str(&self) -> &str {
        match self {
            ClientKind::Lender => "lender",
            ClientKind::Amc => "amc",
            ClientKind::Other(s) => s,
        }
    }

    /// Parse a kind accepted by `create_client`; only lender and amc are allowed.
    pub fn parse_known(s: &str) -> crate::error::Result<Self> {
        match s {
            "lender" => Ok(ClientKind::Lender),
            "amc" => Ok(ClientKind::Amc),
            _ => Err(crate::error::FalconError::InvalidClientKind(s.to_string())),
        }
    }
}

impl From<String> for ClientKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "lender" => ClientKind::Lender,
            "amc" => ClientKind::Amc,
            _ => ClientKind::Other(s),
        }
    }
}

impl From<ClientKind> for String {
    fn from(k: ClientKind) -> Self {
        k.as_str().to_string()
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActivityKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityKind {
    StatusChanged,
    AssigneeChanged,
    FileUploaded,
    FileDeleted,
    AppointmentSet,
    AppointmentCleared,
    OrderArchived,
    OrderRestored,
    NoteAdded,
    Other(String),
}

impl ActivityKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActivityKind::StatusChanged => "status_changed",
            ActivityKind::AssigneeChanged => "assignee_changed",
            ActivityKind::FileUploaded => "file_uploaded",
            ActivityKind::FileDeleted => "file_deleted",
            ActivityKind::AppointmentSet => "appointment_set",
            ActivityKind::AppointmentCleared => "appointment_cleared",
            ActivityKind::OrderArchived => "order_archived",
            ActivityKind::OrderRestored => "order_restored",
            ActivityKind::NoteAdded => "note_added",
            ActivityKind::Other(s) => s,
        }
    }
}

impl From<String> for ActivityKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "status_changed" | "status_change" => ActivityKind::StatusChanged,
            "assignee_changed" | "assignment" | "assigned" => ActivityKind::AssigneeChanged,
            "file_uploaded" => ActivityKind::FileUploaded,
            "file_deleted" => ActivityKind::FileDeleted,
            "appointment_set" => ActivityKind::AppointmentSet,
            "appointment_cleared" => ActivityKind::AppointmentCleared,
            "order_archived" => ActivityKind::OrderArchived,
            "order_restored" => ActivityKind::OrderRestored,
            "note_added" | "note" => ActivityKind::NoteAdded,
            _ => ActivityKind::Other(s),
        }
    }
}

impl From<ActivityKind> for String {
    fn from(k: ActivityKind) -> Self {
        k.as_str().to_string()
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_roundtrip() {
        for status in OrderStatus::all() {
            assert_eq!(OrderStatus::from_str(status.as_str()).unwrap(), *status);
        }
        assert!(OrderStatus::from_str("archived").is_err());
    }

    #[test]
    fn transition_table() {
        use OrderStatus::*;
        let allowed = [
            (New, InReview),
            (New, Cancelled),
            (InReview, Completed),
            (InReview, Cancelled),
            (Completed, InReview),
            (Cancelled, InReview),
        ];
        for from in OrderStatus::all() {
            for to in OrderStatus::all() {
                let expected = allowed.contains(&(*from, *to));
                assert_eq!(from.can_transition_to(*to), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn no_status_is_terminal() {
        for status in OrderStatus::all() {
            assert!(!status.allowed_targets().is_empty());
        }
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&OrderStatus::InReview).unwrap();
        assert_eq!(json, "\"in_review\"");
    }

    #[test]
    fn client_kind_keeps_unknown_values() {
        let kind: ClientKind = serde_json::from_str("\"broker\"").unwrap();
        assert_eq!(kind, ClientKind::Other("broker".into()));
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"broker\"");
        assert!(ClientKind::parse_known("broker").is_err());
        assert_eq!(ClientKind::parse_known("amc").unwrap(), ClientKind::Amc);
    }

    #[test]
    fn activity_kind_accepts_legacy_names() {
        let kind: ActivityKind = serde_json::from_str("\"status_change\"").unwrap();
        assert_eq!(kind, ActivityKind::StatusChanged);
        let kind: ActivityKind = serde_json::from_str("\"note\"").unwrap();
        assert_eq!(kind, ActivityKind::NoteAdded);
    }
}
