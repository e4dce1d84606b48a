use crate::filters::{AssigneeFilter, OrderFilters, DEFAULT_PAGE_SIZE, UNASSIGNED};
use crate::types::OrderStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// KanbanSettings
// ---------------------------------------------------------------------------

/// Per-organisation board configuration (`kanban_settings` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanSettings {
    pub organization_id: Uuid,
    #[serde(default)]
    pub wip_new: Option<u32>,
    #[serde(default)]
    pub wip_in_review: Option<u32>,
    #[serde(default)]
    pub wip_completed: Option<u32>,
    #[serde(default)]
    pub wip_cancelled: Option<u32>,
    #[serde(default)]
    pub show_cancelled: bool,
    #[serde(default)]
    pub group_by_assignee_default: bool,
}

impl KanbanSettings {
    pub fn defaults_for(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            wip_new: None,
            wip_in_review: None,
            wip_completed: None,
            wip_cancelled: None,
            show_cancelled: false,
            group_by_assignee_default: false,
        }
    }

    pub fn wip_limits(&self) -> WipLimits {
        WipLimits {
            new: self.wip_new,
            in_review: self.wip_in_review,
            completed: self.wip_completed,
            cancelled: self.wip_cancelled,
        }
    }

    /// Apply a patch; fields left `None` keep their current value.
    pub fn merged(&self, patch: &KanbanSettingsPatch) -> Self {
        Self {
            organization_id: self.organization_id,
            wip_new: patch.wip_new.unwrap_or(self.wip_new),
            wip_in_review: patch.wip_in_review.unwrap_or(self.wip_in_review),
            wip_completed: patch.wip_completed.unwrap_or(self.wip_completed),
            wip_cancelled: patch.wip_cancelled.unwrap_or(self.wip_cancelled),
            show_cancelled: patch.show_cancelled.unwrap_or(self.show_cancelled),
            group_by_assignee_default: patch
                .group_by_assignee_default
                .unwrap_or(self.group_by_assignee_default),
        }
    }
}

/// Partial update. `Some(None)` clears a WIP limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KanbanSettingsPatch {
    pub wip_new: Option<Option<u32>>,
    pub wip_in_review: Option<Option<u32>>,
    pub wip_completed: Option<Option<u32>>,
    pub wip_cancelled: Option<Option<u32>>,
    pub show_cancelled: Option<bool>,
    pub group_by_assignee_default: Option<bool>,
}

impl KanbanSettingsPatch {
    pub fn set_wip(&mut self, status: OrderStatus, limit: Option<u32>) {
        let slot = match status {
            OrderStatus::New => &mut self.wip_new,
            OrderStatus::InReview => &mut self.wip_in_review,
            OrderStatus::Completed => &mut self.wip_completed,
            OrderStatus::Cancelled => &mut self.wip_cancelled,
        };
        *slot = Some(limit);
    }
}

// ---------------------------------------------------------------------------
// WipLimits
// ---------------------------------------------------------------------------

/// Maximum cards per status column; `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipLimits {
    pub new: Option<u32>,
    pub in_review: Option<u32>,
    pub completed: Option<u32>,
    pub cancelled: Option<u32>,
}

impl WipLimits {
    pub fn limit_for(&self, status: OrderStatus) -> Option<u32> {
        match status {
            OrderStatus::New => self.new,
            OrderStatus::InReview => self.in_review,
            OrderStatus::Completed => self.completed,
            OrderStatus::Cancelled => self.cancelled,
        }
    }

    pub fn with_limit(mut self, status: OrderStatus, limit: u32) -> Self {
        match status {
            OrderStatus::New => self.new = Some(limit),
            OrderStatus::InReview => self.in_review = Some(limit),
            OrderStatus::Completed => self.completed = Some(limit),
            OrderStatus::Cancelled => self.cancelled = Some(limit),
        }
        self
    }
}

// ---------------------------------------------------------------------------
// UserPrefs
// ---------------------------------------------------------------------------

/// Saved default list filters, stored as JSON in `user_prefs`. Keys follow
/// the URL names; blank strings are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersDefaultFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<OrderStatus>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl OrdersDefaultFilters {
    pub fn standard() -> Self {
        Self {
            status: Some(vec![OrderStatus::New, OrderStatus::InReview]),
            include_archived: Some(false),
            q: None,
            due_from: None,
            due_to: None,
            assignee_id: None,
            client_id: None,
        }
    }

    /// Key-by-key merge: keys present in `other` win.
    pub fn merged(&self, other: &OrdersDefaultFilters) -> Self {
        Self {
            status: other.status.clone().or_else(|| self.status.clone()),
            include_archived: other.include_archived.or(self.include_archived),
            q: other.q.clone().or_else(|| self.q.clone()),
            due_from: other.due_from.clone().or_else(|| self.due_from.clone()),
            due_to: other.due_to.clone().or_else(|| self.due_to.clone()),
            assignee_id: other.assignee_id.clone().or_else(|| self.assignee_id.clone()),
            client_id: other.client_id.clone().or_else(|| self.client_id.clone()),
        }
    }

    /// Snapshot of a filter set as saved defaults. Every key is present, so
    /// merging the result over older defaults replaces them all; blank
    /// strings stand for "unset".
    pub fn from_filters(filters: &OrderFilters) -> Self {
        let date = |d: Option<NaiveDate>| {
            Some(d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default())
        };
        Self {
            status: Some(filters.status.clone()),
            include_archived: Some(filters.include_archived),
            q: Some(filters.q.clone().unwrap_or_default()),
            due_from: date(filters.due_from),
            due_to: date(filters.due_to),
            assignee_id: Some(match filters.assignee {
                AssigneeFilter::Any => String::new(),
                AssigneeFilter::Unassigned => UNASSIGNED.to_string(),
                AssigneeFilter::User(id) => id.to_string(),
            }),
            client_id: Some(filters.client_id.map(|c| c.to_string()).unwrap_or_default()),
        }
    }

    pub fn to_filters(&self, page_size: u32) -> OrderFilters {
        let date = |s: &Option<String>| {
            s.as_deref()
                .filter(|v| !v.trim().is_empty())
                .and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
        };
        OrderFilters {
            status: self.status.clone().unwrap_or_default(),
            assignee: self
                .assignee_id
                .as_deref()
                .map(AssigneeFilter::parse)
                .unwrap_or_default(),
            client_id: self
                .client_id
                .as_deref()
                .and_then(|c| Uuid::parse_str(c.trim()).ok()),
            q: self.q.clone().filter(|q| !q.trim().is_empty()),
            due_from: date(&self.due_from),
            due_to: date(&self.due_to),
            include_archived: self.include_archived.unwrap_or(false),
            page: 1,
            page_size: if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPrefs {
    #[serde(default = "default_mute")]
    pub mute_my_toasts: bool,
    #[serde(
        default = "OrdersDefaultFilters::standard",
        deserialize_with = "filters_or_standard"
    )]
    pub orders_default_filters: OrdersDefaultFilters,
    #[serde(default = "default_page_size", deserialize_with = "page_size_or_default")]
    pub orders_page_size: u32,
}

fn filters_or_standard<'de, D: Deserializer<'de>>(d: D) -> Result<OrdersDefaultFilters, D::Error> {
    Ok(Option::<OrdersDefaultFilters>::deserialize(d)?.unwrap_or_else(OrdersDefaultFilters::standard))
}

fn page_size_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(Option::<u32>::deserialize(d)?
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE))
}

fn default_mute() -> bool {
    true
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for UserPrefs {
    fn default() -> Self {
        Self {
            mute_my_toasts: default_mute(),
            orders_default_filters: OrdersDefaultFilters::standard(),
            orders_page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPrefsPatch {
    pub mute_my_toasts: Option<bool>,
    pub orders_default_filters: Option<OrdersDefaultFilters>,
    pub orders_page_size: Option<u32>,
}

impl UserPrefs {
    pub fn merged(&self, patch: &UserPrefsPatch) -> Self {
        Self {
            mute_my_toasts: patch.mute_my_toasts.unwrap_or(self.mute_my_toasts),
            orders_default_filters: match &patch.orders_default_filters {
                Some(next) => self.orders_default_filters.merged(next),
                None => self.orders_default_filters.clone(),
            },
            orders_page_size: patch.orders_page_size.unwrap_or(self.orders_page_size),
        }
    }

    pub fn default_filters(&self) -> OrderFilters {
        self.orders_default_filters.to_filters(self.orders_page_size)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kanban_defaults_have_no_limits() {
        let s = KanbanSettings::defaults_for(Uuid::nil());
        let wip = s.wip_limits();
        for status in OrderStatus::all() {
            assert_eq!(wip.limit_for(*status), None);
        }
        assert!(!s.show_cancelled);
    }

    #[test]
    fn kanban_patch_sets_and_clears() {
        let mut s = KanbanSettings::defaults_for(Uuid::nil());
        s.wip_new = Some(5);
        let mut patch = KanbanSettingsPatch::default();
        patch.set_wip(OrderStatus::InReview, Some(3));
        patch.set_wip(OrderStatus::New, None);
        patch.show_cancelled = Some(true);
        let merged = s.merged(&patch);
        assert_eq!(merged.wip_in_review, Some(3));
        assert_eq!(merged.wip_new, None);
        assert!(merged.show_cancelled);
        assert!(!merged.group_by_assignee_default);
    }

    #[test]
    fn prefs_from_sparse_row() {
        let prefs: UserPrefs = serde_json::from_value(serde_json::json!({
            "mute_my_toasts": false,
            "orders_default_filters": null,
            "orders_page_size": null
        }))
        .unwrap();
        assert!(!prefs.mute_my_toasts);
        assert_eq!(prefs.orders_page_size, 20);
        assert_eq!(prefs.orders_default_filters, OrdersDefaultFilters::standard());
    }

    #[test]
    fn default_filters_skip_blank_strings() {
        let defaults: OrdersDefaultFilters = serde_json::from_value(serde_json::json!({
            "status": ["new"],
            "includeArchived": false,
            "q": "",
            "dueFrom": "",
            "dueTo": "2026-04-01",
            "assigneeId": null,
            "clientId": null
        }))
        .unwrap();
        let f = defaults.to_filters(50);
        assert_eq!(f.status, vec![OrderStatus::New]);
        assert!(f.q.is_none());
        assert!(f.due_from.is_none());
        assert_eq!(f.due_to, NaiveDate::from_ymd_opt(2026, 4, 1));
        assert_eq!(f.page_size, 50);
        assert_eq!(f.page, 1);
    }

    #[test]
    fn snapshot_round_trips_through_defaults() {
        let filters = OrderFilters::from_query_string(
            "status=completed&assigneeId=unassigned&dueTo=2026-05-01&pageSize=50",
        );
        let saved = OrdersDefaultFilters::from_filters(&filters);
        assert_eq!(saved.q.as_deref(), Some(""));
        assert_eq!(saved.assignee_id.as_deref(), Some("unassigned"));

        let merged = OrdersDefaultFilters::standard().merged(&saved);
        let back = merged.to_filters(50);
        assert_eq!(back, filters);
    }

    #[test]
    fn saving_defaults_without_client_clears_it() {
        let with_client =
            OrdersDefaultFilters::from_filters(&OrderFilters::from_query_string(
                "status=new&clientId=00000000-0000-0000-0000-000000000009",
            ));
        let saved = OrdersDefaultFilters::standard().merged(&with_client);
        assert_eq!(
            saved.to_filters(20).client_id,
            Some(Uuid::from_u128(9))
        );

        let without = OrdersDefaultFilters::from_filters(&OrderFilters::from_query_string("status=new"));
        assert_eq!(without.client_id.as_deref(), Some(""));
        let saved = saved.merged(&without);
        let back = saved.to_filters(20);
        assert_eq!(back.client_id, None);
        assert_eq!(back.to_query_string(), "status=new");
    }

    #[test]
    fn stored_client_id_parses() {
        let f: OrdersDefaultFilters = serde_json::from_value(serde_json::json!({
            "clientId": "00000000-0000-0000-0000-000000000009",
        }))
        .unwrap();
        assert_eq!(f.to_filters(20).client_id, Some(Uuid::from_u128(9)));

        let f: OrdersDefaultFilters =
            serde_json::from_value(serde_json::json!({ "clientId": null })).unwrap();
        assert_eq!(f.client_id, None);
    }

    #[test]
    fn prefs_patch_merges_filters_by_key() {
        let prefs = UserPrefs::default();
        let patch = UserPrefsPatch {
            orders_default_filters: Some(OrdersDefaultFilters {
                include_archived: Some(true),
                ..Default::default()
            }),
            orders_page_size: Some(100),
            ..Default::default()
        };
        let merged = prefs.merged(&patch);
        assert_eq!(
            merged.orders_default_filters.status,
            Some(vec![OrderStatus::New, OrderStatus::InReview])
        );
        assert_eq!(merged.orders_default_filters.include_archived, Some(true));
        assert_eq!(merged.orders_page_size, 100);
        assert!(merged.mute_my_toasts);
    }
}
