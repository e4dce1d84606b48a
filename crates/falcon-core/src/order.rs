use crate::types::OrderStatus;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// OrderView
// ---------------------------------------------------------------------------

/// One row of the `v_orders` view: the order plus denormalised client and
/// assignee names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: Uuid,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub status: OrderStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_archived: Option<bool>,
    #[serde(default)]
    pub appointment_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub appointment_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub assignee_name: Option<String>,
}

impl OrderView {
    pub fn archived(&self) -> bool {
        self.is_archived.unwrap_or(false)
    }

    /// "123 Main St, Springfield, IL", skipping empty parts.
    pub fn display_address(&self) -> String {
        let parts: Vec<&str> = [&self.address, &self.city, &self.state]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.trim().is_empty())
            .collect();
        if parts.is_empty() {
            "No address".to_string()
        } else {
            parts.join(", ")
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != OrderStatus::Completed && self.due_date.is_some_and(|d| d < today)
    }
}

// ---------------------------------------------------------------------------
// NewOrder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrder {
    pub organization_id: Uuid,
    pub client_id: Option<Uuid>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub due_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    /// Rows matching the filters, ignoring pagination.
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn page_count(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size as u64) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count()
    }
}

// ---------------------------------------------------------------------------
// Workload / KPIs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadRow {
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub assignee_name: Option<String>,
    #[serde(default)]
    pub open_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kpis {
    pub total_open: u64,
    pub in_review: u64,
    pub due_this_week: u64,
    pub overdue: u64,
    pub new_this_7: u64,
}

/// Date boundaries used by the dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KpiWindow {
    pub today: NaiveDate,
    /// Exclusive upper bound of "due this week".
    pub week_end: NaiveDate,
    /// Orders created at or after this instant count as new.
    pub created_since: DateTime<Utc>,
}

impl KpiWindow {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            today: now.date_naive(),
            week_end: (now + Duration::days(7)).date_naive(),
            created_since: now - Duration::days(7),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
