//! Order list filters and their URL query-string form.
//!
//! The query string is the shareable representation of a list view:
//!
//! ```text
//! status=new&status=in_review&assigneeId=<uuid>&clientId=<uuid>&q=elm
//!     &dueFrom=2026-03-01&dueTo=2026-03-31&includeArchived=true&page=2&pageSize=50
//! ```
//!
//! `status` repeats; every other key appears at most once. Defaults are never
//! written, and anything missing or unparsable decodes to its default.

use crate::settings::UserPrefs;
use crate::types::OrderStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Marker written with hydrated defaults so a bare list URL is only
/// hydrated once.
pub const HYDRATED_KEY: &str = "hydrated";

const KEY_STATUS: &str = "status";
const KEY_ASSIGNEE: &str = "assigneeId";
const KEY_CLIENT: &str = "clientId";
const KEY_QUERY: &str = "q";
const KEY_DUE_FROM: &str = "dueFrom";
const KEY_DUE_TO: &str = "dueTo";
const KEY_ARCHIVED: &str = "includeArchived";
const KEY_PAGE: &str = "page";
const KEY_PAGE_SIZE: &str = "pageSize";

pub const UNASSIGNED: &str = "unassigned";
const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// AssigneeFilter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeFilter {
    #[default]
    Any,
    Unassigned,
    User(Uuid),
}

impl AssigneeFilter {
    /// `unassigned` or a user id; anything else (including blank) means any.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s == UNASSIGNED {
            return AssigneeFilter::Unassigned;
        }
        Uuid::parse_str(s)
            .map(AssigneeFilter::User)
            .unwrap_or(AssigneeFilter::Any)
    }

    fn to_param(self) -> Option<String> {
        match self {
            AssigneeFilter::Any => None,
            AssigneeFilter::Unassigned => Some(UNASSIGNED.to_string()),
            AssigneeFilter::User(id) => Some(id.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// OrderFilters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilters {
    /// Empty means every status.
    pub status: Vec<OrderStatus>,
    pub assignee: AssigneeFilter,
    pub client_id: Option<Uuid>,
    /// Free-text search; `None` when blank.
    pub q: Option<String>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    pub include_archived: bool,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
}

impl Default for OrderFilters {
    fn default() -> Self {
        Self {
            status: Vec::new(),
            assignee: AssigneeFilter::Any,
            client_id: None,
            q: None,
            due_from: None,
            due_to: None,
            include_archived: false,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A single edit to the filters, as produced by a filter bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    Status(Vec<OrderStatus>),
    Assignee(AssigneeFilter),
    Client(Option<Uuid>),
    Query(Option<String>),
    DueFrom(Option<NaiveDate>),
    DueTo(Option<NaiveDate>),
    IncludeArchived(bool),
    Page(u32),
    PageSize(u32),
}

impl OrderFilters {
    /// Apply a change. Every change except `Page` sends the view back to page 1.
    pub fn apply(&mut self, change: FilterChange) {
        let resets_page = !matches!(change, FilterChange::Page(_));
        match change {
            FilterChange::Status(mut s) => {
                s.dedup();
                self.status = s;
            }
            FilterChange::Assignee(a) => self.assignee = a,
            FilterChange::Client(c) => self.client_id = c,
            FilterChange::Query(q) => {
                self.q = q
                    .map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty())
            }
            FilterChange::DueFrom(d) => self.due_from = d,
            FilterChange::DueTo(d) => self.due_to = d,
            FilterChange::IncludeArchived(b) => self.include_archived = b,
            FilterChange::Page(p) => self.page = p.max(1),
            FilterChange::PageSize(n) => {
                self.page_size = if n == 0 { DEFAULT_PAGE_SIZE } else { n }
            }
        }
        if resets_page {
            self.page = 1;
        }
    }

    /// Zero-based inclusive row range for the current page.
    pub fn row_range(&self) -> (u64, u64) {
        let page = self.page.max(1) as u64;
        let size = self.page_size.max(1) as u64;
        let from = (page - 1) * size;
        (from, from + size - 1)
    }

    /// Serialise to a query string (no leading `?`).
    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        for status in &self.status {
            out.append_pair(KEY_STATUS, status.as_str());
        }
        if let Some(a) = self.assignee.to_param() {
            out.append_pair(KEY_ASSIGNEE, &a);
        }
        if let Some(c) = self.client_id {
            out.append_pair(KEY_CLIENT, &c.to_string());
        }
        // Search text is sent trimmed, as decoding trims it.
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            out.append_pair(KEY_QUERY, q);
        }
        if let Some(d) = self.due_from {
            out.append_pair(KEY_DUE_FROM, &d.format(DATE_FORMAT).to_string());
        }
        if let Some(d) = self.due_to {
            out.append_pair(KEY_DUE_TO, &d.format(DATE_FORMAT).to_string());
        }
        if self.include_archived {
            out.append_pair(KEY_ARCHIVED, "true");
        }
        if self.page > 1 {
            out.append_pair(KEY_PAGE, &self.page.to_string());
        }
        if self.page_size != DEFAULT_PAGE_SIZE {
            out.append_pair(KEY_PAGE_SIZE, &self.page_size.to_string());
        }
        out.finish()
    }

    /// Parse a query string (a leading `?` is allowed). Never fails: bad
    /// values are dropped and fall back to defaults.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut filters = OrderFilters::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                KEY_STATUS => match value.parse::<OrderStatus>() {
                    Ok(s) if !filters.status.contains(&s) => filters.status.push(s),
                    Ok(_) => {}
                    Err(_) => tracing::debug!(value, "ignoring unknown status in query"),
                },
                KEY_ASSIGNEE => filters.assignee = AssigneeFilter::parse(value),
                KEY_CLIENT => filters.client_id = Uuid::parse_str(value).ok(),
                KEY_QUERY => filters.q = Some(value.to_string()),
                KEY_DUE_FROM => filters.due_from = parse_date(value),
                KEY_DUE_TO => filters.due_to = parse_date(value),
                KEY_ARCHIVED => filters.include_archived = matches!(value, "true" | "1"),
                KEY_PAGE => filters.page = parse_positive(value).unwrap_or(1),
                KEY_PAGE_SIZE => {
                    filters.page_size = parse_positive(value).unwrap_or(DEFAULT_PAGE_SIZE)
                }
                _ => {}
            }
        }
        filters
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    // Accept a full timestamp too; only the date part matters.
    let date_part = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

fn parse_positive(s: &str) -> Option<u32> {
    s.parse::<u32>().ok().filter(|n| *n > 0)
}

// ---------------------------------------------------------------------------
// Hydration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hydration {
    /// The query already describes the view.
    Decoded(OrderFilters),
    /// First visit: apply the saved defaults and replace the query with
    /// `query`, which carries the hydration marker.
    FromPrefs { filters: OrderFilters, query: String },
}

impl Hydration {
    pub fn filters(&self) -> &OrderFilters {
        match self {
            Hydration::Decoded(f) => f,
            Hydration::FromPrefs { filters, .. } => filters,
        }
    }

    pub fn into_filters(self) -> OrderFilters {
        match self {
            Hydration::Decoded(f) => f,
            Hydration::FromPrefs { filters, .. } => filters,
        }
    }
}

/// Resolve the filters for a list view. A query string without any keys at
/// all is a first visit and gets the user's saved defaults; anything else,
/// including a query holding only the marker, is decoded as-is.
pub fn hydrate(query: &str, prefs: &UserPrefs) -> Hydration {
    let trimmed = query.strip_prefix('?').unwrap_or(query);
    let has_keys = form_urlencoded::parse(trimmed.as_bytes()).next().is_some();
    if has_keys {
        return Hydration::Decoded(OrderFilters::from_query_string(trimmed));
    }

    let filters = prefs.default_filters();
    let encoded = filters.to_query_string();
    let query = if encoded.is_empty() {
        format!("{HYDRATED_KEY}=1")
    } else {
        format!("{encoded}&{HYDRATED_KEY}=1")
    };
    Hydration::FromPrefs { filters, query }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::OrdersDefaultFilters;

    fn full_filters() -> OrderFilters {
        OrderFilters {
            status: vec![OrderStatus::New, OrderStatus::Cancelled],
            assignee: AssigneeFilter::User(Uuid::from_u128(7)),
            client_id: Some(Uuid::from_u128(9)),
            q: Some("elm & 5th".to_string()),
            due_from: NaiveDate::from_ymd_opt(2026, 3, 1),
            due_to: NaiveDate::from_ymd_opt(2026, 3, 31),
            include_archived: true,
            page: 3,
            page_size: 50,
        }
    }

    #[test]
    fn empty_query_decodes_to_defaults() {
        assert_eq!(OrderFilters::from_query_string(""), OrderFilters::default());
        assert_eq!(OrderFilters::from_query_string("?"), OrderFilters::default());
    }

    #[test]
    fn defaults_encode_to_empty_string() {
        assert_eq!(OrderFilters::default().to_query_string(), "");
    }

    #[test]
    fn search_text_is_trimmed() {
        let mut f = OrderFilters::default();
        f.apply(FilterChange::Query(Some("  elm ".into())));
        assert_eq!(f.q.as_deref(), Some("elm"));

        let padded = OrderFilters {
            q: Some(" elm ".into()),
            ..Default::default()
        };
        assert_eq!(padded.to_query_string(), "q=elm");
        assert_eq!(
            OrderFilters::from_query_string(&padded.to_query_string()).q.as_deref(),
            Some("elm")
        );

        f.apply(FilterChange::Query(Some("   ".into())));
        assert_eq!(f.q, None);
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let f = full_filters();
        let qs = f.to_query_string();
        assert_eq!(OrderFilters::from_query_string(&qs), f);
    }

    #[test]
    fn round_trip_unassigned() {
        let f = OrderFilters {
            assignee: AssigneeFilter::Unassigned,
            ..Default::default()
        };
        let qs = f.to_query_string();
        assert_eq!(qs, "assigneeId=unassigned");
        assert_eq!(OrderFilters::from_query_string(&qs), f);
    }

    #[test]
    fn status_repeats_and_blank_archived_is_false() {
        let f = OrderFilters::from_query_string("status=new&status=in_review&includeArchived=");
        assert_eq!(f.status, vec![OrderStatus::New, OrderStatus::InReview]);
        assert!(!f.include_archived);
        assert_eq!(f.page, 1);
        assert_eq!(f.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn encoding_uses_repeated_status_keys() {
        let f = OrderFilters {
            status: vec![OrderStatus::New, OrderStatus::InReview],
            ..Default::default()
        };
        assert_eq!(f.to_query_string(), "status=new&status=in_review");
    }

    #[test]
    fn garbage_values_fall_back() {
        let f = OrderFilters::from_query_string(
            "status=bogus&page=-2&pageSize=0&clientId=nope&dueFrom=yesterday&includeArchived=maybe",
        );
        assert_eq!(f, OrderFilters::default());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let f = OrderFilters::from_query_string("hydrated=1&sort=asc&q=smith");
        assert_eq!(f.q.as_deref(), Some("smith"));
    }

    #[test]
    fn changes_reset_page_except_page() {
        let mut f = full_filters();
        f.apply(FilterChange::Page(4));
        assert_eq!(f.page, 4);
        f.apply(FilterChange::IncludeArchived(false));
        assert_eq!(f.page, 1);
        f.apply(FilterChange::Page(2));
        f.apply(FilterChange::Query(Some("   ".into())));
        assert_eq!(f.page, 1);
        assert!(f.q.is_none());
    }

    #[test]
    fn row_range_is_inclusive() {
        let f = OrderFilters {
            page: 3,
            page_size: 20,
            ..Default::default()
        };
        assert_eq!(f.row_range(), (40, 59));
    }

    #[test]
    fn hydrate_applies_prefs_once() {
        let prefs = UserPrefs::default();
        let first = hydrate("", &prefs);
        let Hydration::FromPrefs { filters, query } = first else {
            panic!("expected hydration from prefs");
        };
        assert_eq!(filters.status, vec![OrderStatus::New, OrderStatus::InReview]);
        assert_eq!(query, "status=new&status=in_review&hydrated=1");

        // Revisiting the written URL must not hydrate again.
        let second = hydrate(&query, &prefs);
        assert!(matches!(second, Hydration::Decoded(_)));
        assert_eq!(second.filters(), &filters);
    }

    #[test]
    fn hydrate_marker_only_keeps_cleared_filters() {
        let prefs = UserPrefs::default();
        let h = hydrate("hydrated=1", &prefs);
        assert_eq!(h.into_filters(), OrderFilters::default());
    }

    #[test]
    fn hydrate_with_empty_saved_filters_still_tags() {
        let prefs = UserPrefs {
            orders_default_filters: OrdersDefaultFilters::default(),
            ..Default::default()
        };
        let Hydration::FromPrefs { query, .. } = hydrate("", &prefs) else {
            panic!("expected hydration from prefs");
        };
        assert_eq!(query, "hydrated=1");
    }
}
