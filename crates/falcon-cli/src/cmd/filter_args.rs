use chrono::NaiveDate;
use clap::Args;
use falcon_core::filters::{AssigneeFilter, FilterChange, OrderFilters};
use falcon_core::types::OrderStatus;
use uuid::Uuid;

/// List filter flags, mirroring the keys of the list URL.
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Status to include (repeatable)
    #[arg(long = "status", value_name = "STATUS")]
    pub status: Vec<OrderStatus>,
    /// Assignee user id, or `unassigned`
    #[arg(long, value_name = "USER")]
    pub assignee: Option<String>,
    #[arg(long, value_name = "CLIENT_ID")]
    pub client: Option<Uuid>,
    /// Search address, city and client name
    #[arg(long)]
    pub q: Option<String>,
    /// Earliest due date (YYYY-MM-DD)
    #[arg(long)]
    pub due_from: Option<NaiveDate>,
    /// Latest due date (YYYY-MM-DD)
    #[arg(long)]
    pub due_to: Option<NaiveDate>,
    #[arg(long)]
    pub include_archived: bool,
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub page_size: Option<u32>,
}

impl FilterArgs {
    pub fn is_empty(&self) -> bool {
        self.changes().is_empty()
    }

    /// The flags as edits. `page` goes last so the other edits do not
    /// reset it.
    pub fn changes(&self) -> Vec<FilterChange> {
        let mut out = Vec::new();
        if !self.status.is_empty() {
            out.push(FilterChange::Status(self.status.clone()));
        }
        if let Some(a) = &self.assignee {
            out.push(FilterChange::Assignee(AssigneeFilter::parse(a)));
        }
        if self.client.is_some() {
            out.push(FilterChange::Client(self.client));
        }
        if self.q.is_some() {
            out.push(FilterChange::Query(self.q.clone()));
        }
        if self.due_from.is_some() {
            out.push(FilterChange::DueFrom(self.due_from));
        }
        if self.due_to.is_some() {
            out.push(FilterChange::DueTo(self.due_to));
        }
        if self.include_archived {
            out.push(FilterChange::IncludeArchived(true));
        }
        if let Some(n) = self.page_size {
            out.push(FilterChange::PageSize(n));
        }
        if let Some(p) = self.page {
            out.push(FilterChange::Page(p));
        }
        out
    }

    pub fn apply_to(&self, filters: &mut OrderFilters) {
        for change in self.changes() {
            filters.apply(change);
        }
    }
}
