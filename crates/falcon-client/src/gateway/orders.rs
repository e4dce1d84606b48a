use chrono::{DateTime, Utc};
use falcon_core::activity::{ActivityEvent, ActivityId, Appointment};
use falcon_core::filters::{AssigneeFilter, OrderFilters};
use falcon_core::order::{KpiWindow, Kpis, NewOrder, OrderView, Page, WorkloadRow};
use falcon_core::types::OrderStatus;
use serde_json::json;
use uuid::Uuid;

use super::{Query, RestGateway};
use crate::error::Result;

const ORDERS_VIEW: &str = "v_orders";
const ACTIVITY_VIEW: &str = "v_order_activity";
const SEARCH_COLUMNS: &[&str] = &["address", "city", "client_name"];

/// Row filter for the orders list, before pagination.
pub(crate) fn list_query(filters: &OrderFilters) -> Query {
    let mut q = Query::new().select("*").order("created_at", false);
    if !filters.include_archived {
        q = q.not_true("is_archived");
    }
    if !filters.status.is_empty() {
        q = q.in_list("status", filters.status.iter().map(|s| s.as_str()));
    }
    q = match filters.assignee {
        AssigneeFilter::Any => q,
        AssigneeFilter::Unassigned => q.is_null("assigned_to"),
        AssigneeFilter::User(id) => q.eq("assigned_to", id),
    };
    if let Some(client) = filters.client_id {
        q = q.eq("client_id", client);
    }
    if let Some(d) = filters.due_from {
        q = q.gte("due_date", d);
    }
    if let Some(d) = filters.due_to {
        q = q.lte("due_date", d);
    }
    if let Some(term) = filters.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        q = q.ilike_any(SEARCH_COLUMNS, term);
    }
    let (from, to) = filters.row_range();
    q.range(from, to)
}

impl RestGateway {
    // -- reads --------------------------------------------------------------

    /// One page of the orders list plus the total number of matches.
    pub async fn list_orders(&self, filters: &OrderFilters) -> Result<Page<OrderView>> {
        let (rows, total): (Vec<OrderView>, _) = self
            .select_counted(ORDERS_VIEW, &list_query(filters))
            .await?;
        let total = total.unwrap_or(rows.len() as u64);
        Ok(Page {
            rows,
            total,
            page: filters.page.max(1),
            page_size: filters.page_size,
        })
    }

    /// Unarchived orders in `statuses`, newest first.
    pub async fn fetch_board_orders(&self, statuses: &[OrderStatus]) -> Result<Vec<OrderView>> {
        let q = Query::new()
            .select("*")
            .in_list("status", statuses.iter().map(|s| s.as_str()))
            .not_true("is_archived")
            .order("created_at", false);
        self.select(ORDERS_VIEW, &q).await
    }

    pub async fn fetch_order(&self, order_id: Uuid) -> Result<Option<OrderView>> {
        self.select_one(ORDERS_VIEW, Query::new().select("*").eq("id", order_id))
            .await
    }

    pub async fn fetch_client_orders(&self, client_id: Uuid) -> Result<Vec<OrderView>> {
        let q = Query::new()
            .select("*")
            .eq("client_id", client_id)
            .order("created_at", false);
        self.select(ORDERS_VIEW, &q).await
    }

    /// Activity for one order, newest first. Schemas that name the timestamp
    /// `created_at` instead of `occurred_at` are retried with that column.
    pub async fn fetch_activity(&self, order_id: Uuid) -> Result<Vec<ActivityEvent>> {
        let base = Query::new().select("*").eq("order_id", order_id);
        match self
            .select(ACTIVITY_VIEW, &base.clone().order("occurred_at", false))
            .await
        {
            Err(e) if e.is_undefined_column() => {
                tracing::debug!("activity view has no occurred_at, ordering by created_at");
                self.select(ACTIVITY_VIEW, &base.order("created_at", false))
                    .await
            }
            other => other,
        }
    }

    pub async fn fetch_appointments(&self, order_id: Uuid) -> Result<Vec<Appointment>> {
        let q = Query::new()
            .select("*")
            .eq("order_id", order_id)
            .order("scheduled_at", true);
        self.select("order_appointments", &q).await
    }

    /// Open orders per assignee, busiest first.
    pub async fn fetch_workload(&self) -> Result<Vec<WorkloadRow>> {
        let q = Query::new()
            .select("assigned_to,assignee_name,open_count:count(id)")
            .in_list("status", OrderStatus::open().iter().map(|s| s.as_str()))
            .order("open_count", false);
        self.select(ORDERS_VIEW, &q).await
    }

    /// Dashboard counters relative to `now`. The five counts run concurrently
    /// and the first failure wins.
    pub async fn fetch_kpis(&self, now: DateTime<Utc>) -> Result<Kpis> {
        let w = KpiWindow::at(now);
        let open = Query::new().in_list("status", OrderStatus::open().iter().map(|s| s.as_str()));
        let in_review = Query::new().eq("status", OrderStatus::InReview);
        let due_this_week = Query::new()
            .neq("status", OrderStatus::Completed)
            .gte("due_date", w.today)
            .lt("due_date", w.week_end);
        let overdue = Query::new()
            .neq("status", OrderStatus::Completed)
            .lt("due_date", w.today);
        let new_this_7 = Query::new().gte("created_at", w.created_since.to_rfc3339());

        let (total_open, in_review, due_this_week, overdue, new_this_7) = tokio::try_join!(
            self.count(ORDERS_VIEW, &open),
            self.count(ORDERS_VIEW, &in_review),
            self.count(ORDERS_VIEW, &due_this_week),
            self.count(ORDERS_VIEW, &overdue),
            self.count(ORDERS_VIEW, &new_this_7),
        )?;
        Ok(Kpis {
            total_open,
            in_review,
            due_this_week,
            overdue,
            new_this_7,
        })
    }

    // -- procedures ---------------------------------------------------------

    pub async fn create_order(&self, order: &NewOrder) -> Result<Uuid> {
        let id: Uuid = self
            .rpc(
                "create_order",
                json!({
                    "p_organization_id": order.organization_id,
                    "p_client_id": order.client_id,
                    "p_address": order.address,
                    "p_city": order.city,
                    "p_state": order.state,
                    "p_postal_code": order.postal_code,
                    "p_due_date": order.due_date,
                }),
            )
            .await?;
        tracing::info!(order_id = %id, "created order");
        Ok(id)
    }

    pub async fn set_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
        let _: serde_json::Value = self
            .rpc(
                "set_order_status",
                json!({ "p_order_id": order_id, "p_status": status }),
            )
            .await?;
        tracing::info!(%order_id, %status, "status updated");
        Ok(())
    }

    pub async fn assign_order(&self, order_id: Uuid, user_id: Uuid) -> Result<()> {
        let _: serde_json::Value = self
            .rpc(
                "assign_order",
                json!({ "p_order_id": order_id, "p_user_id": user_id }),
            )
            .await?;
        tracing::info!(%order_id, assignee = %user_id, "order assigned");
        Ok(())
    }

    /// Assign every order in `order_ids`; returns how many were updated.
    /// An empty list makes no call.
    pub async fn bulk_assign_orders(&self, order_ids: &[Uuid], assignee: Uuid) -> Result<u64> {
        if order_ids.is_empty() {
            return Ok(0);
        }
        let updated: Option<u64> = self
            .rpc(
                "bulk_assign_orders",
                json!({ "p_order_ids": order_ids, "p_assigned_to": assignee }),
            )
            .await?;
        let updated = updated.unwrap_or(0);
        tracing::info!(updated, %assignee, "bulk assignment");
        Ok(updated)
    }

    /// Archive (or restore, with `archived = false`) an order.
    pub async fn archive_order(&self, order_id: Uuid, archived: bool) -> Result<()> {
        let _: serde_json::Value = self
            .rpc(
                "archive_order",
                json!({ "p_order_id": order_id, "p_is_archived": archived }),
            )
            .await?;
        tracing::info!(%order_id, archived, "archive flag updated");
        Ok(())
    }

    pub async fn set_appointment(
        &self,
        order_id: Uuid,
        at: DateTime<Utc>,
        note: Option<&str>,
    ) -> Result<()> {
        let _: serde_json::Value = self
            .rpc(
                "set_order_appointment",
                json!({ "p_order_id": order_id, "p_datetime": at, "p_note": note }),
            )
            .await?;
        tracing::info!(%order_id, %at, "appointment set");
        Ok(())
    }

    pub async fn clear_appointment(&self, order_id: Uuid) -> Result<()> {
        let _: serde_json::Value = self
            .rpc("clear_appointment", json!({ "p_order_id": order_id }))
            .await?;
        tracing::info!(%order_id, "appointment cleared");
        Ok(())
    }

    /// Append a note; returns the id of the new activity row.
    pub async fn add_order_note(&self, order_id: Uuid, body: &str) -> Result<ActivityId> {
        let id: ActivityId = self
            .rpc(
                "add_order_note",
                json!({ "p_order_id": order_id, "p_body": body }),
            )
            .await?;
        tracing::info!(%order_id, activity_id = %id, "note added");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::gateway;
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use mockito::Matcher;

    const ORDER: &str = "6f1c1b1e-0000-4000-8000-000000000001";

    fn order_json(id: &str, status: &str, created: &str) -> String {
        format!(
            r#"{{"id":"{id}","status":"{status}","created_at":"{created}","address":"1 Elm St","client_name":"First Lending"}}"#
        )
    }

    #[test]
    fn list_query_encodes_filters() {
        let filters = OrderFilters {
            status: vec![OrderStatus::New, OrderStatus::InReview],
            assignee: AssigneeFilter::Unassigned,
            q: Some(" elm ".into()),
            due_from: NaiveDate::from_ymd_opt(2026, 3, 1),
            page: 2,
            ..Default::default()
        };
        let q = list_query(&filters);
        assert_eq!(q.get("status"), Some("in.(new,in_review)"));
        assert_eq!(q.get("assigned_to"), Some("is.null"));
        assert_eq!(q.get("is_archived"), Some("not.is.true"));
        assert_eq!(q.get("due_date"), Some("gte.2026-03-01"));
        assert_eq!(
            q.get("or"),
            Some("(address.ilike.*elm*,city.ilike.*elm*,client_name.ilike.*elm*)")
        );
        assert_eq!(q.get("offset"), Some("20"));
        assert_eq!(q.get("limit"), Some("20"));
    }

    #[test]
    fn archived_included_on_request() {
        let q = list_query(&OrderFilters {
            include_archived: true,
            ..Default::default()
        });
        assert_eq!(q.get("is_archived"), None);
        assert_eq!(q.get("status"), None);
    }

    #[tokio::test]
    async fn list_orders_reads_total_from_content_range() {
        let mut server = mockito::Server::new_async().await;
        let body = format!("[{}]", order_json(ORDER, "new", "2026-03-01T09:00:00Z"));
        let mock = server
            .mock("GET", "/rest/v1/v_orders")
            .match_header("prefer", "count=exact")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("status".into(), "in.(new)".into()),
                Matcher::UrlEncoded("order".into(), "created_at.desc".into()),
            ]))
            .with_status(206)
            .with_header("content-range", "0-0/41")
            .with_body(body)
            .create_async()
            .await;

        let gw = gateway(&server);
        let page = gw
            .list_orders(&OrderFilters {
                status: vec![OrderStatus::New],
                ..Default::default()
            })
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.total, 41);
        assert_eq!(page.page_count(), 3);
        assert!(page.has_next());
    }

    #[tokio::test]
    async fn fetch_order_missing_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/v_orders")
            .match_query(Matcher::UrlEncoded("id".into(), format!("eq.{ORDER}")))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let gw = gateway(&server);
        let id = Uuid::parse_str(ORDER).unwrap();
        assert!(gw.fetch_order(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn activity_falls_back_to_created_at() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/rest/v1/v_order_activity")
            .match_query(Matcher::UrlEncoded("order".into(), "occurred_at.desc".into()))
            .with_status(400)
            .with_body(r#"{"code":"42703","message":"column v_order_activity.occurred_at does not exist"}"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/rest/v1/v_order_activity")
            .match_query(Matcher::UrlEncoded("order".into(), "created_at.desc".into()))
            .with_status(200)
            .with_body(format!(
                r#"[{{"id":"a1","order_id":"{ORDER}","kind":"note","message":"hi","created_at":"2026-03-02T10:00:00Z","meta":null}}]"#
            ))
            .create_async()
            .await;

        let gw = gateway(&server);
        let rows = gw
            .fetch_activity(Uuid::parse_str(ORDER).unwrap())
            .await
            .unwrap();
        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn bulk_assign_empty_makes_no_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/rpc/bulk_assign_orders")
            .expect(0)
            .create_async()
            .await;
        let gw = gateway(&server);
        assert_eq!(gw.bulk_assign_orders(&[], Uuid::nil()).await.unwrap(), 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn bulk_assign_sends_ids() {
        let mut server = mockito::Server::new_async().await;
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let who = Uuid::from_u128(9);
        let mock = server
            .mock("POST", "/rest/v1/rpc/bulk_assign_orders")
            .match_body(Matcher::Json(serde_json::json!({
                "p_order_ids": [a, b],
                "p_assigned_to": who,
            })))
            .with_status(200)
            .with_body("2")
            .create_async()
            .await;
        let gw = gateway(&server);
        assert_eq!(gw.bulk_assign_orders(&[a, b], who).await.unwrap(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn note_id_may_be_numeric() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rest/v1/rpc/add_order_note")
            .with_status(200)
            .with_body("1234")
            .create_async()
            .await;
        let gw = gateway(&server);
        let id = gw.add_order_note(Uuid::from_u128(1), "called borrower").await.unwrap();
        assert_eq!(id, ActivityId::Numeric(1234));
    }

    #[tokio::test]
    async fn void_procedures_accept_empty_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rest/v1/rpc/clear_appointment")
            .with_status(204)
            .create_async()
            .await;
        let gw = gateway(&server);
        gw.clear_appointment(Uuid::from_u128(1)).await.unwrap();
    }

    #[tokio::test]
    async fn kpis_issue_five_counts() {
        let mut server = mockito::Server::new_async().await;
        let specs = vec![
            (Matcher::UrlEncoded("status".into(), "in.(new,in_review)".into()), "12"),
            (Matcher::UrlEncoded("status".into(), "eq.in_review".into()), "5"),
            (
                // due_date appears twice; match the raw query for both bounds.
                Matcher::AllOf(vec![
                    Matcher::UrlEncoded("status".into(), "neq.completed".into()),
                    Matcher::Regex(r"due_date=gte\.2026-03-10".into()),
                    Matcher::Regex(r"due_date=lt\.2026-03-17".into()),
                ]),
                "3",
            ),
            (
                Matcher::AllOf(vec![
                    Matcher::UrlEncoded("status".into(), "neq.completed".into()),
                    Matcher::UrlEncoded("due_date".into(), "lt.2026-03-10".into()),
                ]),
                "2",
            ),
            (Matcher::Regex(r"created_at=gte\.2026-03-03T12".into()), "7"),
        ];
        let mut mocks = Vec::new();
        for (matcher, total) in specs {
            mocks.push(
                server
                    .mock("HEAD", "/rest/v1/v_orders")
                    .match_header("prefer", "count=exact")
                    .match_query(matcher)
                    .with_status(200)
                    .with_header("content-range", &format!("*/{total}"))
                    .create_async()
                    .await,
            );
        }

        let gw = gateway(&server);
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let kpis = gw.fetch_kpis(now).await.unwrap();
        for m in &mocks {
            m.assert_async().await;
        }
        assert_eq!(
            kpis,
            Kpis {
                total_open: 12,
                in_review: 5,
                due_this_week: 3,
                overdue: 2,
                new_this_7: 7,
            }
        );
    }
}
