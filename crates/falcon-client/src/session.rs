//! Single-owner view state: the kanban board and the filtered orders list.
//!
//! A session owns its data and a backend handle and is driven by `&mut self`
//! calls, so no locks guard the board. Realtime notifications are fed in via
//! `watch`, which turns each one into a full reload.

use chrono::{DateTime, Utc};
use falcon_core::board::{Board, MoveOutcome, MoveRequest};
use falcon_core::filters::{hydrate, FilterChange, Hydration, OrderFilters};
use falcon_core::load::LoadState;
use falcon_core::order::{OrderView, Page};
use falcon_core::settings::{KanbanSettings, UserPrefs, WipLimits};
use falcon_core::types::OrderStatus;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::backend::{BoardBackend, OrdersSource};
use crate::error::Result;
use crate::realtime::{ChangeFilter, ChangeKind, Subscription};

pub const ORDERS_TABLE: &str = "orders";

/// Inserts and updates on `orders`, narrowed to one organisation when known.
pub fn orders_filter(schema: &str, organization_id: Option<Uuid>) -> ChangeFilter {
    let filter = ChangeFilter::table(schema, ORDERS_TABLE)
        .events(&[ChangeKind::Insert, ChangeKind::Update]);
    match organization_id {
        Some(org) => filter.eq("organization_id", org),
        None => filter,
    }
}

/// Wait for the next change and report whether the feed is still open.
async fn next_change(sub: &mut Subscription) -> Result<bool> {
    match sub.next().await {
        Some(Ok(event)) => {
            tracing::info!(table = %event.table, kind = %event.kind, "change received");
            Ok(true)
        }
        Some(Err(e)) => Err(e),
        None => Ok(false),
    }
}

// ---------------------------------------------------------------------------
// BoardSession
// ---------------------------------------------------------------------------

pub struct BoardSession<B> {
    backend: B,
    settings: KanbanSettings,
    board: Board,
    /// `Ready` carries the time of the last successful load.
    state: LoadState<DateTime<Utc>>,
}

impl<B: BoardBackend> BoardSession<B> {
    pub fn new(backend: B, settings: KanbanSettings) -> Self {
        Self {
            backend,
            settings,
            board: Board::new(),
            state: LoadState::Idle,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn state(&self) -> &LoadState<DateTime<Utc>> {
        &self.state
    }

    pub fn settings(&self) -> &KanbanSettings {
        &self.settings
    }

    pub fn wip_limits(&self) -> WipLimits {
        self.settings.wip_limits()
    }

    /// Takes effect on the next reload.
    pub fn set_show_cancelled(&mut self, show: bool) {
        self.settings.show_cancelled = show;
    }

    /// Columns shown. Cancelled orders only when enabled.
    pub fn visible_statuses(&self) -> Vec<OrderStatus> {
        OrderStatus::all()
            .iter()
            .copied()
            .filter(|s| *s != OrderStatus::Cancelled || self.settings.show_cancelled)
            .collect()
    }

    /// Columns fetched on reload: the visible ones plus any hidden column
    /// with a WIP limit, whose cards still count against that limit.
    pub fn loaded_statuses(&self) -> Vec<OrderStatus> {
        let wip = self.wip_limits();
        OrderStatus::all()
            .iter()
            .copied()
            .filter(|s| {
                *s != OrderStatus::Cancelled
                    || self.settings.show_cancelled
                    || wip.limit_for(*s).is_some()
            })
            .collect()
    }

    pub fn change_filter(&self, schema: &str) -> ChangeFilter {
        orders_filter(schema, Some(self.settings.organization_id))
    }

    /// Replace the board with a fresh fetch. On failure the previous board
    /// stays visible and the state carries the error text.
    pub async fn reload(&mut self) -> Result<()> {
        self.state = LoadState::Loading;
        let statuses = self.loaded_statuses();
        match self.backend.fetch_board_orders(&statuses).await {
            Ok(rows) => {
                self.board = Board::from_orders(rows);
                self.state = LoadState::Ready(Utc::now());
                tracing::debug!(cards = self.board.total(), "board loaded");
                Ok(())
            }
            Err(e) => {
                self.state = LoadState::Error(e.to_string());
                Err(e)
            }
        }
    }

    /// Move a card: validate locally, apply optimistically, then persist.
    ///
    /// Rejected moves return before any remote call. A remote failure forces
    /// a full reload and returns the remote error unchanged; there is no
    /// partial rollback. A successful move is followed by a reload so server
    /// derived fields and ordering come back.
    pub async fn move_card(&mut self, req: &MoveRequest) -> Result<MoveOutcome> {
        let wip = self.wip_limits();
        let outcome = self.board.move_card(req, &wip)?;
        if outcome.is_noop() {
            return Ok(outcome);
        }

        if let Err(e) = self.persist(&outcome).await {
            tracing::warn!(order_id = %outcome.order_id, error = %e, "move failed, reloading board");
            if let Err(reload) = self.reload().await {
                tracing::warn!(error = %reload, "reload after failed move also failed");
            }
            return Err(e);
        }

        tracing::info!(
            order_id = %outcome.order_id,
            status = ?outcome.status_changed,
            assignee = ?outcome.assignee_changed,
            "card moved"
        );
        if let Err(e) = self.reload().await {
            tracing::warn!(error = %e, "reload after move failed");
        }
        Ok(outcome)
    }

    async fn persist(&self, outcome: &MoveOutcome) -> Result<()> {
        if let Some(status) = outcome.status_changed {
            self.backend.set_order_status(outcome.order_id, status).await?;
        }
        if let Some(assignee) = outcome.assignee_changed {
            self.backend.assign_order(outcome.order_id, assignee).await?;
        }
        Ok(())
    }

    /// Wait for one change on `sub` and reload. Returns `false` once the
    /// feed has closed. Reload failures are recorded in [`Self::state`];
    /// only feed errors are returned.
    pub async fn watch(&mut self, sub: &mut Subscription) -> Result<bool> {
        if !next_change(sub).await? {
            return Ok(false);
        }
        if let Err(e) = self.reload().await {
            tracing::warn!(error = %e, "board reload failed");
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// OrdersListSession
// ---------------------------------------------------------------------------

pub struct OrdersListSession<S> {
    source: S,
    filters: OrderFilters,
    state: LoadState<Page<OrderView>>,
}

impl<S: OrdersSource> OrdersListSession<S> {
    pub fn new(source: S, filters: OrderFilters) -> Self {
        Self {
            source,
            filters,
            state: LoadState::Idle,
        }
    }

    /// Open the list for a query string. On a first visit (no keys at all)
    /// the saved defaults apply and the query to write back is returned.
    pub fn from_query(source: S, query: &str, prefs: &UserPrefs) -> (Self, Option<String>) {
        match hydrate(query, prefs) {
            Hydration::Decoded(filters) => (Self::new(source, filters), None),
            Hydration::FromPrefs { filters, query } => {
                tracing::debug!(%query, "list filters hydrated from preferences");
                (Self::new(source, filters), Some(query))
            }
        }
    }

    pub fn filters(&self) -> &OrderFilters {
        &self.filters
    }

    pub fn state(&self) -> &LoadState<Page<OrderView>> {
        &self.state
    }

    pub fn page(&self) -> Option<&Page<OrderView>> {
        self.state.ready()
    }

    pub fn query_string(&self) -> String {
        self.filters.to_query_string()
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.state = LoadState::Loading;
        match self.source.list_orders(&self.filters).await {
            Ok(page) => {
                tracing::debug!(rows = page.rows.len(), total = page.total, "orders loaded");
                self.state = LoadState::Ready(page);
                Ok(())
            }
            Err(e) => {
                self.state = LoadState::Error(e.to_string());
                Err(e)
            }
        }
    }

    /// Apply a filter edit and refetch.
    pub async fn apply(&mut self, change: FilterChange) -> Result<()> {
        self.filters.apply(change);
        self.refresh().await
    }

    /// Wait for one change on `sub` and refresh. Returns `false` once the
    /// feed has closed.
    pub async fn watch(&mut self, sub: &mut Subscription) -> Result<bool> {
        if !next_change(sub).await? {
            return Ok(false);
        }
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "orders list refresh failed");
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
