//! Kanban board: orders bucketed by status, moved optimistically.
//!
//! The board is plain data plus pure update functions. A move is validated
//! against the transition table and the WIP limits before anything changes,
//! so a rejected move always leaves the board exactly as it was.

use crate::error::{FalconError, Result};
use crate::order::OrderView;
use crate::settings::WipLimits;
use crate::types::OrderStatus;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// MoveRequest / MoveOutcome
// ---------------------------------------------------------------------------

/// A drag-and-drop of one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub order_id: Uuid,
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Lane the card was dragged out of, when the board is split by assignee.
    /// When set, the card must currently belong to that lane.
    pub from_assignee: Option<Uuid>,
    /// Lane the card was dropped into; `None` keeps the current assignee.
    pub to_assignee: Option<Uuid>,
}

impl MoveRequest {
    pub fn status(order_id: Uuid, from: OrderStatus, to: OrderStatus) -> Self {
        Self {
            order_id,
            from,
            to,
            from_assignee: None,
            to_assignee: None,
        }
    }

    pub fn with_assignee(mut self, from: Option<Uuid>, to: Uuid) -> Self {
        self.from_assignee = from;
        self.to_assignee = Some(to);
        self
    }
}

/// What an accepted move changed, i.e. which remote calls it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub order_id: Uuid,
    /// New status when the column changed.
    pub status_changed: Option<OrderStatus>,
    /// New assignee when the lane changed.
    pub assignee_changed: Option<Uuid>,
}

impl MoveOutcome {
    pub fn is_noop(&self) -> bool {
        self.status_changed.is_none() && self.assignee_changed.is_none()
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Board {
    columns: BTreeMap<OrderStatus, Vec<OrderView>>,
}

/// Cards of one column that share an assignee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lane<'a> {
    pub assignee: Option<Uuid>,
    pub assignee_name: Option<&'a str>,
    pub cards: Vec<&'a OrderView>,
}

impl Board {
    pub fn new() -> Self {
        let columns = OrderStatus::all().iter().map(|s| (*s, Vec::new())).collect();
        Self { columns }
    }

    /// Bucket rows by status, newest first. The sort is stable, so rows with
    /// equal timestamps keep the order they were fetched in.
    pub fn from_orders(rows: impl IntoIterator<Item = OrderView>) -> Self {
        let mut board = Self::new();
        for row in rows {
            board.columns.entry(row.status).or_default().push(row);
        }
        for column in board.columns.values_mut() {
            column.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        board
    }

    pub fn column(&self, status: OrderStatus) -> &[OrderView] {
        self.columns.get(&status).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, status: OrderStatus) -> usize {
        self.column(status).len()
    }

    pub fn total(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }

    pub fn find(&self, order_id: Uuid) -> Option<&OrderView> {
        self.columns
            .values()
            .flat_map(|c| c.iter())
            .find(|o| o.id == order_id)
    }

    /// True when `status` is at or over its limit.
    pub fn is_full(&self, status: OrderStatus, wip: &WipLimits) -> bool {
        wip.limit_for(status)
            .is_some_and(|limit| self.count(status) >= limit as usize)
    }

    /// Split a column into assignee lanes. Lanes follow the first appearance
    /// of each assignee in the column; the unassigned lane always comes last.
    pub fn lanes(&self, status: OrderStatus) -> Vec<Lane<'_>> {
        let mut lanes: Vec<Lane<'_>> = Vec::new();
        let mut unassigned: Vec<&OrderView> = Vec::new();
        for card in self.column(status) {
            match card.assigned_to {
                None => unassigned.push(card),
                Some(id) => match lanes.iter_mut().find(|l| l.assignee == Some(id)) {
                    Some(lane) => lane.cards.push(card),
                    None => lanes.push(Lane {
                        assignee: Some(id),
                        assignee_name: card.assignee_name.as_deref(),
                        cards: vec![card],
                    }),
                },
            }
        }
        if !unassigned.is_empty() {
            lanes.push(Lane {
                assignee: None,
                assignee_name: None,
                cards: unassigned,
            });
        }
        lanes
    }

    /// Check a move without applying it.
    pub fn validate_move(&self, req: &MoveRequest, wip: &WipLimits) -> Result<MoveOutcome> {
        let same_column = req.from == req.to;
        if !same_column && !req.from.can_transition_to(req.to) {
            return Err(FalconError::InvalidTransition {
                from: req.from,
                to: req.to,
            });
        }

        let card = self
            .column(req.from)
            .iter()
            .find(|o| o.id == req.order_id)
            .filter(|o| req.from_assignee.is_none() || o.assigned_to == req.from_assignee)
            .ok_or(FalconError::CardNotFound {
                order_id: req.order_id,
                status: req.from,
            })?;

        // Lane changes inside a column never add a card to it.
        if !same_column {
            if let Some(limit) = wip.limit_for(req.to) {
                if self.count(req.to) >= limit as usize {
                    return Err(FalconError::WipLimitReached {
                        status: req.to,
                        limit,
                    });
                }
            }
        }

        let assignee_changed = req.to_assignee.filter(|to| Some(*to) != card.assigned_to);

        Ok(MoveOutcome {
            order_id: req.order_id,
            status_changed: (!same_column).then_some(req.to),
            assignee_changed,
        })
    }

    /// Validate and apply a move. On success the card sits at the head of
    /// the destination column with its status and assignee updated.
    pub fn move_card(&mut self, req: &MoveRequest, wip: &WipLimits) -> Result<MoveOutcome> {
        let outcome = self.validate_move(req, wip)?;
        if outcome.is_noop() {
            return Ok(outcome);
        }

        let source = self.columns.entry(req.from).or_default();
        let idx = source
            .iter()
            .position(|o| o.id == req.order_id)
            .ok_or(FalconError::CardNotFound {
                order_id: req.order_id,
                status: req.from,
            })?;
        let mut card = source.remove(idx);

        card.status = req.to;
        if let Some(assignee) = outcome.assignee_changed {
            card.assigned_to = Some(assignee);
            // The name is derived server-side; the reload fills it back in.
            card.assignee_name = None;
        }
        self.columns.entry(req.to).or_default().insert(0, card);

        tracing::debug!(
            order_id = %req.order_id,
            from = %req.from,
            to = %req.to,
            "applied optimistic move"
        );
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn order(n: u128, status: OrderStatus, minute: u32) -> OrderView {
        OrderView {
            id: Uuid::from_u128(n),
            organization_id: None,
            client_id: None,
            assigned_to: None,
            address: Some(format!("{n} Main St")),
            city: None,
            state: None,
            postal_code: None,
            status,
            due_date: None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, minute, 0).unwrap(),
            updated_at: None,
            is_archived: Some(false),
            appointment_start: None,
            appointment_end: None,
            client_name: None,
            assignee_name: None,
        }
    }

    fn board_with(in_review: usize) -> Board {
        let mut rows = vec![order(1, OrderStatus::New, 0)];
        for i in 0..in_review {
            rows.push(order(100 + i as u128, OrderStatus::InReview, i as u32));
        }
        Board::from_orders(rows)
    }

    #[test]
    fn columns_sorted_newest_first() {
        let board = Board::from_orders(vec![
            order(1, OrderStatus::New, 1),
            order(2, OrderStatus::New, 5),
            order(3, OrderStatus::New, 3),
        ]);
        let ids: Vec<_> = board.column(OrderStatus::New).iter().map(|o| o.id).collect();
        assert_eq!(
            ids,
            vec![Uuid::from_u128(2), Uuid::from_u128(3), Uuid::from_u128(1)]
        );
    }

    #[test]
    fn ties_keep_fetch_order() {
        let board = Board::from_orders(vec![
            order(5, OrderStatus::New, 0),
            order(4, OrderStatus::New, 0),
            order(6, OrderStatus::New, 0),
        ]);
        let ids: Vec<_> = board.column(OrderStatus::New).iter().map(|o| o.id).collect();
        assert_eq!(
            ids,
            vec![Uuid::from_u128(5), Uuid::from_u128(4), Uuid::from_u128(6)]
        );
    }

    #[test]
    fn every_pair_outside_the_table_is_rejected() {
        for from in OrderStatus::all() {
            for to in OrderStatus::all() {
                if from == to || from.can_transition_to(*to) {
                    continue;
                }
                let mut board = Board::from_orders(vec![order(1, *from, 0)]);
                let before = board.clone();
                let err = board
                    .move_card(&MoveRequest::status(Uuid::from_u128(1), *from, *to), &WipLimits::default())
                    .unwrap_err();
                assert!(matches!(err, FalconError::InvalidTransition { .. }));
                assert_eq!(board, before);
            }
        }
    }

    #[test]
    fn new_to_completed_is_invalid() {
        let mut board = board_with(0);
        let before = board.clone();
        let err = board
            .move_card(
                &MoveRequest::status(Uuid::from_u128(1), OrderStatus::New, OrderStatus::Completed),
                &WipLimits::default(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid transition: new → completed");
        assert!(err.is_rejection());
        assert_eq!(board, before);
    }

    #[test]
    fn full_column_rejects_move() {
        let wip = WipLimits::default().with_limit(OrderStatus::InReview, 3);
        let mut board = board_with(3);
        let before = board.clone();
        let err = board
            .move_card(
                &MoveRequest::status(Uuid::from_u128(1), OrderStatus::New, OrderStatus::InReview),
                &wip,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            FalconError::WipLimitReached {
                status: OrderStatus::InReview,
                limit: 3
            }
        ));
        assert_eq!(board, before);
    }

    #[test]
    fn move_below_limit_fills_column() {
        let wip = WipLimits::default().with_limit(OrderStatus::InReview, 3);
        let mut board = board_with(2);
        let outcome = board
            .move_card(
                &MoveRequest::status(Uuid::from_u128(1), OrderStatus::New, OrderStatus::InReview),
                &wip,
            )
            .unwrap();
        assert_eq!(outcome.status_changed, Some(OrderStatus::InReview));
        assert_eq!(board.count(OrderStatus::InReview), 3);
        assert_eq!(board.count(OrderStatus::New), 0);
        let head = &board.column(OrderStatus::InReview)[0];
        assert_eq!(head.id, Uuid::from_u128(1));
        assert_eq!(head.status, OrderStatus::InReview);
        assert!(board.is_full(OrderStatus::InReview, &wip));
    }

    #[test]
    fn lane_change_ignores_wip_limit() {
        let wip = WipLimits::default().with_limit(OrderStatus::InReview, 2);
        let mut board = board_with(2);
        let card = Uuid::from_u128(100);
        let user = Uuid::from_u128(900);
        let outcome = board
            .move_card(
                &MoveRequest::status(card, OrderStatus::InReview, OrderStatus::InReview)
                    .with_assignee(None, user),
                &wip,
            )
            .unwrap();
        assert_eq!(outcome.status_changed, None);
        assert_eq!(outcome.assignee_changed, Some(user));
        assert_eq!(board.count(OrderStatus::InReview), 2);
        assert_eq!(board.find(card).unwrap().assigned_to, Some(user));
    }

    #[test]
    fn same_column_same_lane_is_noop() {
        let mut board = board_with(1);
        let before = board.clone();
        let outcome = board
            .move_card(
                &MoveRequest::status(Uuid::from_u128(1), OrderStatus::New, OrderStatus::New),
                &WipLimits::default(),
            )
            .unwrap();
        assert!(outcome.is_noop());
        assert_eq!(board, before);
    }

    #[test]
    fn stale_lane_is_rejected() {
        let mut board = board_with(1);
        let req = MoveRequest::status(Uuid::from_u128(100), OrderStatus::InReview, OrderStatus::Completed)
            .with_assignee(Some(Uuid::from_u128(900)), Uuid::from_u128(901));
        let err = board.move_card(&req, &WipLimits::default()).unwrap_err();
        assert!(matches!(err, FalconError::CardNotFound { .. }));
        assert_eq!(board.count(OrderStatus::InReview), 1);
    }

    #[test]
    fn missing_card_is_rejected() {
        let mut board = board_with(1);
        let err = board
            .move_card(
                &MoveRequest::status(Uuid::from_u128(77), OrderStatus::New, OrderStatus::InReview),
                &WipLimits::default(),
            )
            .unwrap_err();
        assert!(matches!(err, FalconError::CardNotFound { .. }));
    }

    #[test]
    fn accepted_moves_never_exceed_limits() {
        let wip = WipLimits::default()
            .with_limit(OrderStatus::InReview, 2)
            .with_limit(OrderStatus::Cancelled, 1);
        let rows: Vec<_> = (1..=6).map(|n| order(n, OrderStatus::New, n as u32)).collect();
        let mut board = Board::from_orders(rows);
        for n in 1..=6u128 {
            for to in [OrderStatus::InReview, OrderStatus::Cancelled] {
                let req = MoveRequest::status(Uuid::from_u128(n), OrderStatus::New, to);
                if board.move_card(&req, &wip).is_ok() {
                    break;
                }
            }
            for status in OrderStatus::all() {
                if let Some(limit) = wip.limit_for(*status) {
                    assert!(board.count(*status) <= limit as usize);
                }
            }
        }
        assert_eq!(board.count(OrderStatus::InReview), 2);
        assert_eq!(board.count(OrderStatus::Cancelled), 1);
        assert_eq!(board.count(OrderStatus::New), 3);
    }

    #[test]
    fn lanes_group_by_assignee_with_unassigned_last() {
        let alice = Uuid::from_u128(501);
        let bob = Uuid::from_u128(502);
        let mut a = order(1, OrderStatus::New, 4);
        a.assigned_to = Some(alice);
        a.assignee_name = Some("Alice".into());
        let b = order(2, OrderStatus::New, 3);
        let mut c = order(3, OrderStatus::New, 2);
        c.assigned_to = Some(bob);
        let mut d = order(4, OrderStatus::New, 1);
        d.assigned_to = Some(alice);
        let board = Board::from_orders(vec![a, b, c, d]);

        let lanes = board.lanes(OrderStatus::New);
        assert_eq!(lanes.len(), 3);
        assert_eq!(lanes[0].assignee, Some(alice));
        assert_eq!(lanes[0].assignee_name, Some("Alice"));
        assert_eq!(lanes[0].cards.len(), 2);
        assert_eq!(lanes[1].assignee, Some(bob));
        assert_eq!(lanes[2].assignee, None);
    }
}
