//! Row-change notifications and subscriptions.
//!
//! A [`ChangeFeed`] hands out [`Subscription`]s, each an async stream of the
//! [`ChangeEvent`]s matching one [`ChangeFilter`]. Dropping a subscription
//! (or calling [`Subscription::unsubscribe`]) tears its listener down, so a
//! view that owns a subscription cannot leak it.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::error::{GatewayError, Result};

// ---------------------------------------------------------------------------
// ChangeKind / ChangeEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    #[serde(alias = "INSERT")]
    Insert,
    #[serde(alias = "UPDATE")]
    Update,
    #[serde(alias = "DELETE")]
    Delete,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row change. `record` is the new row (empty for deletes), `old_record`
/// the previous one when the backend sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub schema: String,
    pub table: String,
    #[serde(alias = "eventType", alias = "type")]
    pub kind: ChangeKind,
    #[serde(default, alias = "new")]
    pub record: serde_json::Value,
    #[serde(default, alias = "old")]
    pub old_record: serde_json::Value,
    #[serde(default)]
    pub commit_timestamp: Option<DateTime<Utc>>,
}

impl ChangeEvent {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        kind: ChangeKind,
        record: serde_json::Value,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            kind,
            record,
            old_record: serde_json::Value::Null,
            commit_timestamp: Some(Utc::now()),
        }
    }

    /// Column value as text, from the new row or, for deletes, the old one.
    pub fn column(&self, name: &str) -> Option<String> {
        let row = match self.kind {
            ChangeKind::Delete => &self.old_record,
            _ => &self.record,
        };
        row.get(name).filter(|v| !v.is_null()).map(|v| match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// ChangeFilter
// ---------------------------------------------------------------------------

/// Which changes a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub schema: String,
    pub table: String,
    /// Empty means every kind.
    pub events: Vec<ChangeKind>,
    /// `column = value` restriction.
    pub column_eq: Option<(String, String)>,
}

impl ChangeFilter {
    pub fn table(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            events: Vec::new(),
            column_eq: None,
        }
    }

    pub fn events(mut self, kinds: &[ChangeKind]) -> Self {
        self.events = kinds.to_vec();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.column_eq = Some((column.into(), value.to_string()));
        self
    }

    /// Parse a `column=eq.value` restriction (e.g. `order_id=eq.<uuid>`).
    pub fn with_filter(self, expr: &str) -> Result<Self> {
        let (column, rest) = expr
            .split_once('=')
            .ok_or_else(|| GatewayError::Realtime(format!("malformed filter '{expr}'")))?;
        let value = rest.strip_prefix("eq.").ok_or_else(|| {
            GatewayError::Realtime(format!("unsupported filter operator in '{expr}'"))
        })?;
        if column.trim().is_empty() || value.is_empty() {
            return Err(GatewayError::Realtime(format!("malformed filter '{expr}'")));
        }
        Ok(self.eq(column.trim(), value))
    }

    /// The restriction in its wire form.
    pub fn filter_param(&self) -> Option<String> {
        self.column_eq
            .as_ref()
            .map(|(c, v)| format!("{c}=eq.{v}"))
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.schema != self.schema || event.table != self.table {
            return false;
        }
        if !self.events.is_empty() && !self.events.contains(&event.kind) {
            return false;
        }
        match &self.column_eq {
            Some((column, value)) => event.column(column).as_deref() == Some(value.as_str()),
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

type EventStream = Pin<Box<dyn Stream<Item = Result<ChangeEvent>> + Send>>;

/// A live listener. Yields matching events until the feed closes, the
/// transport fails (one `Err`, then the end), or the subscription is dropped.
pub struct Subscription {
    events: EventStream,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(events: EventStream, task: Option<JoinHandle<()>>) -> Self {
        Self { events, task }
    }

    /// Wrap a raw channel; the sender side stands in for a feed.
    pub fn from_channel(rx: tokio::sync::mpsc::Receiver<Result<ChangeEvent>>) -> Self {
        Self::new(
            Box::pin(tokio_stream::wrappers::ReceiverStream::new(rx)),
            None,
        )
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Stream for Subscription {
    type Item = Result<ChangeEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.as_mut().poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("background_task", &self.task.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ChangeFeed
// ---------------------------------------------------------------------------

pub trait ChangeFeed: Send + Sync {
    /// Start listening. Must be called inside a Tokio runtime.
    fn subscribe(&self, filter: ChangeFilter) -> Subscription;
}

// ---------------------------------------------------------------------------
// ChangeHub
// ---------------------------------------------------------------------------

/// In-process fan-out: every published event reaches every live
/// subscription whose filter matches.
#[derive(Clone)]
pub struct ChangeHub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ChangeHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Deliver `event`; returns how many listeners were live.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl ChangeFeed for ChangeHub {
    fn subscribe(&self, filter: ChangeFilter) -> Subscription {
        let events = BroadcastStream::new(self.tx.subscribe()).filter_map(move |msg| match msg {
            Ok(event) if filter.matches(&event) => Some(Ok(event)),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, table = %filter.table, "change listener lagged");
                None
            }
        });
        Subscription::new(Box::pin(events), None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
