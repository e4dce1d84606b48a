//! `falcon-client`: async access to the hosted Falcon backend.
//!
//! Wraps the REST, storage and auth endpoints in a typed gateway, turns the
//! realtime endpoint into subscriptions, and builds the board and orders list
//! sessions on top of both.
//!
//! # Architecture
//!
//! ```text
//! FalconConfig
//!     │
//!     ▼
//! RestGateway     ← reqwest; rows, procedures, storage, auth user
//!     │              every response decoded at the boundary
//!     ├──────────────► SseChangeFeed  ← text/event-stream, one task per subscription
//!     ▼                      │
//! BoardSession /             ▼
//! OrdersListSession  ◄── Subscription  ← futures::Stream<Item = Result<ChangeEvent>>
//!                            │
//!                            ▼
//!                        Reconciler     ← one full refetch per notification
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use falcon_client::{orders_filter, BoardSession, ChangeFeed, RestGateway};
//! use std::sync::Arc;
//!
//! let gateway = Arc::new(RestGateway::new(config)?);
//! let settings = gateway.kanban_settings().await?;
//! let schema = gateway.config().schema.clone();
//! let mut sub = gateway.change_feed()?.subscribe(orders_filter(&schema, Some(settings.organization_id)));
//! let mut board = BoardSession::new(gateway, settings);
//! board.reload().await?;
//! while board.watch(&mut sub).await? {
//!     println!("{} cards", board.board().total());
//! }
//! ```

pub mod backend;
pub mod error;
pub mod gateway;
pub mod realtime;
pub mod reconcile;
pub mod session;
pub mod sse;

pub use backend::{BoardBackend, OrdersSource};
pub use error::{GatewayError, Result};
pub use gateway::{Query, RestGateway};
pub use realtime::{ChangeEvent, ChangeFeed, ChangeFilter, ChangeHub, ChangeKind, Subscription};
pub use reconcile::Reconciler;
pub use session::{orders_filter, BoardSession, OrdersListSession};
pub use sse::SseChangeFeed;
