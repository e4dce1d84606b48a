//! The narrow slices of the gateway that sessions depend on, so they can run
//! against an in-memory double in tests.

use async_trait::async_trait;
use falcon_core::filters::OrderFilters;
use falcon_core::order::{OrderView, Page};
use falcon_core::types::OrderStatus;
use uuid::Uuid;

use crate::error::Result;
use crate::gateway::RestGateway;

#[async_trait]
pub trait BoardBackend: Send + Sync {
    async fn fetch_board_orders(&self, statuses: &[OrderStatus]) -> Result<Vec<OrderView>>;
    async fn set_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()>;
    async fn assign_order(&self, order_id: Uuid, user_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait OrdersSource: Send + Sync {
    async fn list_orders(&self, filters: &OrderFilters) -> Result<Page<OrderView>>;
}

#[async_trait]
impl BoardBackend for RestGateway {
    async fn fetch_board_orders(&self, statuses: &[OrderStatus]) -> Result<Vec<OrderView>> {
        RestGateway::fetch_board_orders(self, statuses).await
    }

    async fn set_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
        RestGateway::set_order_status(self, order_id, status).await
    }

    async fn assign_order(&self, order_id: Uuid, user_id: Uuid) -> Result<()> {
        RestGateway::assign_order(self, order_id, user_id).await
    }
}

#[async_trait]
impl OrdersSource for RestGateway {
    async fn list_orders(&self, filters: &OrderFilters) -> Result<Page<OrderView>> {
        RestGateway::list_orders(self, filters).await
    }
}

#[async_trait]
impl<T: BoardBackend + ?Sized> BoardBackend for std::sync::Arc<T> {
    async fn fetch_board_orders(&self, statuses: &[OrderStatus]) -> Result<Vec<OrderView>> {
        (**self).fetch_board_orders(statuses).await
    }

    async fn set_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
        (**self).set_order_status(order_id, status).await
    }

    async fn assign_order(&self, order_id: Uuid, user_id: Uuid) -> Result<()> {
        (**self).assign_order(order_id, user_id).await
    }
}

#[async_trait]
impl<T: OrdersSource + ?Sized> OrdersSource for std::sync::Arc<T> {
    async fn list_orders(&self, filters: &OrderFilters) -> Result<Page<OrderView>> {
        (**self).list_orders(filters).await
    }
}
