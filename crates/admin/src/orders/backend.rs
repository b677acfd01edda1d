//! Backend seam of the order synchronisation.

use std::future::Future;

use comptoir_core::{Order, OrderId, OrderStatus, OrdersPage};

use crate::api::{ApiClient, OrdersQuery};
use crate::error::ApiError;

/// The two order calls the synchronisation controller needs.
///
/// Implemented by [`ApiClient`]; tests substitute an in-memory backend.
pub trait OrdersBackend: Send + Sync + 'static {
    /// Fetch the order page matching `query`.
    fn list_orders(
        &self,
        query: &OrdersQuery,
    ) -> impl Future<Output = Result<OrdersPage, ApiError>> + Send;

    /// Persist a status change.
    fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> impl Future<Output = Result<Order, ApiError>> + Send;
}

impl OrdersBackend for ApiClient {
    async fn list_orders(&self, query: &OrdersQuery) -> Result<OrdersPage, ApiError> {
        Self::list_orders(self, query).await
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        Self::update_order_status(self, id, status).await
    }
}
