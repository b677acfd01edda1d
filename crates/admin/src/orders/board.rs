//! One staff member's order list session.
//!
//! Owns the filters, the memoised filtered view and the confirmation gate,
//! and drives the shared [`OrderSyncController`]. Several boards may share
//! one controller; each passes its own date filter on every call.

use std::sync::Arc;

use comptoir_core::policy::{self, StatusOption};
use comptoir_core::{Order, OrderId, OrderStatus, OrdersPage};

use super::backend::OrdersBackend;
use super::gate::{ConfirmationGate, PendingStatusChange};
use super::sync::OrderSyncController;
use crate::error::ApiError;
use crate::filters::{DateFilter, FilteredView, OrderFilters};

type OnConfirm = fn(OrderId, OrderStatus) -> (OrderId, OrderStatus);

/// Hand the confirmed change back to the board, which applies it.
const fn confirmed(id: OrderId, status: OrderStatus) -> (OrderId, OrderStatus) {
    (id, status)
}

/// Order list session.
pub struct OrdersBoard<B> {
    controller: OrderSyncController<B>,
    filters: OrderFilters,
    view: FilteredView,
    gate: ConfirmationGate<OnConfirm>,
    empty: Arc<OrdersPage>,
}

impl<B: OrdersBackend> OrdersBoard<B> {
    /// Start a session with default filters.
    #[must_use]
    pub fn new(controller: OrderSyncController<B>) -> Self {
        Self {
            controller,
            filters: OrderFilters::default(),
            view: FilteredView::new(),
            gate: ConfirmationGate::new(confirmed as OnConfirm),
            empty: Arc::new(OrdersPage::default()),
        }
    }

    #[must_use]
    pub const fn controller(&self) -> &OrderSyncController<B> {
        &self.controller
    }

    #[must_use]
    pub const fn filters(&self) -> &OrderFilters {
        &self.filters
    }

    /// Load the page of the current date filter (cached if fresh).
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the cached page stays visible.
    pub async fn load(&self) -> Result<Arc<OrdersPage>, ApiError> {
        self.controller.fetch(self.filters.date()).await
    }

    /// Refetch the current page regardless of freshness.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the cached page stays visible.
    pub async fn retry(&self) -> Result<Arc<OrdersPage>, ApiError> {
        self.controller.refetch(self.filters.date()).await
    }

    /// Switch the server-side date filter and load its page.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn set_date_filter(
        &mut self,
        date: Option<DateFilter>,
    ) -> Result<Arc<OrdersPage>, ApiError> {
        self.filters.set_date(date);
        self.load().await
    }

    pub const fn set_status_filter(&mut self, status: Option<OrderStatus>) {
        self.filters.set_status(status);
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.filters.set_search(query);
    }

    /// Clear all filters at once and load the all-dates page.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn reset_filters(&mut self) -> Result<Arc<OrdersPage>, ApiError> {
        self.filters.reset();
        self.load().await
    }

    /// Number of filters not at their default.
    #[must_use]
    pub fn active_filters_count(&self) -> usize {
        self.filters.active_count()
    }

    async fn page(&self) -> Arc<OrdersPage> {
        self.controller
            .orders(self.filters.date())
            .await
            .unwrap_or_else(|| Arc::clone(&self.empty))
    }

    /// Orders of the current page passing the status and search filters.
    ///
    /// The same `Arc` is returned until the page, the status filter or the
    /// search query changes.
    pub async fn visible_orders(&mut self) -> Arc<Vec<Order>> {
        let page = self.page().await;
        self.view.view(&page, &self.filters)
    }

    /// Size of the fetched page, before filtering.
    pub async fn total_count(&self) -> usize {
        self.page().await.items.len()
    }

    /// Number of visible orders.
    pub async fn filtered_count(&mut self) -> usize {
        self.visible_orders().await.len()
    }

    /// Entries of the status picker for `order`.
    #[must_use]
    pub fn status_options(order: &Order) -> Vec<StatusOption> {
        policy::status_options(order.status)
    }

    /// Whether the generic status picker is shown for `order`.
    #[must_use]
    pub const fn can_edit(order: &Order) -> bool {
        policy::is_editable(order.status)
    }

    /// Ask for confirmation before moving `order` to `new_status`.
    ///
    /// Replaces and returns any change already awaiting confirmation.
    pub fn request_status_change(
        &mut self,
        order: &Order,
        new_status: OrderStatus,
    ) -> Option<PendingStatusChange> {
        self.gate.request_change(
            order.id.clone(),
            order.order_number.clone(),
            order.status,
            new_status,
        )
    }

    #[must_use]
    pub const fn pending_change(&self) -> Option<&PendingStatusChange> {
        self.gate.pending()
    }

    /// Apply the pending change to the page of the current date filter.
    ///
    /// Returns `None` if nothing was pending.
    pub async fn confirm_status_change(&mut self) -> Option<Result<Order, ApiError>> {
        let (id, status) = self.gate.confirm()?;
        let date = self.filters.date();
        Some(self.controller.update_status(date, &id, status).await)
    }

    /// Drop the pending change without touching any order.
    pub fn cancel_status_change(&mut self) -> Option<PendingStatusChange> {
        self.gate.cancel()
    }

    /// Whether a status change for `id` is in flight.
    #[must_use]
    pub fn is_updating(&self, id: &OrderId) -> bool {
        self.controller.is_updating(id)
    }
}

impl<B> std::fmt::Debug for OrdersBoard<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersBoard")
            .field("filters", &self.filters)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
