//! Order list filtering.
//!
//! Filtering is split in two:
//! - the date filter is evaluated by the backend and selects which page is
//!   fetched (and cached);
//! - the status filter and the free-text search run locally over the page
//!   already in memory.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use comptoir_core::{Order, OrderStatus, OrdersPage};
use serde::{Deserialize, Serialize};

// =============================================================================
// Date filter (server side)
// =============================================================================

/// Relative time window evaluated by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFilter {
    Today,
    /// Since the start of the current week (weeks start on Sunday).
    Week,
    Month,
}

impl DateFilter {
    /// First day of the window containing `today`.
    #[must_use]
    pub fn start_date(self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::Today => today,
            Self::Week => {
                today - chrono::Days::new(u64::from(today.weekday().num_days_from_sunday()))
            }
            Self::Month => today.with_day(1).unwrap_or(today),
        }
    }

    /// The `date` query parameter sent to the backend (`YYYY-MM-DD`).
    #[must_use]
    pub fn server_param(self, today: NaiveDate) -> String {
        self.start_date(today).format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Display for DateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Today => write!(f, "today"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
        }
    }
}

// =============================================================================
// Filter state
// =============================================================================

/// Filters of one browsing session. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilters {
    date: Option<DateFilter>,
    status: Option<OrderStatus>,
    search: String,
}

impl OrderFilters {
    #[must_use]
    pub const fn date(&self) -> Option<DateFilter> {
        self.date
    }

    #[must_use]
    pub const fn status(&self) -> Option<OrderStatus> {
        self.status
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    pub const fn set_date(&mut self, date: Option<DateFilter>) {
        self.date = date;
    }

    pub const fn set_status(&mut self, status: Option<OrderStatus>) {
        self.status = status;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    /// Clear all three filters at once.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Number of filters not at their default value.
    #[must_use]
    pub fn active_count(&self) -> usize {
        usize::from(self.date.is_some())
            + usize::from(self.status.is_some())
            + usize::from(!self.search.is_empty())
    }
}

// =============================================================================
// Client-side matching
// =============================================================================

/// Whether `order` passes the status filter and the search query.
///
/// The query (trimmed, case-insensitive) matches a substring of the order
/// number, of the customer's full name, or of the phone number with all
/// whitespace removed from both sides.
#[must_use]
pub fn matches(order: &Order, status: Option<OrderStatus>, search: &str) -> bool {
    if status.is_some_and(|wanted| order.status != wanted) {
        return false;
    }

    let query = search.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }

    if order.order_number.to_lowercase().contains(&query)
        || order.customer_name().to_lowercase().contains(&query)
    {
        return true;
    }

    let compact_query = strip_whitespace(&query);
    strip_whitespace(&order.user.phone).contains(&compact_query)
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Filter `orders` in place order.
#[must_use]
pub fn apply(orders: &[Order], status: Option<OrderStatus>, search: &str) -> Vec<Order> {
    orders
        .iter()
        .filter(|order| matches(order, status, search))
        .cloned()
        .collect()
}

// =============================================================================
// Memoised view
// =============================================================================

/// Memoised result of [`apply`].
///
/// Returns the same `Arc` for as long as the source page (by pointer), the
/// status filter and the search query are unchanged, so consumers can
/// compare with `Arc::ptr_eq` to skip work.
#[derive(Debug, Default)]
pub struct FilteredView {
    memo: Option<Memo>,
}

#[derive(Debug)]
struct Memo {
    source: Arc<OrdersPage>,
    status: Option<OrderStatus>,
    search: String,
    result: Arc<Vec<Order>>,
}

impl FilteredView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filtered orders of `source` under `filters`.
    pub fn view(&mut self, source: &Arc<OrdersPage>, filters: &OrderFilters) -> Arc<Vec<Order>> {
        if let Some(memo) = &self.memo
            && Arc::ptr_eq(&memo.source, source)
            && memo.status == filters.status()
            && memo.search == filters.search()
        {
            return Arc::clone(&memo.result);
        }

        let result = Arc::new(apply(&source.items, filters.status(), filters.search()));
        self.memo = Some(Memo {
            source: Arc::clone(source),
            status: filters.status(),
            search: filters.search().to_string(),
            result: Arc::clone(&result),
        });
        result
    }

    /// Forget the memoised result.
    pub fn clear(&mut self) {
        self.memo = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn order(number: &str, status: OrderStatus, first: &str, last: &str, phone: &str) -> Order {
        serde_json::from_value(serde_json::json!({
            "id": number,
            "orderNumber": number,
            "status": status,
            "paymentStatus": "pending",
            "subtotal": "0", "tax": "0", "shippingCost": "0",
            "discountAmount": "0", "total": "0",
            "user": {"id": "u", "firstName": first, "lastName": last, "phone": phone},
            "shippingAddress": {"streetAddress": "", "city": "Abidjan", "country": "CI"},
            "createdAt": "2026-02-09T10:00:00Z"
        }))
        .unwrap()
    }

    fn sample() -> Vec<Order> {
        vec![
            order("CMD-1", OrderStatus::Paid, "Marie", "Kouassi", "+225 07 12 34 56 78"),
            order("CMD-2", OrderStatus::Cancelled, "Jean", "Koné", "+225 05 98 76 54 32"),
        ]
    }

    fn numbers(orders: &[Order]) -> Vec<&str> {
        orders.iter().map(|o| o.order_number.as_str()).collect()
    }

    #[test]
    fn test_status_filter() {
        let result = apply(&sample(), Some(OrderStatus::Paid), "");
        assert_eq!(numbers(&result), vec!["CMD-1"]);
    }

    #[test]
    fn test_search_by_name_is_case_insensitive() {
        let result = apply(&sample(), None, "kouassi");
        assert_eq!(numbers(&result), vec!["CMD-1"]);
        let result = apply(&sample(), None, "  JEAN KON  ");
        assert_eq!(numbers(&result), vec!["CMD-2"]);
    }

    #[test]
    fn test_search_by_phone_ignores_whitespace() {
        let result = apply(&sample(), None, "0712345678");
        assert_eq!(numbers(&result), vec!["CMD-1"]);
        let result = apply(&sample(), None, "98 76");
        assert_eq!(numbers(&result), vec!["CMD-2"]);
    }

    #[test]
    fn test_search_by_order_number() {
        let result = apply(&sample(), None, "cmd-2");
        assert_eq!(numbers(&result), vec!["CMD-2"]);
    }

    #[test]
    fn test_filters_combine_with_and() {
        assert!(apply(&sample(), Some(OrderStatus::Paid), "jean").is_empty());
        assert_eq!(apply(&sample(), None, "").len(), 2);
        assert_eq!(apply(&sample(), None, "   ").len(), 2);
    }

    #[test]
    fn test_active_count_and_reset() {
        let mut filters = OrderFilters::default();
        assert_eq!(filters.active_count(), 0);

        filters.set_date(Some(DateFilter::Week));
        filters.set_status(Some(OrderStatus::Shipped));
        filters.set_search("CMD");
        assert_eq!(filters.active_count(), 3);

        filters.reset();
        assert_eq!(filters.date(), None);
        assert_eq!(filters.status(), None);
        assert_eq!(filters.search(), "");
        assert_eq!(filters.active_count(), 0);
    }

    #[test]
    fn test_date_filter_mapping() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        assert_eq!(DateFilter::Today.server_param(today), "2026-02-09");
        assert_eq!(DateFilter::Month.server_param(today), "2026-02-01");
        // 2026-02-09 is a Monday; the week started on Sunday the 8th.
        assert_eq!(DateFilter::Week.server_param(today), "2026-02-08");

        let sunday = NaiveDate::from_ymd_opt(2026, 2, 8).unwrap();
        assert_eq!(DateFilter::Week.server_param(sunday), "2026-02-08");
    }

    #[test]
    fn test_view_is_memoised_until_inputs_change() {
        let page = Arc::new(OrdersPage {
            items: sample(),
            pagination: comptoir_core::Pagination::default(),
        });
        let mut filters = OrderFilters::default();
        let mut view = FilteredView::new();

        let first = view.view(&page, &filters);
        let second = view.view(&page, &filters);
        assert!(Arc::ptr_eq(&first, &second));

        filters.set_status(Some(OrderStatus::Paid));
        let third = view.view(&page, &filters);
        assert!(!Arc::ptr_eq(&second, &third));
        assert_eq!(third.len(), 1);

        // Same content, new page instance: recomputed.
        let refreshed = Arc::new((*page).clone());
        let fourth = view.view(&refreshed, &filters);
        assert!(!Arc::ptr_eq(&third, &fourth));

        // Date filter does not take part in the memo key.
        filters.set_date(Some(DateFilter::Today));
        let fifth = view.view(&refreshed, &filters);
        assert!(Arc::ptr_eq(&fourth, &fifth));
    }
}
