//! Order endpoints.

use chrono::NaiveDate;
use comptoir_core::{Order, OrderId, OrderStatus, OrdersPage, UpdateOrderStatus};
use tracing::instrument;
use url::Url;

use super::{ApiClient, segment};
use crate::error::ApiError;
use crate::filters::DateFilter;

/// Query parameters of the admin order list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OrdersQuery {
    /// Lower bound on the creation date; `None` lists all dates.
    pub date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl OrdersQuery {
    /// Query for a date filter evaluated on `today`.
    #[must_use]
    pub fn for_filter(filter: Option<DateFilter>, today: NaiveDate) -> Self {
        Self {
            date: filter.map(|filter| filter.start_date(today)),
            ..Self::default()
        }
    }

    fn apply(&self, url: &mut Url) {
        if self.date.is_none() && self.page.is_none() && self.limit.is_none() {
            return;
        }
        let mut pairs = url.query_pairs_mut();
        if let Some(date) = self.date {
            pairs.append_pair("date", &date.format("%Y-%m-%d").to_string());
        }
        if let Some(page) = self.page {
            pairs.append_pair("page", &page.to_string());
        }
        if let Some(limit) = self.limit {
            pairs.append_pair("limit", &limit.to_string());
        }
    }
}

impl ApiClient {
    /// List orders for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend refuses it.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, query: &OrdersQuery) -> Result<OrdersPage, ApiError> {
        let mut url = self.endpoint("orders/admin/all")?;
        query.apply(&mut url);
        self.get(url).await
    }

    /// Fetch a single order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the order does not exist.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: &OrderId) -> Result<Order, ApiError> {
        let url = self.endpoint(&format!("orders/{}", segment(id.as_str())))?;
        self.get(url).await
    }

    /// Set an order's status.
    ///
    /// The backend is the authority on whether the transition is allowed.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the backend refuses the transition.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        let url = self.endpoint(&format!("orders/admin/{}/status", segment(id.as_str())))?;
        self.patch(url, &UpdateOrderStatus { status }).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn url_for(query: &OrdersQuery) -> String {
        let mut url = Url::parse("http://localhost:3000/api/orders/admin/all").unwrap();
        query.apply(&mut url);
        url.to_string()
    }

    #[test]
    fn test_no_filter_omits_date_param() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        let query = OrdersQuery::for_filter(None, today);
        assert_eq!(url_for(&query), "http://localhost:3000/api/orders/admin/all");
    }

    #[test]
    fn test_date_filter_becomes_date_param() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        let query = OrdersQuery::for_filter(Some(DateFilter::Month), today);
        assert_eq!(
            url_for(&query),
            "http://localhost:3000/api/orders/admin/all?date=2026-02-01"
        );

        let query = OrdersQuery {
            page: Some(2),
            limit: Some(50),
            ..OrdersQuery::for_filter(Some(DateFilter::Week), today)
        };
        assert_eq!(
            url_for(&query),
            "http://localhost:3000/api/orders/admin/all?date=2026-02-08&page=2&limit=50"
        );
    }
}
