//! Dashboard statistics endpoints.

use comptoir_core::{DashboardStats, ProductStats};
use serde::Deserialize;
use tracing::instrument;

use super::ApiClient;
use crate::error::ApiError;

/// The statistics endpoints answer bare, but tolerate an envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaybeEnveloped<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> MaybeEnveloped<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

impl ApiClient {
    /// Store overview: revenue, orders, customers and their trends.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn overview_stats(&self) -> Result<DashboardStats, ApiError> {
        let url = self.endpoint("admin/overview")?;
        self.get_plain::<MaybeEnveloped<DashboardStats>>(url)
            .await
            .map(MaybeEnveloped::into_inner)
    }

    /// Catalog statistics: inventory value and stock alerts.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn product_stats(&self) -> Result<ProductStats, ApiError> {
        let url = self.endpoint("products/admin/stats")?;
        self.get_plain::<MaybeEnveloped<ProductStats>>(url)
            .await
            .map(MaybeEnveloped::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stats_json() -> serde_json::Value {
        serde_json::json!({
            "totalProducts": 24,
            "inventoryValue": 1_800_000.0,
            "lowStockCount": 2,
            "outOfStockCount": 1,
            "activeProducts": 20,
            "inactiveProducts": 4,
            "featuredProducts": 3,
            "totalVariants": 61
        })
    }

    #[test]
    fn test_bare_and_enveloped_payloads() {
        let bare: MaybeEnveloped<ProductStats> = serde_json::from_value(stats_json()).unwrap();
        assert_eq!(bare.into_inner().total_variants, 61);

        let wrapped: MaybeEnveloped<ProductStats> = serde_json::from_value(
            serde_json::json!({"success": true, "data": stats_json()}),
        )
        .unwrap();
        assert_eq!(wrapped.into_inner().total_products, 24);
    }
}
