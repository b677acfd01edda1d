//! Sales analytics and inventory statistics shown on the overview pages.

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Period-over-period change of a headline figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentageChange {
    pub percentage: f64,
    pub is_positive: bool,
    pub label: String,
}

/// Revenue and order count for one month of the revenue chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueByMonth {
    pub month: String,
    pub revenue: f64,
    pub orders: u32,
    #[serde(default)]
    pub label: Option<String>,
}

/// Best-selling product entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub id: ProductId,
    pub name: String,
    pub sales: u32,
    pub revenue: f64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Condensed order row of the "recent orders" widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentOrder {
    pub id: String,
    pub order_number: String,
    pub customer_name: String,
    pub total: f64,
    pub status: String,
    pub created_at: String,
}

/// Product running low, as listed by the statistics endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(alias = "currentStock")]
    pub stock_quantity: i64,
    pub low_stock_threshold: i64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Product with no stock left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutOfStockProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Payload of `GET /admin/overview`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_revenue: f64,
    pub total_orders: u32,
    pub total_products: u32,
    pub total_customers: u32,
    pub revenue_change: PercentageChange,
    pub orders_change: PercentageChange,
    pub products_change: PercentageChange,
    pub customers_change: PercentageChange,
    #[serde(default)]
    pub revenue_by_month: Vec<RevenueByMonth>,
    #[serde(default)]
    pub top_products: Vec<TopProduct>,
    #[serde(default)]
    pub recent_orders: Vec<RecentOrder>,
    #[serde(default)]
    pub low_stock_products: Vec<LowStockProduct>,
}

/// Payload of `GET /products/admin/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub total_products: u32,
    pub inventory_value: f64,
    pub low_stock_count: u32,
    pub out_of_stock_count: u32,
    #[serde(default)]
    pub low_stock_products: Vec<LowStockProduct>,
    #[serde(default)]
    pub out_of_stock_products: Vec<OutOfStockProduct>,
    pub active_products: u32,
    pub inactive_products: u32,
    pub featured_products: u32,
    pub total_variants: u32,
}
