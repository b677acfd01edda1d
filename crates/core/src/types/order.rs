//! Order domain types as returned by the REST backend.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

use super::id::{OrderId, OrderItemId, UserId};
use super::status::{OrderStatus, PaymentStatus};

// =============================================================================
// Order
// =============================================================================

/// A customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Human-readable number (e.g., "CMD-001").
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(with = "rust_decimal::serde::str")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub shipping_cost: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    #[serde(default)]
    pub customer_note: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub user: Customer,
    #[serde(default)]
    pub items_count: u32,
    pub shipping_address: Address,
    #[serde(default)]
    pub billing_address: Option<Address>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Whether `total == subtotal + tax + shipping - discount`.
    #[must_use]
    pub fn totals_consistent(&self) -> bool {
        self.subtotal + self.tax + self.shipping_cost - self.discount_amount == self.total
    }

    /// Whether every lifecycle timestamp that is set is not earlier than
    /// the creation timestamp.
    #[must_use]
    pub fn timestamps_consistent(&self) -> bool {
        [
            self.paid_at,
            self.shipped_at,
            self.delivered_at,
            self.cancelled_at,
        ]
        .into_iter()
        .flatten()
        .all(|at| at >= self.created_at)
    }

    /// Full customer name as shown in lists and matched by search.
    #[must_use]
    pub fn customer_name(&self) -> String {
        self.user.full_name()
    }

    /// Returns a copy of this order with `status` replaced.
    #[must_use]
    pub fn with_status(&self, status: OrderStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// WhatsApp link that opens a conversation with the customer about
    /// this order.
    ///
    /// Returns `None` when the phone number holds no digits.
    #[must_use]
    pub fn customer_contact_link(&self) -> Option<Url> {
        let digits: String = self
            .user
            .phone
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        if digits.is_empty() {
            return None;
        }

        let message = format!(
            "Bonjour, je vous contacte concernant votre commande {}.",
            self.order_number
        );
        Url::parse_with_params(&format!("https://wa.me/{digits}"), &[("text", message)]).ok()
    }
}

/// A line item within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_name: String,
    #[serde(default)]
    pub product_sku: Option<String>,
    /// Variant descriptor (e.g., "Noir - 42").
    pub variant_name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_price: Decimal,
}

impl OrderItem {
    /// Whether `total_price == quantity * unit_price` and quantity is at least 1.
    #[must_use]
    pub fn line_total_consistent(&self) -> bool {
        self.quantity >= 1 && Decimal::from(self.quantity) * self.unit_price == self.total_price
    }
}

/// The customer who owns an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

impl Customer {
    /// `first_name + " " + last_name`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street_address: String,
    pub apartment: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.street_address, self.city)
    }
}

// =============================================================================
// Listing
// =============================================================================

/// Pagination block of list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u32,
    pub total_pages: u32,
}

/// One page of orders as fetched for a date filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OrdersPage {
    pub items: Vec<Order>,
    #[serde(default)]
    pub pagination: Pagination,
}

impl OrdersPage {
    /// Look up an order by ID.
    #[must_use]
    pub fn find(&self, id: &OrderId) -> Option<&Order> {
        self.items.iter().find(|order| &order.id == id)
    }

    /// Returns a copy of this page where the order `id` has `status`.
    ///
    /// All other orders are untouched. Returns `None` if `id` is absent.
    #[must_use]
    pub fn with_order_status(&self, id: &OrderId, status: OrderStatus) -> Option<Self> {
        self.find(id)?;
        let items = self
            .items
            .iter()
            .map(|order| {
                if &order.id == id {
                    order.with_status(status)
                } else {
                    order.clone()
                }
            })
            .collect();
        Some(Self {
            items,
            pagination: self.pagination,
        })
    }
}

/// Body of `PATCH /orders/admin/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrderStatus {
    pub status: OrderStatus,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ORDER_JSON: &str = r#"{
        "id": "42",
        "orderNumber": "CMD-001",
        "status": "pending_payment",
        "paymentStatus": "pending",
        "subtotal": "75000.00",
        "tax": "0.00",
        "shippingCost": "2000.00",
        "discountAmount": "5000.00",
        "total": "72000.00",
        "items": [{
            "id": "i-1",
            "productName": "Classic High Top",
            "productSku": "CHT-BLK-42",
            "variantName": "Noir - 42",
            "quantity": 3,
            "unitPrice": "25000.00",
            "totalPrice": "75000.00"
        }],
        "user": {
            "id": "u-1",
            "email": "marie@example.ci",
            "firstName": "Marie",
            "lastName": "Kouassi",
            "phone": "+225 07 12 34 56 78"
        },
        "itemsCount": 1,
        "shippingAddress": {
            "streetAddress": "Rue des Jardins",
            "city": "Abidjan",
            "country": "CI"
        },
        "createdAt": "2026-02-09T10:00:00Z",
        "paidAt": "2026-02-09T11:00:00Z"
    }"#;

    fn order() -> Order {
        serde_json::from_str(ORDER_JSON).unwrap()
    }

    #[test]
    fn test_order_parses_decimal_strings() {
        let order = order();
        assert_eq!(order.total, Decimal::new(72_000, 0));
        assert_eq!(order.items[0].unit_price, Decimal::new(25_000, 0));
        assert_eq!(order.status, OrderStatus::PendingPayment);
    }

    #[test]
    fn test_totals_and_line_totals_consistent() {
        let order = order();
        assert!(order.totals_consistent());
        assert!(order.items[0].line_total_consistent());
        assert!(order.timestamps_consistent());

        let mut broken = order;
        broken.total = Decimal::new(1, 0);
        assert!(!broken.totals_consistent());
    }

    #[test]
    fn test_customer_contact_link_strips_phone_formatting() {
        let link = order().customer_contact_link().unwrap();
        assert_eq!(link.host_str(), Some("wa.me"));
        assert_eq!(link.path(), "/2250712345678");
        let text = link
            .query_pairs()
            .find(|(k, _)| k == "text")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert!(text.contains("CMD-001"));
    }

    #[test]
    fn test_with_order_status_patches_only_the_target() {
        let mut other = order();
        other.id = OrderId::new("43");
        let page = OrdersPage {
            items: vec![order(), other],
            pagination: Pagination::default(),
        };

        let patched = page
            .with_order_status(&OrderId::new("42"), OrderStatus::Confirmed)
            .unwrap();
        assert_eq!(patched.items[0].status, OrderStatus::Confirmed);
        assert_eq!(patched.items[1].status, OrderStatus::PendingPayment);
        assert!(page.with_order_status(&OrderId::new("missing"), OrderStatus::Paid).is_none());
    }
}
