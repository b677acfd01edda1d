//! Status enums for orders and payments.
//!
//! Labels and badge classes are exhaustive `match`es so that adding a
//! status forces every lookup to be updated.

use serde::{Deserialize, Serialize};

/// Lifecycle stage of an order.
///
/// Exactly one value at any time. Serialised in `snake_case` as the backend
/// expects (`pending_payment`, `payment_failed`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed, payment not received yet.
    #[default]
    PendingPayment,
    /// Payment received.
    Paid,
    /// Order confirmed by staff.
    Confirmed,
    /// Order being prepared.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Cancelled by staff or customer.
    Cancelled,
    /// Payment attempt failed.
    PaymentFailed,
    /// Payment window elapsed.
    Expired,
}

impl OrderStatus {
    /// Every status, in display order.
    pub const ALL: [Self; 9] = [
        Self::PendingPayment,
        Self::Paid,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::PaymentFailed,
        Self::Expired,
    ];

    /// Statuses offered as targets by the status picker.
    pub const CHANGE_TARGETS: [Self; 4] = [
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Quick filter buttons on the orders page. `None` means "all".
    pub const QUICK_FILTERS: [Option<Self>; 5] = [
        None,
        Some(Self::PendingPayment),
        Some(Self::Confirmed),
        Some(Self::Shipped),
        Some(Self::Delivered),
    ];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Paid => "paid",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::PaymentFailed => "payment_failed",
            Self::Expired => "expired",
        }
    }

    /// Human-readable label shown to staff.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingPayment => "En attente",
            Self::Paid => "Payé",
            Self::Confirmed => "Confirmé",
            Self::Processing => "Préparation",
            Self::Shipped => "Livraison",
            Self::Delivered => "Livré",
            Self::Cancelled => "Annulé",
            Self::PaymentFailed => "Paiement échoué",
            Self::Expired => "Expiré",
        }
    }

    /// Semantic badge class for the status pill.
    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::PendingPayment => "badge-warning",
            Self::Paid => "badge-info",
            Self::Confirmed => "badge-accent",
            Self::Processing => "badge-progress",
            Self::Shipped => "badge-transit",
            Self::Delivered => "badge-success",
            Self::Cancelled | Self::PaymentFailed => "badge-danger",
            Self::Expired => "badge-muted",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Payment state of an order.
///
/// Read-only in the back-office: it is displayed, never edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Human-readable label shown to staff.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "En attente",
            Self::Paid => "Payé",
            Self::Failed => "Échoué",
            Self::Refunded => "Remboursé",
        }
    }

    /// Semantic badge class for the payment pill.
    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::Pending => "badge-warning",
            Self::Paid => "badge-success",
            Self::Failed => "badge-danger",
            Self::Refunded => "badge-muted",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}
