//! Order status policy.
//!
//! Decides which orders the status picker is enabled for and which of the
//! offered targets are selectable. This is UI guidance only: the backend is
//! the authority on transitions and may reject a request this policy allows
//! (or accept one it disables).
//!
//! Note that `Delivered` and `Cancelled` count as editable even though they
//! are terminal. That is the current behaviour staff rely on and is kept
//! as is.

use crate::types::OrderStatus;

/// Whether the status picker is enabled for an order in `status`.
#[must_use]
pub const fn is_editable(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::PendingPayment
            | OrderStatus::PaymentFailed
            | OrderStatus::Delivered
            | OrderStatus::Cancelled
    )
}

/// Whether `candidate` is selectable from `current`.
///
/// Selecting the current status is always allowed (no-op). The only real
/// transition on the allow-list is `Confirmed -> Cancelled`.
#[must_use]
pub fn is_legal_transition(current: OrderStatus, candidate: OrderStatus) -> bool {
    candidate == current
        || (current == OrderStatus::Confirmed && candidate == OrderStatus::Cancelled)
}

/// One entry of the status picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusOption {
    pub status: OrderStatus,
    pub label: &'static str,
    /// Shown but not selectable.
    pub disabled: bool,
}

/// Picker entries for an order currently in `current`.
///
/// Always the [`OrderStatus::CHANGE_TARGETS`], in that order, each flagged
/// with whether the policy disables it.
#[must_use]
pub fn status_options(current: OrderStatus) -> Vec<StatusOption> {
    OrderStatus::CHANGE_TARGETS
        .into_iter()
        .map(|status| StatusOption {
            status,
            label: status.label(),
            disabled: !is_legal_transition(current, status),
        })
        .collect()
}
