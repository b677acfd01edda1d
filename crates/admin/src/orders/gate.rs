//! Confirmation step in front of status changes.
//!
//! A requested change is held until staff confirm or cancel it. Only a
//! confirmation reaches the mutation callback.

use comptoir_core::{OrderId, OrderStatus};
use tracing::debug;

/// A status change awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStatusChange {
    pub order_id: OrderId,
    pub order_number: String,
    pub current_status: OrderStatus,
    pub new_status: OrderStatus,
}

impl PendingStatusChange {
    /// Confirmation prompt shown to staff.
    #[must_use]
    pub fn prompt(&self) -> String {
        format!(
            "Passer la commande {} de « {} » à « {} » ?",
            self.order_number,
            self.current_status.label(),
            self.new_status.label()
        )
    }
}

/// State of a [`ConfirmationGate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GateState {
    #[default]
    Idle,
    AwaitingConfirmation(PendingStatusChange),
}

/// Two-state gate: `Idle` or `AwaitingConfirmation`.
///
/// `on_confirm` receives `(order_id, new_status)` of the pending change and
/// is never called without one.
pub struct ConfirmationGate<F> {
    state: GateState,
    on_confirm: F,
}

impl<F, R> ConfirmationGate<F>
where
    F: FnMut(OrderId, OrderStatus) -> R,
{
    pub const fn new(on_confirm: F) -> Self {
        Self {
            state: GateState::Idle,
            on_confirm,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &GateState {
        &self.state
    }

    /// Whether a change is awaiting confirmation.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.state, GateState::AwaitingConfirmation(_))
    }

    #[must_use]
    pub const fn pending(&self) -> Option<&PendingStatusChange> {
        match &self.state {
            GateState::AwaitingConfirmation(change) => Some(change),
            GateState::Idle => None,
        }
    }

    /// Hold a change for confirmation.
    ///
    /// A change already pending is replaced and returned.
    pub fn request_change(
        &mut self,
        order_id: OrderId,
        order_number: impl Into<String>,
        current_status: OrderStatus,
        new_status: OrderStatus,
    ) -> Option<PendingStatusChange> {
        let change = PendingStatusChange {
            order_id,
            order_number: order_number.into(),
            current_status,
            new_status,
        };
        debug!(order_id = %change.order_id, from = %current_status, to = %new_status, "Status change requested");

        match std::mem::replace(&mut self.state, GateState::AwaitingConfirmation(change)) {
            GateState::AwaitingConfirmation(replaced) => Some(replaced),
            GateState::Idle => None,
        }
    }

    /// Run the callback with the pending change and return to `Idle`.
    ///
    /// Returns `None` without calling anything when `Idle`.
    pub fn confirm(&mut self) -> Option<R> {
        let GateState::AwaitingConfirmation(change) = std::mem::take(&mut self.state) else {
            debug!("Confirm ignored, nothing pending");
            return None;
        };
        debug!(order_id = %change.order_id, to = %change.new_status, "Status change confirmed");
        Some((self.on_confirm)(change.order_id, change.new_status))
    }

    /// Discard the pending change and return to `Idle`.
    pub fn cancel(&mut self) -> Option<PendingStatusChange> {
        match std::mem::take(&mut self.state) {
            GateState::AwaitingConfirmation(change) => {
                debug!(order_id = %change.order_id, "Status change cancelled");
                Some(change)
            }
            GateState::Idle => None,
        }
    }
}

impl<F> std::fmt::Debug for ConfirmationGate<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationGate")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
