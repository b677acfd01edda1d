//! Order management: synchronisation with the backend, the confirmation
//! gate, and the per-session board combining them with the filters.

mod backend;
mod board;
mod gate;
mod sync;

pub use backend::OrdersBackend;
pub use board::OrdersBoard;
pub use gate::{ConfirmationGate, GateState, PendingStatusChange};
pub use sync::{OrderSyncController, RollbackPolicy, SyncOptions};
