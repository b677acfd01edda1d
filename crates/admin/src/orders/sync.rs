//! Order synchronisation: the fetched order pages and status mutations.
//!
//! Pages are cached per date filter. A status change is applied to the
//! cached page the caller is displaying before the backend is called, and
//! undone if the call fails:
//!
//! 1. cancel in-flight order fetches;
//! 2. snapshot the page of the given date filter;
//! 3. install a copy with the new status;
//! 4. call the backend;
//! 5. notify, then invalidate the `orders` family whatever the outcome;
//! 6. on failure, roll back according to the [`RollbackPolicy`].
//!
//! Changes to the same order are not queued. Each snapshot includes the
//! optimistic status of the changes already in flight, so a failure under
//! [`RollbackPolicy::Snapshot`] erases every change to that page requested
//! after the failed one and still pending.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use comptoir_core::{Order, OrderId, OrderStatus, OrdersPage};
use tracing::{debug, info, instrument};

use super::backend::OrdersBackend;
use crate::api::OrdersQuery;
use crate::cache::{CacheKey, CacheValue, QueryCache, QueryFamily};
use crate::clock::{Clock, SystemClock};
use crate::config::AdminConfig;
use crate::error::ApiError;
use crate::filters::DateFilter;
use crate::notify::{Notifier, TracingNotifier};

const UPDATE_SUCCESS: &str = "Statut mis à jour avec succès";
const UPDATE_FAILURE: &str = "Impossible de mettre à jour le statut";

/// How a failed status change is undone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RollbackPolicy {
    /// Restore the page exactly as it was before the change. Any change to
    /// the same page requested in between, to this order or another one, is
    /// lost until the next fetch.
    #[default]
    Snapshot,
    /// Restore only the target order's previous status, and only if no
    /// later change to that order was requested meanwhile.
    Versioned,
}

impl FromStr for RollbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snapshot" => Ok(Self::Snapshot),
            "versioned" => Ok(Self::Versioned),
            other => Err(format!(
                "unknown rollback policy '{other}' (expected 'snapshot' or 'versioned')"
            )),
        }
    }
}

impl std::fmt::Display for RollbackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snapshot => write!(f, "snapshot"),
            Self::Versioned => write!(f, "versioned"),
        }
    }
}

/// Collaborators of the controller other than the backend and the cache.
#[derive(Clone)]
pub struct SyncOptions {
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub rollback: RollbackPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            notifier: Arc::new(TracingNotifier),
            clock: Arc::new(SystemClock),
            rollback: RollbackPolicy::default(),
        }
    }
}

impl SyncOptions {
    /// Default collaborators with the rollback policy of `config`.
    #[must_use]
    pub fn from_config(config: &AdminConfig) -> Self {
        Self {
            rollback: config.rollback,
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOptions")
            .field("rollback", &self.rollback)
            .finish_non_exhaustive()
    }
}

/// Single writer of the `orders` cache family.
///
/// Cheap to clone; clones share state.
pub struct OrderSyncController<B> {
    inner: Arc<ControllerInner<B>>,
}

impl<B> Clone for OrderSyncController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<B> {
    backend: B,
    cache: QueryCache,
    options: SyncOptions,
    state: Mutex<SyncState>,
}

#[derive(Default)]
struct SyncState {
    /// Mutations in flight per order.
    updating: HashMap<OrderId, usize>,
    /// Latest change requested per order; dropped once none is in flight.
    sequences: HashMap<OrderId, u64>,
}

/// What is needed to undo one optimistic patch.
struct Rollback {
    key: CacheKey,
    snapshot: Option<Arc<OrdersPage>>,
    previous_status: Option<OrderStatus>,
    sequence: u64,
}

impl<B: OrdersBackend> OrderSyncController<B> {
    /// Create a controller writing to `cache`.
    #[must_use]
    pub fn new(backend: B, cache: QueryCache, options: SyncOptions) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                backend,
                cache,
                options,
                state: Mutex::new(SyncState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// The shared cache.
    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    /// Cached page for `date`, fresh or stale.
    pub async fn orders(&self, date: Option<DateFilter>) -> Option<Arc<OrdersPage>> {
        self.inner.cache.orders(date).await
    }

    /// Page for `date`, fetched only if the cached one is missing or stale.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the cached page, if any, is kept.
    pub async fn fetch(&self, date: Option<DateFilter>) -> Result<Arc<OrdersPage>, ApiError> {
        if let Some(CacheValue::Orders(page)) =
            self.inner.cache.get_fresh(&CacheKey::Orders(date)).await
        {
            debug!(?date, "Serving fresh cached orders");
            return Ok(page);
        }
        self.refetch(date).await
    }

    /// Fetch the page for `date` from the backend.
    ///
    /// If a status change cancels the fetch while it is in flight, the
    /// response is not cached and the cached page is returned instead.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the cached page, if any, is kept.
    #[instrument(skip(self))]
    pub async fn refetch(&self, date: Option<DateFilter>) -> Result<Arc<OrdersPage>, ApiError> {
        let ticket = self.inner.cache.begin_fetch(QueryFamily::Orders);
        let query = OrdersQuery::for_filter(date, self.inner.options.clock.today());

        let page = match self.inner.backend.list_orders(&query).await {
            Ok(page) => Arc::new(page),
            Err(e) => {
                e.report("list_orders");
                return Err(e);
            }
        };

        let written = self
            .inner
            .cache
            .complete_fetch(
                ticket,
                CacheKey::Orders(date),
                CacheValue::Orders(Arc::clone(&page)),
            )
            .await;
        if written {
            debug!(?date, count = page.items.len(), "Orders fetched");
            return Ok(page);
        }
        Ok(self.inner.cache.orders(date).await.unwrap_or(page))
    }

    /// Whether a status change for `id` is in flight.
    #[must_use]
    pub fn is_updating(&self, id: &OrderId) -> bool {
        self.state().updating.get(id).is_some_and(|count| *count > 0)
    }

    /// Change the status of an order shown on the page for `date`.
    ///
    /// That page shows `status` as soon as this future is first polled; it
    /// is rolled back if the backend refuses the change. Pages of other date
    /// filters are left alone until the next fetch. The transition is not
    /// checked here: the backend decides.
    ///
    /// # Errors
    ///
    /// Returns the backend error after rolling back.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_status(
        &self,
        date: Option<DateFilter>,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        let rollback = self.apply_optimistic(date, id, status).await;

        let result = self.inner.backend.update_order_status(id, status).await;

        match &result {
            Ok(_) => {
                info!("Order status updated");
                self.inner.options.notifier.success(UPDATE_SUCCESS);
            }
            Err(e) => {
                self.roll_back(id, rollback).await;
                self.inner.options.notifier.failure(UPDATE_FAILURE, e);
                e.report_mutation("update_order_status");
            }
        }
        self.settle(id);

        self.inner.cache.invalidate(QueryFamily::Orders);
        result
    }

    /// Steps 1 to 3: cancel fetches, snapshot, patch.
    async fn apply_optimistic(
        &self,
        date: Option<DateFilter>,
        id: &OrderId,
        status: OrderStatus,
    ) -> Rollback {
        self.inner.cache.cancel(QueryFamily::Orders);

        let sequence = {
            let mut state = self.state();
            *state.updating.entry(id.clone()).or_default() += 1;
            let counter = state.sequences.entry(id.clone()).or_default();
            *counter += 1;
            *counter
        };
        let key = CacheKey::Orders(date);
        let snapshot = self.inner.cache.orders(date).await;

        let previous_status = snapshot
            .as_ref()
            .and_then(|page| page.find(id))
            .map(|order| order.status);

        match snapshot
            .as_ref()
            .and_then(|page| page.with_order_status(id, status))
        {
            Some(patched) => {
                self.inner
                    .cache
                    .set(key.clone(), CacheValue::Orders(Arc::new(patched)))
                    .await;
            }
            None => debug!(?date, "Order not in the displayed page, nothing to patch"),
        }

        Rollback {
            key,
            snapshot,
            previous_status,
            sequence,
        }
    }

    /// Mark one change to `id` as settled. Runs after any rollback.
    fn settle(&self, id: &OrderId) {
        let mut state = self.state();
        let remaining = state.updating.get_mut(id).map(|count| {
            *count = count.saturating_sub(1);
            *count
        });
        if remaining != Some(0) {
            return;
        }
        state.updating.remove(id);
        state.sequences.remove(id);
    }

    /// Step 6.
    async fn roll_back(&self, id: &OrderId, rollback: Rollback) {
        let Some(snapshot) = rollback.snapshot else {
            return;
        };

        match self.inner.options.rollback {
            RollbackPolicy::Snapshot => {
                self.inner
                    .cache
                    .set(rollback.key, CacheValue::Orders(snapshot))
                    .await;
                debug!("Restored pre-change snapshot");
            }
            RollbackPolicy::Versioned => {
                let current = self.state().sequences.get(id).copied().unwrap_or_default();
                if current != rollback.sequence {
                    debug!(
                        sequence = rollback.sequence,
                        current, "Newer change pending, rollback discarded"
                    );
                    return;
                }
                let Some(previous) = rollback.previous_status else {
                    return;
                };
                let restored = match self.inner.cache.get(&rollback.key).await {
                    Some(CacheValue::Orders(page)) => page.with_order_status(id, previous),
                    _ => snapshot.with_order_status(id, previous),
                };
                if let Some(restored) = restored {
                    self.inner
                        .cache
                        .set(rollback.key, CacheValue::Orders(Arc::new(restored)))
                        .await;
                    debug!(%previous, "Restored previous order status");
                }
            }
        }
    }
}

impl<B> std::fmt::Debug for OrderSyncController<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderSyncController")
            .field("cache", &self.inner.cache)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;
    use tokio::sync::Notify;

    use super::*;
    use crate::clock::FixedClock;
    use crate::notify::{Notification, RecordingNotifier};

    fn order(id: &str, status: OrderStatus) -> Order {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "orderNumber": format!("CMD-{id}"),
            "status": status,
            "paymentStatus": "pending",
            "subtotal": "10000", "tax": "0", "shippingCost": "2000",
            "discountAmount": "0", "total": "12000",
            "user": {"id": "u-1", "firstName": "Awa", "lastName": "Traoré", "phone": "+225 01 02 03 04 05"},
            "shippingAddress": {"streetAddress": "Rue 12", "city": "Abidjan", "country": "CI"},
            "createdAt": "2026-02-09T08:00:00Z"
        }))
        .unwrap()
    }

    /// Backend that blocks every status update until released.
    #[derive(Clone, Default)]
    struct GatedBackend {
        page: Arc<Mutex<OrdersPage>>,
        reject: bool,
        started: Arc<Notify>,
        release: Arc<Notify>,
        fetches: Arc<AtomicUsize>,
        queries: Arc<Mutex<Vec<OrdersQuery>>>,
    }

    impl OrdersBackend for GatedBackend {
        async fn list_orders(&self, query: &OrdersQuery) -> Result<OrdersPage, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(*query);
            Ok(self.page.lock().unwrap().clone())
        }

        async fn update_order_status(
            &self,
            id: &OrderId,
            status: OrderStatus,
        ) -> Result<Order, ApiError> {
            self.started.notify_one();
            self.release.notified().await;
            if self.reject {
                return Err(ApiError::Rejected {
                    status: 422,
                    message: "Transition invalide".to_string(),
                });
            }
            let mut page = self.page.lock().unwrap();
            *page = page.with_order_status(id, status).unwrap();
            Ok(page.find(id).unwrap().clone())
        }
    }

    /// Backend whose every call fails.
    struct Down;

    impl OrdersBackend for Down {
        async fn list_orders(&self, _: &OrdersQuery) -> Result<OrdersPage, ApiError> {
            Err(ApiError::Server {
                status: 503,
                message: "maintenance".to_string(),
            })
        }

        async fn update_order_status(&self, _: &OrderId, _: OrderStatus) -> Result<Order, ApiError> {
            Err(ApiError::Unauthorized)
        }
    }

    fn setup(
        reject: bool,
        rollback: RollbackPolicy,
    ) -> (OrderSyncController<GatedBackend>, GatedBackend, Arc<RecordingNotifier>) {
        let backend = GatedBackend {
            page: Arc::new(Mutex::new(OrdersPage {
                items: vec![
                    order("42", OrderStatus::PendingPayment),
                    order("43", OrderStatus::Paid),
                ],
                ..OrdersPage::default()
            })),
            reject,
            ..GatedBackend::default()
        };
        let notifier = Arc::new(RecordingNotifier::new());
        let controller = OrderSyncController::new(
            backend.clone(),
            QueryCache::default(),
            SyncOptions {
                notifier: notifier.clone(),
                clock: Arc::new(FixedClock(NaiveDate::from_ymd_opt(2026, 2, 9).unwrap())),
                rollback,
            },
        );
        (controller, backend, notifier)
    }

    async fn cached_status(controller: &OrderSyncController<GatedBackend>, id: &str) -> OrderStatus {
        controller
            .orders(None)
            .await
            .unwrap()
            .find(&OrderId::new(id))
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn test_fresh_page_is_not_refetched() {
        let (controller, backend, _) = setup(false, RollbackPolicy::Snapshot);
        controller.fetch(None).await.unwrap();
        controller.fetch(None).await.unwrap();
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 1);

        controller.refetch(None).await.unwrap();
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_date_filter_selects_distinct_page_and_param() {
        let (controller, backend, _) = setup(false, RollbackPolicy::Snapshot);
        controller.fetch(None).await.unwrap();
        controller.fetch(Some(DateFilter::Today)).await.unwrap();

        let queries = backend.queries.lock().unwrap().clone();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].date, None);
        assert_eq!(queries[1].date, NaiveDate::from_ymd_opt(2026, 2, 9));
    }

    #[tokio::test]
    async fn test_optimistic_patch_then_rollback_on_failure() {
        let (controller, backend, notifier) = setup(true, RollbackPolicy::Snapshot);
        controller.fetch(None).await.unwrap();
        let id = OrderId::new("42");

        let update = controller.update_status(None, &id, OrderStatus::Confirmed);
        let observe = async {
            backend.started.notified().await;
            assert_eq!(cached_status(&controller, "42").await, OrderStatus::Confirmed);
            assert!(controller.is_updating(&id));
            backend.release.notify_one();
        };
        let (result, ()) = tokio::join!(update, observe);

        assert!(matches!(result, Err(ApiError::Rejected { .. })));
        assert_eq!(cached_status(&controller, "42").await, OrderStatus::PendingPayment);
        assert_eq!(cached_status(&controller, "43").await, OrderStatus::Paid);
        assert_eq!(
            notifier.events(),
            vec![Notification::Failure(UPDATE_FAILURE.to_string())]
        );
        assert!(!controller.is_updating(&id));
    }

    #[tokio::test]
    async fn test_success_notifies_and_invalidates() {
        let (controller, backend, notifier) = setup(false, RollbackPolicy::Snapshot);
        controller.fetch(None).await.unwrap();
        let id = OrderId::new("42");

        backend.release.notify_one();
        let order = controller.update_status(None, &id, OrderStatus::Shipped).await.unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(
            notifier.events(),
            vec![Notification::Success(UPDATE_SUCCESS.to_string())]
        );

        let lookup = controller.cache().lookup(&CacheKey::Orders(None)).await.unwrap();
        assert!(!lookup.fresh, "orders family is invalidated on settle");

        // Next read resynchronises with the backend.
        controller.fetch(None).await.unwrap();
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(cached_status(&controller, "42").await, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_in_flight_fetch_does_not_overwrite_patch() {
        let (controller, backend, _) = setup(false, RollbackPolicy::Snapshot);
        controller.fetch(None).await.unwrap();
        let cache = controller.cache().clone();

        let ticket = cache.begin_fetch(QueryFamily::Orders);
        let id = OrderId::new("42");
        let update = controller.update_status(None, &id, OrderStatus::Processing);
        let stale_fetch = async {
            backend.started.notified().await;
            let stale = Arc::new(backend.page.lock().unwrap().clone());
            let written = cache
                .complete_fetch(ticket, CacheKey::Orders(None), CacheValue::Orders(stale))
                .await;
            assert!(!written);
            assert_eq!(cached_status(&controller, "42").await, OrderStatus::Processing);
            backend.release.notify_one();
        };
        let (result, ()) = tokio::join!(update, stale_fetch);
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_cached_page() {
        let (controller, _, _) = setup(false, RollbackPolicy::Snapshot);
        controller.fetch(None).await.unwrap();

        let down = OrderSyncController::new(Down, controller.cache().clone(), SyncOptions::default());
        assert!(down.refetch(None).await.is_err());
        assert_eq!(down.orders(None).await.unwrap().items.len(), 2);
    }

    #[tokio::test]
    async fn test_patch_only_touches_the_given_page() {
        let (controller, backend, _) = setup(true, RollbackPolicy::Snapshot);
        controller.fetch(None).await.unwrap();
        controller.fetch(Some(DateFilter::Today)).await.unwrap();
        let id = OrderId::new("42");
        let status_on = |date| {
            let controller = controller.clone();
            let id = id.clone();
            async move { controller.orders(date).await.unwrap().find(&id).unwrap().status }
        };

        let update = controller.update_status(Some(DateFilter::Today), &id, OrderStatus::Confirmed);
        let observe = async {
            backend.started.notified().await;
            assert_eq!(status_on(Some(DateFilter::Today)).await, OrderStatus::Confirmed);
            assert_eq!(status_on(None).await, OrderStatus::PendingPayment);
            backend.release.notify_one();
        };
        let (result, ()) = tokio::join!(update, observe);

        assert!(result.is_err());
        assert_eq!(status_on(Some(DateFilter::Today)).await, OrderStatus::PendingPayment);
    }

    #[tokio::test]
    async fn test_settled_orders_leave_no_bookkeeping() {
        let (controller, backend, _) = setup(false, RollbackPolicy::Versioned);
        controller.fetch(None).await.unwrap();

        for (id, status) in [("42", OrderStatus::Confirmed), ("43", OrderStatus::Shipped)] {
            backend.release.notify_one();
            controller
                .update_status(None, &OrderId::new(id), status)
                .await
                .unwrap();
        }

        let state = controller.state();
        assert!(state.updating.is_empty());
        assert!(state.sequences.is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_changes_are_pruned_once_both_settle() {
        let (controller, backend, _) = setup(false, RollbackPolicy::Versioned);
        controller.fetch(None).await.unwrap();
        let id = OrderId::new("42");

        let first = controller.update_status(None, &id, OrderStatus::Confirmed);
        let second = controller.update_status(None, &id, OrderStatus::Processing);
        // Both updates are polled before this block, so one wake-up means
        // both are waiting on the backend.
        let release = async {
            backend.started.notified().await;
            assert!(controller.is_updating(&id));
            assert_eq!(controller.state().sequences.get(&id), Some(&2));
            backend.release.notify_one();
            backend.release.notify_one();
        };
        let (first, second, ()) = tokio::join!(first, second, release);

        assert!(first.is_ok() && second.is_ok());
        assert!(!controller.is_updating(&id));
        assert!(controller.state().sequences.is_empty());
    }

    #[tokio::test]
    async fn test_options_follow_config() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("COMPTOIR_API_URL", "http://localhost:3000/api/"),
            ("COMPTOIR_ROLLBACK", "versioned"),
        ]);
        let config = AdminConfig::from_lookup(|key| vars.get(key).map(ToString::to_string)).unwrap();

        let options = SyncOptions::from_config(&config);
        assert_eq!(options.rollback, RollbackPolicy::Versioned);

        let controller = OrderSyncController::new(
            GatedBackend::default(),
            QueryCache::new(&config.cache),
            options,
        );
        controller.fetch(None).await.unwrap();
        controller.fetch(None).await.unwrap();
        assert_eq!(controller.backend().fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rollback_policy_parsing() {
        assert_eq!(
            "snapshot".parse::<RollbackPolicy>(),
            Ok(RollbackPolicy::Snapshot)
        );
        assert_eq!(
            " Versioned ".parse::<RollbackPolicy>(),
            Ok(RollbackPolicy::Versioned)
        );
        assert!("optimistic".parse::<RollbackPolicy>().is_err());
        assert_eq!(RollbackPolicy::default(), RollbackPolicy::Snapshot);
    }
}
