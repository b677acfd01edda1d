//! Query cache shared by the back-office services.
//!
//! An explicit service object (clone it to share) backed by `moka`. Entries
//! are grouped in families; a family can be invalidated (entries become
//! stale but are still served until a refetch lands) or cancelled (fetches
//! already in flight for the family will not write their response).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use comptoir_core::{DashboardStats, OrdersPage, Product, ProductId, ProductStats};
use moka::future::Cache;
use tracing::debug;

use crate::api::{ProductList, ProductsQuery};
use crate::config::CacheConfig;
use crate::filters::DateFilter;

/// Group of related cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryFamily {
    Orders,
    Products,
    Dashboard,
}

/// Cache key.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// Order page for a date filter (`None` = all dates).
    Orders(Option<DateFilter>),
    Products(ProductsQuery),
    Product(ProductId),
    Overview,
    ProductStats,
}

impl CacheKey {
    /// Family this key belongs to.
    #[must_use]
    pub const fn family(&self) -> QueryFamily {
        match self {
            Self::Orders(_) => QueryFamily::Orders,
            Self::Products(_) | Self::Product(_) => QueryFamily::Products,
            Self::Overview | Self::ProductStats => QueryFamily::Dashboard,
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Orders(Arc<OrdersPage>),
    Products(Arc<ProductList>),
    Product(Arc<Product>),
    Overview(Arc<DashboardStats>),
    ProductStats(Arc<ProductStats>),
}

/// A value read from the cache.
#[derive(Debug, Clone)]
pub struct Lookup {
    pub value: CacheValue,
    /// `false` once the entry is older than the freshness window or its
    /// family was invalidated.
    pub fresh: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CacheValue,
    fetched_at: Instant,
    /// Family generation when the value was written.
    generation: u64,
}

/// Proof that a fetch started at a given family epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    family: QueryFamily,
    epoch: u64,
}

/// One counter per family.
#[derive(Debug, Default)]
struct FamilyCounters {
    orders: AtomicU64,
    products: AtomicU64,
    dashboard: AtomicU64,
}

impl FamilyCounters {
    const fn counter(&self, family: QueryFamily) -> &AtomicU64 {
        match family {
            QueryFamily::Orders => &self.orders,
            QueryFamily::Products => &self.products,
            QueryFamily::Dashboard => &self.dashboard,
        }
    }

    fn current(&self, family: QueryFamily) -> u64 {
        self.counter(family).load(Ordering::SeqCst)
    }

    fn bump(&self, family: QueryFamily) -> u64 {
        self.counter(family).fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Shared query cache.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<QueryCacheInner>,
}

struct QueryCacheInner {
    entries: Cache<CacheKey, CacheEntry>,
    stale_after: Duration,
    /// Bumped by `cancel`; fetches begun under an older epoch are dropped.
    epochs: FamilyCounters,
    /// Bumped by `invalidate`; entries written under an older generation
    /// are stale.
    generations: FamilyCounters,
}

impl QueryCache {
    /// Create a new cache.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_idle(config.idle_eviction)
            .build();

        Self {
            inner: Arc::new(QueryCacheInner {
                entries,
                stale_after: config.stale_after,
                epochs: FamilyCounters::default(),
                generations: FamilyCounters::default(),
            }),
        }
    }

    /// Read a value regardless of freshness.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.lookup(key).await.map(|found| found.value)
    }

    /// Read a value only if it is still fresh.
    pub async fn get_fresh(&self, key: &CacheKey) -> Option<CacheValue> {
        self.lookup(key)
            .await
            .filter(|found| found.fresh)
            .map(|found| found.value)
    }

    /// Read a value together with its freshness.
    pub async fn lookup(&self, key: &CacheKey) -> Option<Lookup> {
        let entry = self.inner.entries.get(key).await?;
        let fresh = entry.generation == self.inner.generations.current(key.family())
            && entry.fetched_at.elapsed() < self.inner.stale_after;
        Some(Lookup {
            value: entry.value,
            fresh,
        })
    }

    /// Install `value` under `key` as a fresh entry.
    pub async fn set(&self, key: CacheKey, value: CacheValue) {
        let generation = self.inner.generations.current(key.family());
        self.inner
            .entries
            .insert(
                key,
                CacheEntry {
                    value,
                    fetched_at: Instant::now(),
                    generation,
                },
            )
            .await;
    }

    /// Drop a single entry.
    pub async fn remove(&self, key: &CacheKey) {
        self.inner.entries.invalidate(key).await;
    }

    /// Mark every entry of `family` stale.
    ///
    /// Entries are left in place and still returned by [`get`](Self::get);
    /// readers use [`lookup`](Self::lookup) to decide whether to refetch.
    /// Values written afterwards are fresh again.
    pub fn invalidate(&self, family: QueryFamily) {
        let generation = self.inner.generations.bump(family);
        debug!(?family, generation, "Invalidated cache family");
    }

    /// Cancel fetches in flight for `family`: their responses will be
    /// discarded by [`complete_fetch`](Self::complete_fetch).
    pub fn cancel(&self, family: QueryFamily) {
        let epoch = self.inner.epochs.bump(family);
        debug!(?family, epoch, "Cancelled in-flight fetches");
    }

    /// Record the start of a fetch for `family`.
    #[must_use]
    pub fn begin_fetch(&self, family: QueryFamily) -> FetchTicket {
        FetchTicket {
            family,
            epoch: self.inner.epochs.current(family),
        }
    }

    /// Whether a fetch started with `ticket` has been cancelled since.
    #[must_use]
    pub fn is_cancelled(&self, ticket: FetchTicket) -> bool {
        self.inner.epochs.current(ticket.family) != ticket.epoch
    }

    /// Store the response of a fetch unless it was cancelled meanwhile.
    ///
    /// Returns whether the value was written.
    pub async fn complete_fetch(&self, ticket: FetchTicket, key: CacheKey, value: CacheValue) -> bool {
        if self.is_cancelled(ticket) {
            debug!(?key, "Discarding response of cancelled fetch");
            return false;
        }
        self.set(key, value).await;
        true
    }

    /// Remove everything.
    pub async fn clear(&self) {
        self.inner.entries.invalidate_all();
        self.inner.entries.run_pending_tasks().await;
    }

    /// Cached order page for `date`, if any.
    pub async fn orders(&self, date: Option<DateFilter>) -> Option<Arc<OrdersPage>> {
        match self.get(&CacheKey::Orders(date)).await {
            Some(CacheValue::Orders(page)) => Some(page),
            _ => None,
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("stale_after", &self.inner.stale_after)
            .field("entries", &self.inner.entries.entry_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn page() -> CacheValue {
        CacheValue::Orders(Arc::new(OrdersPage::default()))
    }

    #[tokio::test]
    async fn test_set_then_lookup_is_fresh() {
        let cache = QueryCache::default();
        cache.set(CacheKey::Orders(None), page()).await;

        let found = cache.lookup(&CacheKey::Orders(None)).await.unwrap();
        assert!(found.fresh);
        assert!(cache.lookup(&CacheKey::Orders(Some(DateFilter::Today))).await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_from_freshness_window() {
        let cache = QueryCache::new(&CacheConfig {
            stale_after: Duration::ZERO,
            ..CacheConfig::default()
        });
        cache.set(CacheKey::Overview, page()).await;

        let found = cache.lookup(&CacheKey::Overview).await.unwrap();
        assert!(!found.fresh);
        assert!(cache.get(&CacheKey::Overview).await.is_some());
        assert!(cache.get_fresh(&CacheKey::Overview).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_marks_only_the_family_stale() {
        let cache = QueryCache::default();
        cache.set(CacheKey::Orders(None), page()).await;
        cache.set(CacheKey::Orders(Some(DateFilter::Week)), page()).await;
        cache.set(CacheKey::Overview, page()).await;

        cache.invalidate(QueryFamily::Orders);

        assert!(!cache.lookup(&CacheKey::Orders(None)).await.unwrap().fresh);
        assert!(
            !cache
                .lookup(&CacheKey::Orders(Some(DateFilter::Week)))
                .await
                .unwrap()
                .fresh
        );
        assert!(cache.lookup(&CacheKey::Overview).await.unwrap().fresh);
    }

    #[tokio::test]
    async fn test_write_after_invalidate_is_fresh() {
        let cache = QueryCache::default();
        cache.set(CacheKey::Orders(None), page()).await;
        cache.invalidate(QueryFamily::Orders);
        cache.set(CacheKey::Orders(None), page()).await;

        assert!(cache.lookup(&CacheKey::Orders(None)).await.unwrap().fresh);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_invalidate_never_drops_a_new_value() {
        for _ in 0..200 {
            let cache = QueryCache::default();
            cache.set(CacheKey::Orders(None), page()).await;

            let newer = Arc::new(OrdersPage::default());
            let invalidator = cache.clone();
            let writer = cache.clone();
            let written = Arc::clone(&newer);
            let invalidate = tokio::spawn(async move {
                invalidator.invalidate(QueryFamily::Orders);
            });
            let write = tokio::spawn(async move {
                writer
                    .set(CacheKey::Orders(None), CacheValue::Orders(written))
                    .await;
            });
            invalidate.await.unwrap();
            write.await.unwrap();

            let found = cache.lookup(&CacheKey::Orders(None)).await.unwrap();
            assert!(matches!(found.value, CacheValue::Orders(ref p) if Arc::ptr_eq(p, &newer)));
        }
    }

    #[tokio::test]
    async fn test_cancel_discards_in_flight_fetch() {
        let cache = QueryCache::default();
        let ticket = cache.begin_fetch(QueryFamily::Orders);
        cache.cancel(QueryFamily::Orders);

        let written = cache
            .complete_fetch(ticket, CacheKey::Orders(None), page())
            .await;
        assert!(!written);
        assert!(cache.get(&CacheKey::Orders(None)).await.is_none());

        let ticket = cache.begin_fetch(QueryFamily::Orders);
        assert!(
            cache
                .complete_fetch(ticket, CacheKey::Orders(None), page())
                .await
        );
    }

    #[tokio::test]
    async fn test_cancel_is_scoped_to_family() {
        let cache = QueryCache::default();
        let ticket = cache.begin_fetch(QueryFamily::Products);
        cache.cancel(QueryFamily::Orders);
        assert!(!cache.is_cancelled(ticket));
    }
}
